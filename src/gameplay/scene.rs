use super::physics::BodyShape;
use super::rapier_world::{body_snapshot, to_scene, SessionBody};
use super::runtime::ActiveSession;
use super::terrain::TerrainPoint;
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

const TERRAIN_FILL_Z: f32 = -10.0;
const TERRAIN_FILL_COLOR: Color = Color::srgb(0.545, 0.271, 0.075);
const TERRAIN_EDGE_COLOR: Color = Color::srgb(0.396, 0.263, 0.129);
const CHASSIS_COLOR: Color = Color::srgb(1.0, 0.267, 0.267);
const CHASSIS_EDGE_COLOR: Color = Color::srgb(0.8, 0.0, 0.0);
const WHEEL_COLOR: Color = Color::srgb(0.2, 0.2, 0.2);
const WHEEL_EDGE_COLOR: Color = Color::srgb(0.4, 0.4, 0.4);
const WHEEL_SPOKE_COLOR: Color = Color::srgb(0.6, 0.6, 0.6);

#[derive(Component)]
pub(super) struct TerrainFill {
    revision: u64,
    floor_y: f32,
}

/// Filled ground profile from the surface down to `floor_y`, in scene space.
pub(super) fn build_terrain_fill_mesh(points: &[TerrainPoint], floor_y: f32) -> Mesh {
    let node_count = points.len();
    let mut positions = Vec::with_capacity(node_count * 2);
    let mut normals = Vec::with_capacity(node_count * 2);
    let mut uvs = Vec::with_capacity(node_count * 2);
    let mut indices = Vec::with_capacity(node_count.saturating_sub(1) * 6);

    for point in points {
        let top = to_scene(point.as_vec2());
        let bottom = to_scene(Vec2::new(point.x, floor_y));
        positions.push([top.x, top.y, 0.0]);
        positions.push([bottom.x, bottom.y, 0.0]);
        normals.push([0.0, 0.0, 1.0]);
        normals.push([0.0, 0.0, 1.0]);
        uvs.push([point.x, 0.0]);
        uvs.push([point.x, 1.0]);
    }

    for index in 0..node_count.saturating_sub(1) {
        let base = (index * 2) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

pub(super) fn sync_terrain_fill(
    mut commands: Commands,
    session: Res<ActiveSession>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut fill_query: Query<(&mut TerrainFill, &mut Mesh2d)>,
) {
    let terrain = session.terrain();
    let revision = terrain.revision();
    let floor_y = session
        .viewport()
        .y
        .max(terrain.params().max_y + terrain.params().slab_thickness);

    if let Ok((fill, _)) = fill_query.single() {
        if fill.revision == revision && fill.floor_y == floor_y {
            return;
        }
    }

    let points: Vec<TerrainPoint> = terrain.points().copied().collect();
    let mesh = meshes.add(build_terrain_fill_mesh(&points, floor_y));

    match fill_query.single_mut() {
        Ok((mut fill, mut mesh2d)) => {
            *mesh2d = Mesh2d(mesh);
            fill.revision = revision;
            fill.floor_y = floor_y;
        }
        Err(_) => {
            commands.spawn((
                Name::new("TerrainFill"),
                TerrainFill { revision, floor_y },
                Mesh2d(mesh),
                MeshMaterial2d(materials.add(TERRAIN_FILL_COLOR)),
                Transform::from_xyz(0.0, 0.0, TERRAIN_FILL_Z),
            ));
        }
    }
}

/// Gives freshly spawned dynamic bodies something to render.
pub(super) fn attach_body_visuals(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    added_query: Query<(Entity, &Collider, &RigidBody), Added<SessionBody>>,
) {
    for (entity, collider, rigid_body) in &added_query {
        if matches!(rigid_body, RigidBody::Fixed) {
            continue;
        }

        if let Some(ball) = collider.as_ball() {
            commands.entity(entity).try_insert((
                Mesh2d(meshes.add(Circle::new(ball.radius()))),
                MeshMaterial2d(materials.add(WHEEL_COLOR)),
            ));
        } else if let Some(cuboid) = collider.as_cuboid() {
            commands
                .entity(entity)
                .try_insert(Sprite::from_color(CHASSIS_COLOR, cuboid.half_extents() * 2.0));
        }
    }
}

pub(super) fn draw_terrain_edge(session: Res<ActiveSession>, mut gizmos: Gizmos) {
    gizmos.linestrip_2d(
        session
            .terrain()
            .points()
            .map(|point| to_scene(point.as_vec2())),
        TERRAIN_EDGE_COLOR,
    );
}

pub(super) fn draw_body_outlines(
    body_query: Query<(Entity, &Transform, &Collider, &RigidBody), With<SessionBody>>,
    mut gizmos: Gizmos,
) {
    for (entity, transform, collider, rigid_body) in &body_query {
        let Some(body) = body_snapshot(entity, transform, collider, rigid_body) else {
            continue;
        };
        if body.is_static {
            continue;
        }

        let center = to_scene(body.pose.position);
        match body.shape {
            BodyShape::Ball { radius } => {
                gizmos.circle_2d(center, radius, WHEEL_EDGE_COLOR);
                let spoke = Vec2::new(body.pose.angle.cos(), body.pose.angle.sin()) * radius;
                gizmos.line_2d(center, to_scene(body.pose.position + spoke), WHEEL_SPOKE_COLOR);
            }
            BodyShape::Box { half_extents } => {
                gizmos.rect_2d(
                    Isometry2d::new(center, Rot2::radians(-body.pose.angle)),
                    half_extents * 2.0,
                    CHASSIS_EDGE_COLOR,
                );
            }
        }
    }
}
