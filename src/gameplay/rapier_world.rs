use super::physics::{
    BodyPose, BodyShape, BodySnapshot, DynamicBallDesc, DynamicBoxDesc, PhysicsWorld, SpringDesc,
    StaticBoxDesc,
};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Marks every entity the game session spawned into the physics world.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct SessionBody;

pub fn to_scene(point: Vec2) -> Vec2 {
    Vec2::new(point.x, -point.y)
}

pub fn from_scene(point: Vec2) -> Vec2 {
    Vec2::new(point.x, -point.y)
}

fn scene_transform(center: Vec2, angle: f32) -> Transform {
    Transform::from_translation(to_scene(center).extend(0.0))
        .with_rotation(Quat::from_rotation_z(-angle))
}

pub(super) fn pose_from_transform(transform: &Transform) -> BodyPose {
    let (_, _, z_rot_rad) = transform.rotation.to_euler(EulerRot::XYZ);
    BodyPose::new(from_scene(transform.translation.truncate()), -z_rot_rad)
}

pub(super) fn shape_of(collider: &Collider) -> Option<BodyShape> {
    if let Some(ball) = collider.as_ball() {
        return Some(BodyShape::Ball {
            radius: ball.radius(),
        });
    }
    collider.as_cuboid().map(|cuboid| BodyShape::Box {
        half_extents: cuboid.half_extents(),
    })
}

pub(super) fn body_snapshot(
    entity: Entity,
    transform: &Transform,
    collider: &Collider,
    rigid_body: &RigidBody,
) -> Option<BodySnapshot<Entity>> {
    Some(BodySnapshot {
        handle: entity,
        pose: pose_from_transform(transform),
        shape: shape_of(collider)?,
        is_static: matches!(rigid_body, RigidBody::Fixed),
    })
}

/// `PhysicsWorld` on top of bevy_rapier2d.
///
/// Session coordinates are screen-like (`+y` down, clockwise angles); Bevy's
/// are `+y` up with counter-clockwise angles. Both share pixel units, so the
/// conversion is a mirror across the x axis.
#[derive(SystemParam)]
pub struct RapierBodies<'w, 's> {
    commands: Commands<'w, 's>,
    bodies: Query<
        'w,
        's,
        (Entity, &'static Transform, &'static Collider, &'static RigidBody),
        With<SessionBody>,
    >,
    velocities: Query<'w, 's, &'static mut Velocity, With<SessionBody>>,
    owned: Query<'w, 's, Entity, With<SessionBody>>,
}

impl PhysicsWorld for RapierBodies<'_, '_> {
    type Handle = Entity;

    fn add_static_box(&mut self, desc: &StaticBoxDesc) -> Entity {
        self.commands
            .spawn((
                Name::new("TerrainSlab"),
                SessionBody,
                RigidBody::Fixed,
                Collider::cuboid(desc.half_extents.x, desc.half_extents.y),
                Friction::coefficient(desc.friction),
                scene_transform(desc.center, desc.angle),
            ))
            .id()
    }

    fn add_dynamic_ball(&mut self, desc: &DynamicBallDesc) -> Entity {
        self.commands
            .spawn((
                Name::new("Wheel"),
                SessionBody,
                RigidBody::Dynamic,
                Collider::ball(desc.radius),
                ColliderMassProperties::Density(desc.density),
                Friction::coefficient(desc.friction),
                Restitution::coefficient(desc.restitution),
                Velocity::zero(),
                Ccd::enabled(),
                Sleeping::disabled(),
                scene_transform(desc.center, 0.0),
            ))
            .id()
    }

    fn add_dynamic_box(&mut self, desc: &DynamicBoxDesc) -> Entity {
        self.commands
            .spawn((
                Name::new("Chassis"),
                SessionBody,
                RigidBody::Dynamic,
                Collider::cuboid(desc.half_extents.x, desc.half_extents.y),
                ColliderMassProperties::Density(desc.density),
                Friction::coefficient(desc.friction),
                Velocity::zero(),
                Sleeping::disabled(),
                scene_transform(desc.center, 0.0),
            ))
            .id()
    }

    /// Rapier keeps impulse joints on the child body, so despawning the
    /// attached body also drops the spring.
    fn add_spring(&mut self, desc: &SpringDesc<Entity>) {
        let spring = SpringJointBuilder::new(desc.rest_length, desc.stiffness, desc.damping)
            .local_anchor1(to_scene(desc.anchor_local))
            .local_anchor2(to_scene(desc.attached_local))
            .build();
        self.commands
            .entity(desc.attached_body)
            .insert(ImpulseJoint::new(desc.anchor_body, spring));
    }

    fn remove_body(&mut self, handle: Entity) {
        self.commands.entity(handle).try_despawn();
    }

    fn set_angular_velocity(&mut self, handle: Entity, angular_velocity: f32) {
        match self.velocities.get_mut(handle) {
            Ok(mut velocity) => velocity.angvel = -angular_velocity,
            Err(_) => {
                self.commands
                    .entity(handle)
                    .try_insert(Velocity::angular(-angular_velocity));
            }
        }
    }

    fn pose(&self, handle: Entity) -> Option<BodyPose> {
        self.bodies
            .get(handle)
            .ok()
            .map(|(_, transform, _, _)| pose_from_transform(transform))
    }

    fn bodies(&self) -> Vec<BodySnapshot<Entity>> {
        self.bodies
            .iter()
            .filter_map(|(entity, transform, collider, rigid_body)| {
                body_snapshot(entity, transform, collider, rigid_body)
            })
            .collect()
    }

    fn clear(&mut self) {
        for entity in &self.owned {
            self.commands.entity(entity).try_despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn scene_mirror_round_trips() {
        let point = Vec2::new(320.0, 410.0);
        assert_eq!(to_scene(point), Vec2::new(320.0, -410.0));
        assert_eq!(from_scene(to_scene(point)), point);
    }

    #[test]
    fn transform_pose_flips_rotation_direction() {
        let transform = scene_transform(Vec2::new(50.0, 120.0), FRAC_PI_4);
        assert_eq!(transform.translation, Vec3::new(50.0, -120.0, 0.0));

        let pose = pose_from_transform(&transform);
        assert!((pose.position - Vec2::new(50.0, 120.0)).length() < 1e-4);
        assert!((pose.angle - FRAC_PI_4).abs() < 1e-5);
    }

    #[test]
    fn snapshot_reports_session_frame_pose_and_kind() {
        let entity = Entity::PLACEHOLDER;
        let transform = scene_transform(Vec2::new(300.0, 450.0), 0.25);

        let slab = body_snapshot(
            entity,
            &transform,
            &Collider::cuboid(50.0, 50.0),
            &RigidBody::Fixed,
        )
        .expect("cuboids are snapshotted");
        assert!(slab.is_static);
        assert_eq!(slab.handle, entity);
        assert!((slab.pose.position - Vec2::new(300.0, 450.0)).length() < 1e-3);
        assert!((slab.pose.angle - 0.25).abs() < 1e-5);

        let wheel = body_snapshot(entity, &transform, &Collider::ball(20.0), &RigidBody::Dynamic)
            .expect("balls are snapshotted");
        assert!(!wheel.is_static);
        assert_eq!(wheel.shape, BodyShape::Ball { radius: 20.0 });

        let segment = Collider::segment(Vec2::ZERO, Vec2::X);
        assert!(body_snapshot(entity, &transform, &segment, &RigidBody::Fixed).is_none());
    }

    #[test]
    fn collider_shapes_are_reported_in_pixels() {
        assert_eq!(
            shape_of(&Collider::ball(20.0)),
            Some(BodyShape::Ball { radius: 20.0 })
        );
        assert_eq!(
            shape_of(&Collider::cuboid(40.0, 15.0)),
            Some(BodyShape::Box {
                half_extents: Vec2::new(40.0, 15.0)
            })
        );
    }
}
