use super::rapier_world::RapierBodies;
use super::session::{GameSession, SessionParams};
use super::vehicle::VehicleInputState;
use crate::config::GameConfig;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_rapier2d::prelude::*;

const FALLBACK_VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);
const CAMERA_Z: f32 = 999.9;

/// The live run, driven by the fixed tick.
#[derive(Resource, Debug, Deref, DerefMut)]
pub struct ActiveSession(pub GameSession<Entity>);

fn primary_viewport(window_query: &Query<&Window, With<PrimaryWindow>>) -> Vec2 {
    window_query
        .single()
        .map(|window| Vec2::new(window.width(), window.height()))
        .ok()
        .filter(|size| size.x > 0.0 && size.y > 0.0)
        .unwrap_or(FALLBACK_VIEWPORT)
}

pub(super) fn start_or_restart_session(
    mut commands: Commands,
    config: Res<GameConfig>,
    session: Option<ResMut<ActiveSession>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut bodies: RapierBodies,
) {
    let params = SessionParams::from_config(&config);
    let viewport = primary_viewport(&window_query);

    match session {
        Some(mut session) => {
            session.set_viewport(viewport);
            session.restart(params, &mut bodies);
        }
        None => {
            let session = GameSession::start(params, viewport, &mut bodies);
            commands.insert_resource(ActiveSession(session));
        }
    }
}

pub(super) fn tick_game_session(
    input: Res<VehicleInputState>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut session: ResMut<ActiveSession>,
    mut bodies: RapierBodies,
) {
    session.set_viewport(primary_viewport(&window_query));
    let input = *input;
    session.tick(&input, &mut bodies);
}

pub(super) fn sync_rapier_gravity_from_config(
    config: Res<GameConfig>,
    mut rapier_config_query: Query<&mut RapierConfiguration, With<DefaultRapierContext>>,
) {
    if let Ok(mut rapier_config) = rapier_config_query.single_mut() {
        rapier_config.gravity = Vec2::new(0.0, -config.physics.gravity.max(0.0));
    }
}

/// Frames `[camera_x, camera_x + width] x [0, height]` of the session view.
pub(super) fn camera_follow_session(
    session: Res<ActiveSession>,
    mut camera_query: Query<&mut Transform, With<Camera2d>>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let viewport = session.viewport();
    camera_transform.translation.x = session.camera_x() + viewport.x * 0.5;
    camera_transform.translation.y = -viewport.y * 0.5;
    camera_transform.translation.z = CAMERA_Z;
}
