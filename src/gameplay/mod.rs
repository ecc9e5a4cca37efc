pub mod physics;
pub mod rapier_world;
pub mod runtime;
mod scene;
pub mod session;
pub mod terrain;
pub mod vehicle;

use crate::config::GameConfig;
use crate::states::GameState;
use bevy::prelude::*;
use runtime::ActiveSession;
use vehicle::VehicleGameplayPlugin;

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(VehicleGameplayPlugin)
            .add_systems(
                OnEnter(GameState::InRun),
                runtime::start_or_restart_session.run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                FixedUpdate,
                runtime::tick_game_session
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<ActiveSession>),
            )
            .add_systems(
                Update,
                runtime::sync_rapier_gravity_from_config.run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                Update,
                (
                    runtime::camera_follow_session,
                    scene::attach_body_visuals,
                    scene::sync_terrain_fill,
                    scene::draw_terrain_edge,
                    scene::draw_body_outlines,
                )
                    .chain()
                    .run_if(resource_exists::<ActiveSession>),
            );
    }
}
