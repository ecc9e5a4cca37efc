use super::physics::{BodyPose, PhysicsWorld};
use super::terrain::{TerrainParams, TerrainStreamer};
use super::vehicle::{Vehicle, VehicleController, VehicleInputState, VehicleParams};
use crate::config::{GameConfig, FUEL_UNITS_PER_POINT};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::fmt::Debug;

/// Fuel in thousandths of a point, so per-tick burns add up exactly.
/// Config validation keeps capacity and burn on whole units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fuel(u32);

impl Fuel {
    pub const ZERO: Self = Self(0);

    pub fn from_units(points: f32) -> Self {
        Self((points.max(0.0) * FUEL_UNITS_PER_POINT).round() as u32)
    }

    pub fn units(self) -> f32 {
        self.0 as f32 / FUEL_UNITS_PER_POINT
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn percent_of(self, max: Self) -> f32 {
        if max.0 == 0 {
            return 0.0;
        }
        (self.0 as f32 / max.0 as f32 * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    Flipped,
    OutOfFuel,
}

impl GameOverReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::Flipped => "Flipped over",
            Self::OutOfFuel => "Out of fuel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    GameOver {
        reason: GameOverReason,
        final_distance: u32,
    },
}

impl SessionStatus {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is over; nothing was touched.
    Idle,
    Running,
    Ended(GameOverReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionParams {
    pub terrain: TerrainParams,
    pub vehicle: VehicleParams,
    pub controller: VehicleController,
    pub max_fuel: Fuel,
    pub distance_scale: f32,
    pub flip_height_cutoff: f32,
    pub seed: Option<u64>,
}

impl SessionParams {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            terrain: TerrainParams::from(&config.terrain),
            vehicle: VehicleParams::from_config(config),
            controller: VehicleController::from_config(config),
            max_fuel: Fuel::from_units(config.fuel.max),
            distance_scale: config.rules.distance_scale,
            flip_height_cutoff: config.rules.flip_height_cutoff,
            seed: config.terrain.seed,
        }
    }
}

pub fn distance_travelled(vehicle_x: f32, start_x: f32, distance_scale: f32) -> u32 {
    ((vehicle_x - start_x) / distance_scale).floor().max(0.0) as u32
}

/// Keeps the vehicle a third of the way into the view.
pub fn camera_offset(vehicle_x: f32, viewport_width: f32) -> f32 {
    vehicle_x - viewport_width / 3.0
}

pub fn is_flipped(angle: f32) -> bool {
    let tilt = angle.abs().rem_euclid(TAU);
    tilt > FRAC_PI_2 && tilt < PI + FRAC_PI_2
}

/// Upside down and low enough to be resting near the ground.
pub fn flip_is_fatal(pose: BodyPose, flip_height_cutoff: f32) -> bool {
    is_flipped(pose.angle) && pose.position.y > flip_height_cutoff
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// One run of the game: terrain, vehicle, fuel, distance and camera.
#[derive(Debug)]
pub struct GameSession<H> {
    params: SessionParams,
    status: SessionStatus,
    fuel: Fuel,
    distance: u32,
    camera_x: f32,
    viewport: Vec2,
    tick_count: u64,
    chassis_pose: Option<BodyPose>,
    terrain: TerrainStreamer<H>,
    vehicle: Vehicle<H>,
    rng: StdRng,
}

impl<H: Copy + Eq + Debug> GameSession<H> {
    pub fn start<W>(params: SessionParams, viewport: Vec2, world: &mut W) -> Self
    where
        W: PhysicsWorld<Handle = H>,
    {
        let mut rng = seeded_rng(params.seed);
        let mut terrain = TerrainStreamer::new(params.terrain);
        terrain.generate_initial(world, &mut rng);
        let vehicle = Vehicle::spawn(&params.vehicle, world);

        info!(
            "Session started: {} terrain points, next point at x={}.",
            terrain.point_count(),
            terrain.next_x()
        );

        Self {
            status: SessionStatus::Running,
            fuel: params.max_fuel,
            distance: 0,
            camera_x: camera_offset(params.vehicle.spawn.x, viewport.x),
            viewport,
            tick_count: 0,
            chassis_pose: None,
            terrain,
            vehicle,
            rng,
            params,
        }
    }

    /// Drops every body in `world` and starts over with `params`.
    pub fn restart<W>(&mut self, params: SessionParams, world: &mut W)
    where
        W: PhysicsWorld<Handle = H>,
    {
        world.clear();
        if params.seed != self.params.seed {
            self.rng = seeded_rng(params.seed);
        }

        self.terrain.reset(params.terrain);
        self.terrain.generate_initial(world, &mut self.rng);
        self.vehicle = Vehicle::spawn(&params.vehicle, world);

        self.status = SessionStatus::Running;
        self.fuel = params.max_fuel;
        self.distance = 0;
        self.camera_x = camera_offset(params.vehicle.spawn.x, self.viewport.x);
        self.tick_count = 0;
        self.chassis_pose = None;
        self.params = params;

        info!(
            "Session restarted: {} terrain points, fuel {:.1}.",
            self.terrain.point_count(),
            self.fuel.units()
        );
    }

    /// Advances game logic by one tick, ahead of the physics step.
    pub fn tick<W>(&mut self, input: &VehicleInputState, world: &mut W) -> TickOutcome
    where
        W: PhysicsWorld<Handle = H>,
    {
        if !self.status.is_running() {
            return TickOutcome::Idle;
        }
        self.tick_count += 1;

        let burn = self
            .params
            .controller
            .tick(input, self.fuel, &self.vehicle, world);
        self.fuel = self.fuel.saturating_sub(burn);

        if let Some(pose) = world.pose(self.vehicle.chassis) {
            self.chassis_pose = Some(pose);
            let vehicle_x = pose.position.x;

            self.distance = distance_travelled(
                vehicle_x,
                self.params.vehicle.spawn.x,
                self.params.distance_scale,
            );
            self.camera_x = camera_offset(vehicle_x, self.viewport.x);

            if self.terrain.should_extend(vehicle_x) {
                self.terrain.extend(world, &mut self.rng);
            }
            let retired = self.terrain.retire(self.camera_x, world);
            if retired > 0 {
                debug!(
                    "Retired {retired} terrain segment(s) behind x={:.0}.",
                    self.terrain.retire_threshold(self.camera_x)
                );
            }

            if flip_is_fatal(pose, self.params.flip_height_cutoff) {
                return self.end(GameOverReason::Flipped);
            }
        }

        if self.fuel.is_empty() {
            return self.end(GameOverReason::OutOfFuel);
        }

        TickOutcome::Running
    }

    fn end(&mut self, reason: GameOverReason) -> TickOutcome {
        self.status = SessionStatus::GameOver {
            reason,
            final_distance: self.distance,
        };
        info!(
            "Game over after {} ticks: {} at {}m.",
            self.tick_count,
            reason.label(),
            self.distance
        );
        TickOutcome::Ended(reason)
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn fuel(&self) -> Fuel {
        self.fuel
    }

    pub fn max_fuel(&self) -> Fuel {
        self.params.max_fuel
    }

    pub fn fuel_percent(&self) -> f32 {
        self.fuel.percent_of(self.params.max_fuel)
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub fn camera_x(&self) -> f32 {
        self.camera_x
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn chassis_pose(&self) -> Option<BodyPose> {
        self.chassis_pose
    }

    pub fn terrain(&self) -> &TerrainStreamer<H> {
        &self.terrain
    }

    pub fn vehicle(&self) -> &Vehicle<H> {
        &self.vehicle
    }
}
