use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "config";

/// Stored fuel resolution: one point is this many units.
pub const FUEL_UNITS_PER_POINT: f32 = 1_000.0;
/// Largest tank that still fits the stored unit counter.
pub const MAX_FUEL_POINTS: f32 = 1_000_000.0;
const FUEL_UNIT_TOLERANCE: f32 = 1e-3;

/// Rounds a fuel amount to the stored resolution.
pub fn snap_to_fuel_units(points: f32) -> f32 {
    (points * FUEL_UNITS_PER_POINT).round() / FUEL_UNITS_PER_POINT
}

fn is_whole_fuel_units(points: f32) -> bool {
    let units = points * FUEL_UNITS_PER_POINT;
    (units - units.round()).abs() <= FUEL_UNIT_TOLERANCE
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands, mut fixed_time: ResMut<Time<Fixed>>) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    fixed_time.set_timestep_hz(f64::from(config.app.fixed_timestep_hz));
    log_config_summary("Loaded", &config);
    warn_if_lookahead_can_be_outrun(&config);
    info!("Press F5 to hot-reload `{CONFIG_DIR}/game.toml`; changes apply on the next run.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
            warn_if_lookahead_can_be_outrun(&current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: {} Hz tick, terrain step {} px, {} initial points, fuel {} (burn {}/tick).",
        config.app.fixed_timestep_hz,
        config.terrain.step,
        config.terrain.initial_points,
        config.fuel.max,
        config.fuel.burn_per_tick
    );
}

fn warn_if_lookahead_can_be_outrun(config: &GameConfig) {
    let top_speed = config.top_speed_per_tick();
    if top_speed > config.terrain.step {
        warn!(
            "Vehicle top speed ({top_speed:.1} px/tick) exceeds the terrain step ({} px); terrain generation may fall behind.",
            config.terrain.step
        );
    }
}

#[derive(Resource, Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub app: AppConfig,
    pub physics: PhysicsConfig,
    pub terrain: TerrainConfig,
    pub vehicle: VehicleConfig,
    pub fuel: FuelConfig,
    pub rules: RulesConfig,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let config: GameConfig = read_toml(&config_dir.join("game.toml"))?;
        config.validate()?;
        Ok(config)
    }

    /// Upper bound on how far the chassis can travel in one tick when the
    /// wheels roll at the drive speed without slipping.
    pub fn top_speed_per_tick(&self) -> f32 {
        let wheel_speed = self.vehicle.drive_angular_velocity.abs() * self.vehicle.wheel_radius;
        wheel_speed / self.app.fixed_timestep_hz
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.fixed_timestep_hz <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::app.fixed_timestep_hz must be > 0".to_string(),
            ));
        }

        let terrain = &self.terrain;
        if terrain.step <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::terrain.step must be > 0".to_string(),
            ));
        }
        if terrain.min_y >= terrain.max_y {
            return Err(ConfigError::Validation(format!(
                "game.toml::terrain height band is invalid (min_y {} must be < max_y {})",
                terrain.min_y, terrain.max_y
            )));
        }
        if !(terrain.min_y..=terrain.max_y).contains(&terrain.base_y) {
            return Err(ConfigError::Validation(format!(
                "game.toml::terrain.base_y {} must lie within [{}, {}]",
                terrain.base_y, terrain.min_y, terrain.max_y
            )));
        }
        if terrain.variation < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::terrain.variation must be >= 0".to_string(),
            ));
        }
        if terrain.flat_start_points == 0 {
            return Err(ConfigError::Validation(
                "game.toml::terrain.flat_start_points must be >= 1".to_string(),
            ));
        }
        if terrain.initial_points < 2 {
            return Err(ConfigError::Validation(
                "game.toml::terrain.initial_points must be >= 2".to_string(),
            ));
        }
        if terrain.lookahead < terrain.step {
            return Err(ConfigError::Validation(
                "game.toml::terrain.lookahead must be >= terrain.step".to_string(),
            ));
        }
        if terrain.retire_margin < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::terrain.retire_margin must be >= 0".to_string(),
            ));
        }
        if terrain.slab_thickness <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::terrain.slab_thickness must be > 0".to_string(),
            ));
        }

        let vehicle = &self.vehicle;
        if vehicle.chassis_width <= 0.0 || vehicle.chassis_height <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::vehicle chassis dimensions must be > 0".to_string(),
            ));
        }
        if vehicle.wheel_radius <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::vehicle.wheel_radius must be > 0".to_string(),
            ));
        }
        if vehicle.chassis_density <= 0.0 || vehicle.wheel_density <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::vehicle densities must be > 0".to_string(),
            ));
        }
        if vehicle.suspension_stiffness < 0.0 || vehicle.suspension_damping < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::vehicle suspension stiffness and damping must be >= 0".to_string(),
            ));
        }

        if self.fuel.max <= 0.0 || self.fuel.max > MAX_FUEL_POINTS {
            return Err(ConfigError::Validation(format!(
                "game.toml::fuel.max must be within (0, {MAX_FUEL_POINTS}]"
            )));
        }
        if !is_whole_fuel_units(self.fuel.max) {
            return Err(ConfigError::Validation(format!(
                "game.toml::fuel.max {} must be a multiple of {}",
                self.fuel.max,
                1.0 / FUEL_UNITS_PER_POINT
            )));
        }
        if self.fuel.burn_per_tick < 0.0 || self.fuel.burn_per_tick > self.fuel.max {
            return Err(ConfigError::Validation(format!(
                "game.toml::fuel.burn_per_tick must be within [0, {}]",
                self.fuel.max
            )));
        }
        if !is_whole_fuel_units(self.fuel.burn_per_tick) {
            return Err(ConfigError::Validation(format!(
                "game.toml::fuel.burn_per_tick {} must be a multiple of {}",
                self.fuel.burn_per_tick,
                1.0 / FUEL_UNITS_PER_POINT
            )));
        }

        if self.rules.distance_scale <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::rules.distance_scale must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub fixed_timestep_hz: f32,
    #[serde(default)]
    pub debug_overlay: bool,
    /// On-screen gas/brake lanes; defaults to on for web builds only.
    #[serde(default)]
    pub touch_controls: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    /// Downward acceleration in px/s².
    pub gravity: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    pub step: f32,
    pub base_y: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub variation: f32,
    #[serde(default = "default_flat_start_points")]
    pub flat_start_points: u32,
    pub initial_points: u32,
    pub lookahead: f32,
    pub retire_margin: f32,
    pub slab_thickness: f32,
    pub friction: f32,
}

fn default_flat_start_points() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleConfig {
    pub start_x: f32,
    pub start_y: f32,
    pub chassis_width: f32,
    pub chassis_height: f32,
    pub chassis_density: f32,
    pub chassis_friction: f32,
    pub wheel_radius: f32,
    pub wheel_density: f32,
    pub wheel_friction: f32,
    pub wheel_restitution: f32,
    pub wheel_offset_x: f32,
    pub wheel_offset_y: f32,
    pub anchor_offset_y: f32,
    pub suspension_rest_length: f32,
    pub suspension_stiffness: f32,
    pub suspension_damping: f32,
    pub drive_angular_velocity: f32,
    pub brake_angular_velocity: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FuelConfig {
    pub max: f32,
    pub burn_per_tick: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    pub distance_scale: f32,
    pub flip_height_cutoff: f32,
}

#[cfg(test)]
pub(crate) fn shipped_config() -> GameConfig {
    toml::from_str(include_str!("../../config/game.toml"))
        .expect("shipped game.toml should parse")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_config_parses_and_validates() {
        let config = shipped_config();
        config.validate().expect("shipped config should validate");

        assert_eq!(config.terrain.initial_points, 30);
        assert_eq!(config.terrain.step, 100.0);
        assert_eq!(config.vehicle.start_x, 200.0);
        assert_eq!(config.fuel.max, 100.0);
        assert!(config.terrain.seed.is_none());
    }

    #[test]
    fn shipped_vehicle_cannot_outrun_terrain_generation() {
        let config = shipped_config();
        assert!(config.top_speed_per_tick() <= config.terrain.step);
    }

    #[test]
    fn validation_fails_for_inverted_height_band() {
        let mut config = shipped_config();
        config.terrain.min_y = 600.0;

        let error = config.validate().expect_err("validation should fail");
        let message = error.to_string();

        assert!(message.contains("min_y"));
        assert!(message.contains("600"));
    }

    #[test]
    fn validation_fails_for_base_height_outside_band() {
        let mut config = shipped_config();
        config.terrain.base_y = 50.0;

        let error = config.validate().expect_err("validation should fail");
        assert!(error.to_string().contains("base_y"));
    }

    #[test]
    fn validation_fails_for_burn_larger_than_tank() {
        let mut config = shipped_config();
        config.fuel.burn_per_tick = 150.0;

        let error = config.validate().expect_err("validation should fail");
        assert!(error.to_string().contains("burn_per_tick"));
    }

    #[test]
    fn validation_rejects_burn_below_fuel_resolution() {
        let mut config = shipped_config();
        config.fuel.burn_per_tick = 0.0004;

        let error = config.validate().expect_err("sub-unit burn should fail");
        assert!(error.to_string().contains("burn_per_tick"));
    }

    #[test]
    fn validation_rejects_burn_between_fuel_units() {
        let mut config = shipped_config();
        config.fuel.burn_per_tick = 0.0015;

        assert!(config.validate().is_err());

        config.fuel.burn_per_tick = 0.002;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_tank_that_overflows_fuel_units() {
        let mut config = shipped_config();
        config.fuel.max = 5.0e6;

        let error = config.validate().expect_err("oversized tank should fail");
        assert!(error.to_string().contains("fuel.max"));

        config.fuel.max = 99.9995;
        assert!(config.validate().is_err());
    }

    #[test]
    fn snapping_rounds_to_whole_fuel_units() {
        assert_eq!(snap_to_fuel_units(0.0004), 0.0);
        assert!((snap_to_fuel_units(0.0016) - 0.002).abs() < 1e-6);
        assert!(is_whole_fuel_units(snap_to_fuel_units(0.1234567)));
    }

    #[test]
    fn parse_error_reports_path() {
        let dir = std::env::temp_dir().join(format!("hill_climb_config_{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        fs::write(dir.join("game.toml"), "[app]\nfixed_timestep_hz = \"fast\"\n").expect("write");

        let error = GameConfig::load_from_dir(&dir).expect_err("load should fail");
        let _ = fs::remove_dir_all(&dir);

        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().contains("game.toml"));
        assert!(error.source().is_some());
    }
}
