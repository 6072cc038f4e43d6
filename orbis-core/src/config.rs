//! # Configuration - Orbis Tuning Parameters
//!
//! Grid size, kernel physics, launch protocol limits and game rules.
//! Everything has a default; a JSON file or `ORBIS_*` environment
//! variables can override it.

use serde::{Deserialize, Serialize};

use crate::encoding::max_places;
use crate::error::{OrbisError, OrbisResult};
use crate::DEFAULT_GRID_WIDTH;

/// Master configuration for Orbis
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbisConfig {
    /// Texture grid settings
    pub grid: GridConfig,

    /// Update kernel physics
    pub kernel: KernelConfig,

    /// Launch protocol settings
    pub launch: LaunchConfig,

    /// Game rules
    pub game: GameConfig,

    /// AI opponent settings
    pub ai: AiConfig,
}

/// Texture grid
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Width (and height) of every variable texture; capacity is `width²`
    pub width: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
        }
    }
}

impl GridConfig {
    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.width * self.width
    }
}

/// Kernel physics
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Acceleration toward the target place (units/s²)
    pub thrust: f32,

    /// Speed clamp (units/s)
    pub max_speed: f32,

    /// Distance at which a unit counts as arrived
    pub arrival_radius: f32,

    /// Thrust multiplier applied to enemy units
    pub difficulty: f32,

    /// Largest time step a single tick integrates
    pub max_dt: f32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            thrust: 4.0,
            max_speed: 3.0,
            arrival_radius: 0.35,
            difficulty: 1.0,
            max_dt: 0.1,
        }
    }
}

/// What to do with a launch requested while another one holds the lock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchPolicy {
    /// Defer it until the lock clears (bounded by `max_queued`)
    Queue,
    /// Reject it
    Drop,
}

/// Launch protocol
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Most units one side may have in flight; `None` means half the pool
    pub owner_cap: Option<usize>,

    /// Half-extent of the random cube units spawn in around their source
    pub spawn_jitter: f32,

    /// Ticks without progress before a held launch lock is force-released
    pub timeout_ticks: u64,

    /// Behaviour for launches requested while the lock is held
    pub policy: LaunchPolicy,

    /// Most launches waiting behind the lock
    pub max_queued: usize,

    /// Seed for spawn jitter
    pub seed: u64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            owner_cap: None,
            spawn_jitter: 0.25,
            timeout_ticks: 8,
            policy: LaunchPolicy::Queue,
            max_queued: 32,
            seed: 0x0b15,
        }
    }
}

/// Game rules
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of places scattered on the sphere
    pub places: usize,

    /// Radius of the sphere the places sit on
    pub sphere_radius: f32,

    /// Troops on every place at the start
    pub initial_troops: f32,

    /// Troops gained per second by an owned place
    pub troop_growth: f32,

    /// Share of a place's troops sent by one order
    pub send_fraction: f32,

    /// Seed for place layout
    pub seed: u64,

    /// Ticks before a match is called a draw
    pub max_ticks: u64,

    /// Time step of one match tick (seconds)
    pub tick_dt: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            places: 12,
            sphere_radius: 5.0,
            initial_troops: 10.0,
            troop_growth: 1.0,
            send_fraction: 0.5,
            seed: 42,
            max_ticks: 36_000,
            tick_dt: 1.0 / 60.0,
        }
    }
}

/// AI opponent
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Seconds between decisions
    pub think_interval: f32,

    /// Troops an attack must have beyond the defender's
    pub attack_margin: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            think_interval: 2.0,
            attack_margin: 2.0,
        }
    }
}

impl OrbisConfig {
    /// Load configuration from file
    pub fn load(path: &str) -> OrbisResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| OrbisError::serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> OrbisResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| OrbisError::serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Config for a small grid, handy for tests and quick matches
    pub fn small(width: usize) -> Self {
        let mut config = Self::default();
        config.grid.width = width;
        config.game.places = config.game.places.min(max_places(width));
        config
    }

    /// Create config from environment variables
    ///
    /// Reads:
    /// - ORBIS_GRID_WIDTH: texture width (default: 64)
    /// - ORBIS_PLACES: number of places (default: 12)
    /// - ORBIS_DIFFICULTY: enemy thrust multiplier (default: 1.0)
    /// - ORBIS_SEED: layout seed (default: 42)
    /// - ORBIS_MAX_TICKS: match length limit (default: 36000)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("ORBIS_GRID_WIDTH") {
            config.grid.width = v;
        }
        if let Some(v) = env_parse("ORBIS_PLACES") {
            config.game.places = v;
        }
        if let Some(v) = env_parse("ORBIS_DIFFICULTY") {
            config.kernel.difficulty = v;
        }
        if let Some(v) = env_parse("ORBIS_SEED") {
            config.game.seed = v;
        }
        if let Some(v) = env_parse("ORBIS_MAX_TICKS") {
            config.game.max_ticks = v;
        }

        config
    }

    /// Per-side in-flight cap, resolving the default of half the pool
    pub fn owner_cap(&self) -> usize {
        self.launch
            .owner_cap
            .unwrap_or(self.grid.capacity() / 2)
    }

    /// Check that the parameters describe a runnable simulation
    pub fn validate(&self) -> OrbisResult<()> {
        let k = &self.kernel;

        if self.grid.width == 0 {
            return Err(OrbisError::config("grid.width must be positive"));
        }
        if self.game.places > max_places(self.grid.width) {
            return Err(OrbisError::config(format!(
                "{} places do not fit a grid of width {} (max {})",
                self.game.places,
                self.grid.width,
                max_places(self.grid.width)
            )));
        }
        if !(k.thrust > 0.0 && k.max_speed > 0.0 && k.arrival_radius > 0.0 && k.max_dt > 0.0) {
            return Err(OrbisError::config(
                "kernel thrust, max_speed, arrival_radius and max_dt must be positive",
            ));
        }
        // Multiplies enemy thrust
        if !(k.difficulty > 0.0) {
            return Err(OrbisError::config("kernel.difficulty must be positive"));
        }
        // A unit must not be able to step over a whole arrival sphere.
        if k.max_speed * k.max_dt >= 2.0 * k.arrival_radius {
            return Err(OrbisError::config(format!(
                "step length {:.3} would skip the arrival radius {:.3}",
                k.max_speed * k.max_dt,
                k.arrival_radius
            )));
        }
        if !(self.launch.spawn_jitter >= 0.0) {
            return Err(OrbisError::config("launch.spawn_jitter must not be negative"));
        }
        if self.launch.timeout_ticks == 0 {
            return Err(OrbisError::config("launch.timeout_ticks must be positive"));
        }
        if !(0.0..=1.0).contains(&self.game.send_fraction) {
            return Err(OrbisError::config("game.send_fraction must be within [0, 1]"));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OrbisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.owner_cap(), 64 * 64 / 2);
    }

    #[test]
    fn test_too_many_places_rejected() {
        let mut config = OrbisConfig::small(8);
        config.game.places = 9;
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_tunnelling_step_rejected() {
        let mut config = OrbisConfig::default();
        config.kernel.max_speed = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_jitter_rejected() {
        let mut config = OrbisConfig::small(8);
        config.launch.spawn_jitter = -0.1;
        assert!(config.validate().unwrap_err().is_configuration());

        config.launch.spawn_jitter = f32::NAN;
        assert!(config.validate().is_err());

        config.launch.spawn_jitter = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_difficulty_rejected() {
        let mut config = OrbisConfig::small(8);
        config.kernel.difficulty = 0.0;
        assert!(config.validate().unwrap_err().is_configuration());

        config.kernel.difficulty = -1.0;
        assert!(config.validate().is_err());

        config.kernel.difficulty = 0.25;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orbis.json");
        let path = path.to_str().unwrap();

        let mut config = OrbisConfig::small(16);
        config.kernel.difficulty = 1.5;
        config.launch.policy = LaunchPolicy::Drop;
        config.save(path).unwrap();

        let loaded = OrbisConfig::load(path).unwrap();
        assert_eq!(loaded.grid.width, 16);
        assert_eq!(loaded.kernel.difficulty, 1.5);
        assert_eq!(loaded.launch.policy, LaunchPolicy::Drop);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OrbisConfig = serde_json::from_str(r#"{"grid": {"width": 32}}"#).unwrap();
        assert_eq!(config.grid.width, 32);
        assert_eq!(config.kernel.max_speed, KernelConfig::default().max_speed);
    }
}
