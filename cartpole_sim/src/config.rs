//! Simulation configuration
//!
//! Loaded from TOML; every field has a default (1400×600 scene, 200px arm,
//! slider gains).
//!
//! ```toml
//! [pendulum]
//! arm_length = 200.0
//!
//! [gains]
//! mode = "fixed"
//! kp = 0.006
//! kd = 0.2
//!
//! [centering]
//! null_gain = 0.0005
//! target_x = 700.0
//!
//! [[perturbation.schedule]]
//! tick = 120
//! direction = "right"
//! ```

use crate::Direction;
use anyhow::{bail, Context, Result};
use cartpole_core::{Centering, FixedGains, SliderGains};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete simulator configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub pendulum: PendulumConfig,
    pub gains: GainsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centering: Option<Centering>,
    pub telemetry: TelemetryConfig,
    pub perturbation: PerturbationConfig,
}

/// Scene bounds and global physics settings
///
/// Units are pixels and milliseconds, y downward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    /// Thickness of the floor and side walls
    pub wall_thickness: f64,
    /// Downward acceleration in px/ms²
    pub gravity: f64,
    /// Fraction of velocity lost per 60 Hz step
    pub air_friction: f64,
    /// Physics steps per second
    pub tick_rate: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 600.0,
            wall_thickness: 50.0,
            gravity: 0.001,
            air_friction: 0.01,
            tick_rate: 60.0,
        }
    }
}

impl WorldConfig {
    /// Duration of one tick in milliseconds
    pub fn tick_ms(&self) -> f64 {
        1000.0 / self.tick_rate
    }
}

/// Cart, bob and arm geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendulumConfig {
    pub arm_length: f64,
    /// Cart width and height
    pub cart_size: [f64; 2],
    pub bob_radius: f64,
    /// Mass per square pixel
    pub density: f64,
    pub bob_restitution: f64,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            arm_length: 200.0,
            cart_size: [40.0, 20.0],
            bob_radius: 10.0,
            density: 0.001,
            bob_restitution: 0.5,
        }
    }
}

/// Where the gains come from
///
/// In TOML this is a `[gains]` table whose optional `mode` key selects
/// `sliders` (the default) or `fixed`; missing gains take that mode's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "GainsTable", into = "GainsTable")]
pub enum GainsConfig {
    /// Adjustable sliders starting at the given values
    Sliders { kp: f64, kd: f64 },
    /// Constants
    Fixed { kp: f64, kd: f64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum GainsMode {
    #[default]
    Sliders,
    Fixed,
}

/// On-disk shape of `[gains]`
#[derive(Serialize, Deserialize)]
struct GainsTable {
    #[serde(default)]
    mode: GainsMode,
    kp: Option<f64>,
    kd: Option<f64>,
}

impl From<GainsTable> for GainsConfig {
    fn from(table: GainsTable) -> Self {
        match table.mode {
            GainsMode::Sliders => GainsConfig::Sliders {
                kp: table.kp.unwrap_or(SliderGains::DEFAULT_KP),
                kd: table.kd.unwrap_or(SliderGains::DEFAULT_KD),
            },
            GainsMode::Fixed => GainsConfig::Fixed {
                kp: table.kp.unwrap_or(FixedGains::DEFAULT_KP),
                kd: table.kd.unwrap_or(FixedGains::DEFAULT_KD),
            },
        }
    }
}

impl From<GainsConfig> for GainsTable {
    fn from(config: GainsConfig) -> Self {
        let (mode, kp, kd) = match config {
            GainsConfig::Sliders { kp, kd } => (GainsMode::Sliders, kp, kd),
            GainsConfig::Fixed { kp, kd } => (GainsMode::Fixed, kp, kd),
        };
        GainsTable {
            mode,
            kp: Some(kp),
            kd: Some(kd),
        }
    }
}

impl Default for GainsConfig {
    fn default() -> Self {
        GainsConfig::Sliders {
            kp: SliderGains::DEFAULT_KP,
            kd: SliderGains::DEFAULT_KD,
        }
    }
}

impl GainsConfig {
    pub fn values(&self) -> (f64, f64) {
        match *self {
            GainsConfig::Sliders { kp, kd } | GainsConfig::Fixed { kp, kd } => (kp, kd),
        }
    }
}

/// Error chart settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Number of samples kept on the chart
    pub capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { capacity: 200 }
    }
}

/// Manual pushes on the bob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    /// Horizontal force of one push
    pub force: f64,
    /// Pushes replayed by headless runs
    pub schedule: Vec<ScheduledPush>,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            force: 0.002,
            schedule: Vec::new(),
        }
    }
}

/// A push applied at a given tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPush {
    pub tick: u64,
    pub direction: Direction,
}

impl SimConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(text).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Reject settings the world cannot be built from
    pub fn validate(&self) -> Result<()> {
        let world = &self.world;
        let pendulum = &self.pendulum;

        if !(world.tick_rate > 0.0 && world.tick_rate.is_finite()) {
            bail!("world.tick_rate must be positive");
        }
        if world.wall_thickness <= 0.0 {
            bail!("world.wall_thickness must be positive");
        }
        if world.width <= 2.0 * world.wall_thickness || world.height <= world.wall_thickness {
            bail!("world is too small for its walls");
        }
        if !(0.0..1.0).contains(&world.air_friction) {
            bail!("world.air_friction must lie in [0, 1)");
        }
        if pendulum.arm_length <= 0.0 {
            bail!("pendulum.arm_length must be positive");
        }
        if pendulum.cart_size.iter().any(|s| *s <= 0.0) {
            bail!("pendulum.cart_size must be positive");
        }
        if pendulum.bob_radius <= 0.0 || pendulum.density <= 0.0 {
            bail!("pendulum.bob_radius and pendulum.density must be positive");
        }
        if self.telemetry.capacity == 0 {
            bail!("telemetry.capacity must be at least 1");
        }

        match self.gains {
            GainsConfig::Sliders { kp, kd } => {
                SliderGains::starting_at(kp, kd)?;
            }
            GainsConfig::Fixed { kp, kd } => {
                if !(kp.is_finite() && kd.is_finite()) {
                    bail!("fixed gains must be finite");
                }
            }
        }

        if let Some(centering) = self.centering {
            if !(centering.null_gain.is_finite() && centering.target_x.is_finite()) {
                bail!("centering gain and target must be finite");
            }
        }

        Ok(())
    }
}
