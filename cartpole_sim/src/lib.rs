//! # cartpole_sim - Cart-pole balance simulator
//!
//! An inverted pendulum on a cart, simulated with rapier2d and kept upright
//! by the PD controller from `cartpole_core`. Runs headless from the CLI or
//! interactively in a terminal dashboard.
//!
//! ## Binary Usage
//! ```bash
//! cartpole run --ticks 600 --record run.csv
//! cartpole tui --fixed
//! ```
//!
//! ## Library Usage
//! ```rust,no_run
//! use cartpole_sim::{CartPoleSimBuilder, Direction, SimConfig};
//!
//! let mut sim = CartPoleSimBuilder::new()
//!     .with_config(SimConfig::default())
//!     .build()
//!     .unwrap();
//!
//! sim.run_for(120).unwrap();
//! sim.push(Direction::Right).unwrap();
//! sim.run_for(120).unwrap();
//! println!("latest error: {:?}", sim.trace().latest());
//! ```

pub mod config;
pub mod recorder;
pub mod tui;
pub mod world;

pub use config::{
    GainsConfig, PendulumConfig, PerturbationConfig, ScheduledPush, SimConfig, TelemetryConfig,
    WorldConfig,
};
pub use recorder::{Recorder, RunSummary, TickRecord};
pub use world::PendulumWorld;

use anyhow::Result;
use cartpole_core::{
    BalanceController, ControlOutput, ErrorTrace, FixedGains, GainProvider, PendulumRig,
    PhysicsBackend, SliderGains,
};
use nalgebra::{Point2, Vector2};
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Direction of a manual push on the bob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// -1.0 for left, 1.0 for right
    pub fn sign(self) -> f64 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

/// State of the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    /// Ticks advance the simulation
    Running,
    /// Ticks are ignored until resumed
    Paused,
    /// Stopped; only a reset restarts the loop
    Stopped,
}

/// Gains used by a simulation
#[derive(Debug, Clone, PartialEq)]
pub enum Gains {
    Fixed(FixedGains),
    Sliders(SliderGains),
}

impl Gains {
    pub fn from_config(config: &GainsConfig) -> Result<Self> {
        Ok(match *config {
            GainsConfig::Fixed { kp, kd } => Gains::Fixed(FixedGains::new(kp, kd)),
            GainsConfig::Sliders { kp, kd } => {
                Gains::Sliders(SliderGains::starting_at(kp, kd)?)
            }
        })
    }

    /// Put sliders back at their defaults; fixed gains are left alone
    pub fn reset(&mut self) {
        if let Gains::Sliders(sliders) = self {
            sliders.reset();
        }
    }

    /// The sliders, when the gains are adjustable
    pub fn sliders_mut(&mut self) -> Option<&mut SliderGains> {
        match self {
            Gains::Sliders(sliders) => Some(sliders),
            Gains::Fixed(_) => None,
        }
    }

    pub fn sliders(&self) -> Option<&SliderGains> {
        match self {
            Gains::Sliders(sliders) => Some(sliders),
            Gains::Fixed(_) => None,
        }
    }
}

impl GainProvider for Gains {
    fn kp(&self) -> f64 {
        match self {
            Gains::Fixed(g) => g.kp(),
            Gains::Sliders(g) => g.kp(),
        }
    }

    fn kd(&self) -> f64 {
        match self {
            Gains::Fixed(g) => g.kd(),
            Gains::Sliders(g) => g.kd(),
        }
    }
}

/// Builder for creating a cart-pole simulation
pub struct CartPoleSimBuilder {
    config: Option<SimConfig>,
    record: bool,
}

impl CartPoleSimBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: None,
            record: false,
        }
    }

    /// Set the simulation configuration
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Keep a per-tick record of the run
    pub fn with_recorder(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Build the world and start the run loop
    pub fn build(self) -> Result<CartPoleSim> {
        let config = self.config.unwrap_or_default();
        CartPoleSim::new(config, self.record)
    }
}

impl Default for CartPoleSimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running cart-pole simulation
pub struct CartPoleSim {
    config: SimConfig,
    world: PendulumWorld,
    rig: PendulumRig<RigidBodyHandle>,
    controller: BalanceController,
    gains: Gains,
    trace: ErrorTrace,
    recorder: Option<Recorder>,
    state: SimState,
    tick: u64,
    elapsed_ms: f64,
    last_output: Option<ControlOutput>,
}

impl CartPoleSim {
    /// Create a simulation from a configuration
    pub fn new(config: SimConfig, record: bool) -> Result<Self> {
        config.validate()?;

        let mut world = PendulumWorld::new(config.world.clone(), config.pendulum.clone());
        let rig = world.build_pendulum();

        let mut controller = BalanceController::new();
        controller.set_centering(config.centering);

        let gains = Gains::from_config(&config.gains)?;
        let trace = ErrorTrace::new(config.telemetry.capacity);
        let recorder = record.then(|| Recorder::new("cartpole"));

        info!(
            kp = gains.kp(),
            kd = gains.kd(),
            centering = config.centering.is_some(),
            "Simulation ready"
        );

        Ok(Self {
            config,
            world,
            rig,
            controller,
            gains,
            trace,
            recorder,
            state: SimState::Running,
            tick: 0,
            elapsed_ms: 0.0,
            last_output: None,
        })
    }

    /// Advance one tick: control, physics, telemetry
    ///
    /// Returns `None` when the loop is not running.
    pub fn step(&mut self) -> Result<Option<ControlOutput>> {
        if self.state != SimState::Running {
            return Ok(None);
        }

        self.apply_scheduled_pushes()?;

        let dt = self.world.tick_ms();
        let cart = self.world.position(self.rig.cart)?;
        let bob = self.world.position(self.rig.bob)?;

        let out = self
            .controller
            .tick(&mut self.world, self.rig, &self.gains, dt)?;
        self.world.step();

        self.trace.record(out.error);
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(TickRecord::new(self.tick, self.elapsed_ms, cart, bob, &out));
        }

        self.tick += 1;
        self.elapsed_ms += dt;
        self.last_output = Some(out);

        Ok(Some(out))
    }

    /// Step `ticks` times; returns how many ticks actually ran
    pub fn run_for(&mut self, ticks: u64) -> Result<u64> {
        let mut ran = 0;
        for _ in 0..ticks {
            if self.step()?.is_none() {
                break;
            }
            ran += 1;
        }
        Ok(ran)
    }

    fn apply_scheduled_pushes(&mut self) -> Result<()> {
        let due: Vec<Direction> = self
            .config
            .perturbation
            .schedule
            .iter()
            .filter(|p| p.tick == self.tick)
            .map(|p| p.direction)
            .collect();

        for direction in due {
            self.push(direction)?;
        }
        Ok(())
    }

    /// Nudge the bob sideways, independent of the controller
    pub fn push(&mut self, direction: Direction) -> Result<()> {
        let at = self.world.position(self.rig.bob)?;
        let force = Vector2::new(direction.sign() * self.config.perturbation.force, 0.0);
        self.world.apply_force(self.rig.bob, at, force)?;
        debug!(?direction, tick = self.tick, "Bob pushed");
        Ok(())
    }

    /// Rebuild the pendulum at its initial pose
    ///
    /// Clears the previous error, returns slider gains to their defaults and
    /// restarts the run loop.
    pub fn reset(&mut self) {
        self.state = SimState::Stopped;

        self.world.clear_pendulum();
        self.controller.reset();
        self.gains.reset();
        self.last_output = None;

        self.rig = self.world.build_pendulum();
        self.state = SimState::Running;

        info!(tick = self.tick, "Simulation reset");
    }

    pub fn pause(&mut self) {
        if self.state == SimState::Running {
            self.state = SimState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == SimState::Paused {
            self.state = SimState::Running;
        }
    }

    /// Toggle between running and paused
    pub fn toggle_pause(&mut self) {
        match self.state {
            SimState::Running => self.pause(),
            SimState::Paused => self.resume(),
            SimState::Stopped => {}
        }
    }

    pub fn stop(&mut self) {
        self.state = SimState::Stopped;
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// Ticks run since the simulation was created
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn trace(&self) -> &ErrorTrace {
        &self.trace
    }

    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    pub fn gains_mut(&mut self) -> &mut Gains {
        &mut self.gains
    }

    pub fn controller(&self) -> &BalanceController {
        &self.controller
    }

    pub fn last_output(&self) -> Option<ControlOutput> {
        self.last_output
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &PendulumWorld {
        &self.world
    }

    /// Current cart and bob positions
    pub fn positions(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        self.world.pendulum_positions()
    }

    pub fn recorder(&self) -> Option<&Recorder> {
        self.recorder.as_ref()
    }

    /// Take the recorder out, leaving the simulation unrecorded
    pub fn take_recorder(&mut self) -> Option<Recorder> {
        self.recorder.take()
    }
}
