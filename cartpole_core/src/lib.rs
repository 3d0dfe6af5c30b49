//! # Cart-pole core
//!
//! Control logic for an inverted pendulum riding on a cart, independent of
//! any particular physics engine or front end.
//!
//! ## Structure
//!
//! ```text
//! cartpole_core/
//! ── control/     # PD balance controller, angle wrap, gain providers
//! ── physics      # Narrow capability the controller needs from a world
//! ── telemetry    # Rolling error trace for charting
//! ── error        # Error types
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use cartpole_core::control::BalanceController;
//! use nalgebra::Point2;
//!
//! let mut controller = BalanceController::new();
//!
//! // Bob tipped slightly right of the cart (screen coordinates, y down)
//! let cart = Point2::new(700.0, 540.0);
//! let bob = Point2::new(710.0, 340.0);
//!
//! let out = controller.compute(cart, bob, 16.0, 0.005, 0.2);
//! assert!(out.error < 0.0);
//! assert!(out.output > 0.0); // push the cart right, back under the bob
//! ```

pub mod control;
pub mod error;
pub mod physics;
pub mod telemetry;

pub use control::{
    BalanceController, Centering, ControlOutput, FixedGains, GainProvider, GainSlider,
    SliderGains,
};
pub use error::{ControlError, ControlResult};
pub use physics::{PendulumRig, PhysicsBackend};
pub use telemetry::{CircularBuffer, ErrorTrace};
