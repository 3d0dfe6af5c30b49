//! PD Balance Controller
//!
//! Keeps an inverted pendulum upright by pushing its cart sideways.
//!
//! # Features
//!
//! - Heading measured from cart and bob positions
//! - Two-branch error wrap (see [`wrap_error`])
//! - Optional centering bias toward a target cart position
//! - Degenerate ticks (zero or negative duration) skip the derivative term
//!
//! # Example
//!
//! ```rust
//! use cartpole_core::control::{BalanceController, Centering};
//! use nalgebra::Point2;
//!
//! let mut controller = BalanceController::new()
//!     .with_centering(Centering::new(0.0005, 700.0));
//!
//! let cart = Point2::new(720.0, 540.0);
//! let bob = Point2::new(720.0, 340.0);
//!
//! // Upright, but 20px right of target: a small centering error remains
//! let out = controller.compute(cart, bob, 16.0, 0.005, 0.2);
//! assert!(out.error < 0.0);
//! ```

use super::angle::{heading_angle, wrap_error};
use super::gains::GainProvider;
use crate::error::ControlResult;
use crate::physics::{PendulumRig, PhysicsBackend};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bias pulling the cart toward a target x position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centering {
    /// Error per unit of cart displacement from the target
    pub null_gain: f64,
    /// Target cart x position
    pub target_x: f64,
}

impl Centering {
    pub fn new(null_gain: f64, target_x: f64) -> Self {
        Self {
            null_gain,
            target_x,
        }
    }
}

/// Everything computed during one controller tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlOutput {
    /// Arm heading, 0 when upright
    pub heading: f64,
    /// Wrapped error, including any centering bias
    pub error: f64,
    /// Rate of change of the error
    pub delta_error: f64,
    /// Proportional term (Kp * error)
    pub p_term: f64,
    /// Derivative term (Kd * delta_error)
    pub d_term: f64,
    /// Horizontal force requested for the cart
    pub output: f64,
}

impl ControlOutput {
    /// The purely horizontal force vector
    pub fn force(&self) -> Vector2<f64> {
        Vector2::new(self.output, 0.0)
    }
}

/// PD controller for the cart-pole
#[derive(Debug, Clone, Default)]
pub struct BalanceController {
    previous_error: f64,
    centering: Option<Centering>,
}

impl BalanceController {
    /// Create a controller with no centering bias
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the centering bias
    pub fn with_centering(mut self, centering: Centering) -> Self {
        self.centering = Some(centering);
        self
    }

    /// Replace or remove the centering bias
    pub fn set_centering(&mut self, centering: Option<Centering>) {
        self.centering = centering;
    }

    pub fn centering(&self) -> Option<Centering> {
        self.centering
    }

    /// Error computed on the previous tick (0 after a reset)
    pub fn previous_error(&self) -> f64 {
        self.previous_error
    }

    /// Forget the previous error
    pub fn reset(&mut self) {
        self.previous_error = 0.0;
    }

    /// Compute the control output from body positions
    ///
    /// # Arguments
    /// * `cart` - Cart position (screen coordinates, y down)
    /// * `bob` - Bob position
    /// * `dt` - Tick duration, in the time unit the gains are tuned for
    /// * `kp` - Proportional gain
    /// * `kd` - Derivative gain
    pub fn compute(
        &mut self,
        cart: Point2<f64>,
        bob: Point2<f64>,
        dt: f64,
        kp: f64,
        kd: f64,
    ) -> ControlOutput {
        let heading = heading_angle(cart, bob);
        let mut error = wrap_error(heading);

        if let Some(centering) = self.centering {
            error -= centering.null_gain * (cart.x - centering.target_x);
        }

        let delta_error = if dt > 0.0 && dt.is_finite() {
            (error - self.previous_error) / dt
        } else {
            debug!(dt, "degenerate tick duration, derivative term skipped");
            0.0
        };

        self.previous_error = error;

        let p_term = kp * error;
        let d_term = kd * delta_error;

        // Error is negative when the arm leans right of the cart
        let output = -p_term - d_term;

        ControlOutput {
            heading,
            error,
            delta_error,
            p_term,
            d_term,
            output,
        }
    }

    /// Run one tick against a physics world
    ///
    /// Reads both body positions, polls the gains and applies the resulting
    /// horizontal force at the cart's current position.
    pub fn tick<W, G>(
        &mut self,
        world: &mut W,
        rig: PendulumRig<W::Body>,
        gains: &G,
        dt: f64,
    ) -> ControlResult<ControlOutput>
    where
        W: PhysicsBackend + ?Sized,
        G: GainProvider + ?Sized,
    {
        let cart = world.position(rig.cart)?;
        let bob = world.position(rig.bob)?;

        let out = self.compute(cart, bob, dt, gains.kp(), gains.kd());
        world.apply_force(rig.cart, cart, out.force())?;

        Ok(out)
    }
}
