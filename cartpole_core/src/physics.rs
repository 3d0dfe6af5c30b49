//! Physics capability used by the balance controller
//!
//! The controller never touches a physics engine directly. It reads two body
//! positions and requests one force per tick through [`PhysicsBackend`], so a
//! rapier world, a test double or any other engine can sit behind it.

use crate::error::ControlResult;
use nalgebra::{Point2, Vector2};
use std::fmt::Debug;

/// Narrow view of a physics world
pub trait PhysicsBackend {
    /// Handle identifying a body in the world
    type Body: Copy + Debug;

    /// Current position of a body's centre
    fn position(&self, body: Self::Body) -> ControlResult<Point2<f64>>;

    /// Apply a force to a body at a world-space point
    ///
    /// The force acts for the next physics step only.
    fn apply_force(
        &mut self,
        body: Self::Body,
        at: Point2<f64>,
        force: Vector2<f64>,
    ) -> ControlResult<()>;
}

/// Handles of the two bodies making up the pendulum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendulumRig<B> {
    /// The actuated cart
    pub cart: B,
    /// The free bob at the end of the arm
    pub bob: B,
}

impl<B: Copy> PendulumRig<B> {
    pub fn new(cart: B, bob: B) -> Self {
        Self { cart, bob }
    }
}
