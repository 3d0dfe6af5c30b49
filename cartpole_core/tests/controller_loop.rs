//! Controller driven through the physics capability
//!
//! Uses a static test world that records requested forces, enough to check
//! that ticks read positions, push on the right body and carry state.

use approx::assert_relative_eq;
use cartpole_core::{
    BalanceController, ControlError, ControlResult, ErrorTrace, FixedGains, PendulumRig,
    PhysicsBackend, SliderGains,
};
use nalgebra::{Point2, Vector2};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Body {
    Cart,
    Bob,
}

#[derive(Default)]
struct TestWorld {
    positions: HashMap<Body, Point2<f64>>,
    forces: Vec<(Body, Point2<f64>, Vector2<f64>)>,
}

impl TestWorld {
    fn with_arm(heading: f64) -> Self {
        let cart = Point2::new(700.0, 540.0);
        let angle = heading - std::f64::consts::FRAC_PI_2;
        let bob = cart + Vector2::new(angle.cos(), angle.sin()) * 200.0;

        let mut world = Self::default();
        world.positions.insert(Body::Cart, cart);
        world.positions.insert(Body::Bob, bob);
        world
    }
}

impl PhysicsBackend for TestWorld {
    type Body = Body;

    fn position(&self, body: Body) -> ControlResult<Point2<f64>> {
        self.positions
            .get(&body)
            .copied()
            .ok_or_else(|| ControlError::UnknownBody(format!("{:?}", body)))
    }

    fn apply_force(
        &mut self,
        body: Body,
        at: Point2<f64>,
        force: Vector2<f64>,
    ) -> ControlResult<()> {
        if !self.positions.contains_key(&body) {
            return Err(ControlError::UnknownBody(format!("{:?}", body)));
        }
        self.forces.push((body, at, force));
        Ok(())
    }
}

fn rig() -> PendulumRig<Body> {
    PendulumRig::new(Body::Cart, Body::Bob)
}

#[test]
fn test_tick_applies_horizontal_force_at_cart() {
    let mut world = TestWorld::with_arm(0.05);
    let mut controller = BalanceController::new();

    let out = controller
        .tick(&mut world, rig(), &FixedGains::default(), 16.0)
        .unwrap();

    assert_eq!(world.forces.len(), 1);
    let (body, at, force) = world.forces[0];
    assert_eq!(body, Body::Cart);
    assert_eq!(at, Point2::new(700.0, 540.0));
    assert_eq!(force.y, 0.0);
    assert_eq!(force.x, out.output);
    assert!(force.x > 0.0);
}

#[test]
fn test_tick_does_not_move_bodies() {
    let mut world = TestWorld::with_arm(-0.1);
    let before = world.positions.clone();
    let mut controller = BalanceController::new();

    controller
        .tick(&mut world, rig(), &SliderGains::default(), 16.0)
        .unwrap();

    assert_eq!(world.positions, before);
}

#[test]
fn test_tick_polls_gains_each_time() {
    let mut world = TestWorld::with_arm(0.1);
    let mut controller = BalanceController::new();
    let mut gains = SliderGains::default();

    controller.tick(&mut world, rig(), &gains, 16.0).unwrap();

    gains.kp.set(0.0);
    gains.kd.set(0.0);
    let out = controller.tick(&mut world, rig(), &gains, 16.0).unwrap();

    assert_eq!(out.output, 0.0);
}

#[test]
fn test_missing_body_is_reported() {
    let mut world = TestWorld::with_arm(0.0);
    world.positions.remove(&Body::Bob);
    let mut controller = BalanceController::new();

    let result = controller.tick(&mut world, rig(), &FixedGains::default(), 16.0);

    assert_eq!(result, Err(ControlError::UnknownBody("Bob".to_string())));
    assert!(world.forces.is_empty());
    assert_eq!(controller.previous_error(), 0.0);
}

#[test]
fn test_error_trace_follows_ticks() {
    let mut controller = BalanceController::new();
    let mut trace = ErrorTrace::default();
    let mut expected = Vec::new();

    for i in 0..260 {
        let heading = ((i as f64) * 0.05).sin() * 0.2;
        let mut world = TestWorld::with_arm(heading);
        let out = controller
            .tick(&mut world, rig(), &FixedGains::default(), 16.0)
            .unwrap();
        assert_eq!(controller.previous_error(), out.error);

        trace.record(out.error);
        expected.push(out.error);
    }

    let samples = trace.samples();
    assert_eq!(samples.len(), 200);
    assert_eq!(samples, expected[60..].to_vec());
    assert_relative_eq!(trace.latest().unwrap(), *expected.last().unwrap());
}
