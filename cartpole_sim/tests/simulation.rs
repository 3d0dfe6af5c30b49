//! End-to-end runs of the simulator against the rapier world

use approx::assert_relative_eq;
use cartpole_core::{Centering, GainProvider, SliderGains};
use cartpole_sim::{
    CartPoleSim, CartPoleSimBuilder, Direction, GainsConfig, Recorder, ScheduledPush, SimConfig,
    SimState,
};
use tempfile::TempDir;

fn recorded_sim(config: SimConfig) -> CartPoleSim {
    CartPoleSimBuilder::new()
        .with_config(config)
        .with_recorder(true)
        .build()
        .unwrap()
}

fn errors(sim: &CartPoleSim) -> Vec<f64> {
    sim.recorder()
        .unwrap()
        .records()
        .iter()
        .map(|r| r.error)
        .collect()
}

#[test]
fn test_unperturbed_pendulum_stays_upright() {
    let mut sim = recorded_sim(SimConfig::default());
    assert_eq!(sim.run_for(120).unwrap(), 120);

    let summary = sim.recorder().unwrap().summary();
    assert_eq!(summary.ticks, 120);
    assert!(summary.max_abs_error < 0.05, "{:?}", summary);

    let (cart, bob) = sim.positions().unwrap();
    assert!(bob.y < cart.y, "bob fell below the cart");
}

#[test]
fn test_trace_keeps_latest_samples() {
    let mut sim = recorded_sim(SimConfig::default());
    sim.run_for(250).unwrap();

    let trace = sim.trace();
    assert_eq!(trace.len(), 200);

    let recorded = errors(&sim);
    assert_eq!(recorded.len(), 250);
    assert_eq!(trace.samples(), recorded[50..].to_vec());
}

#[test]
fn test_scheduled_push_changes_trajectory() {
    let mut pushed_config = SimConfig::default();
    pushed_config.perturbation.schedule.push(ScheduledPush {
        tick: 5,
        direction: Direction::Right,
    });

    let mut calm = recorded_sim(SimConfig::default());
    let mut pushed = recorded_sim(pushed_config);
    calm.run_for(40).unwrap();
    pushed.run_for(40).unwrap();

    let calm_errors = errors(&calm);
    let pushed_errors = errors(&pushed);

    // Identical up to and including the tick the push lands on
    assert_eq!(calm_errors[..=5], pushed_errors[..=5]);

    let (_, calm_bob) = calm.positions().unwrap();
    let (_, pushed_bob) = pushed.positions().unwrap();
    assert!((pushed_bob.x - calm_bob.x).abs() > 1e-3);
}

#[test]
fn test_runs_are_deterministic() {
    let mut a = recorded_sim(SimConfig::default());
    let mut b = recorded_sim(SimConfig::default());
    a.push(Direction::Left).unwrap();
    b.push(Direction::Left).unwrap();
    a.run_for(60).unwrap();
    b.run_for(60).unwrap();

    assert_eq!(errors(&a), errors(&b));
    assert_eq!(a.positions(), b.positions());
}

#[test]
fn test_reset_restores_initial_state() {
    let mut sim = recorded_sim(SimConfig::default());
    let initial = sim.positions().unwrap();

    sim.push(Direction::Right).unwrap();
    sim.run_for(30).unwrap();
    if let Some(sliders) = sim.gains_mut().sliders_mut() {
        sliders.kp.nudge(2);
        sliders.kd.nudge(-3);
    }
    let latest = sim.trace().latest();

    sim.reset();

    assert_eq!(sim.state(), SimState::Running);
    assert_eq!(sim.controller().previous_error(), 0.0);
    assert_eq!(sim.gains().kp(), SliderGains::DEFAULT_KP);
    assert_eq!(sim.gains().kd(), SliderGains::DEFAULT_KD);
    assert_eq!(sim.last_output(), None);

    let (cart, bob) = sim.positions().unwrap();
    assert_relative_eq!(cart.x, initial.0.x, epsilon = 1e-4);
    assert_relative_eq!(cart.y, initial.0.y, epsilon = 1e-4);
    assert_relative_eq!(bob.x, initial.1.x, epsilon = 1e-4);
    assert_relative_eq!(bob.y, initial.1.y, epsilon = 1e-4);

    // The tick counter and the chart carry across resets
    assert_eq!(sim.tick(), 30);
    assert_eq!(sim.trace().latest(), latest);
    assert_eq!(sim.world().body_count(), 5);
    assert_eq!(sim.world().joint_count(), 1);
}

#[test]
fn test_reset_restores_standard_slider_defaults() {
    let mut config = SimConfig::default();
    config.gains = GainsConfig::Sliders { kp: 0.003, kd: 0.1 };
    let mut sim = recorded_sim(config);

    assert_relative_eq!(sim.gains().kp(), 0.003, epsilon = 1e-12);
    assert_relative_eq!(sim.gains().kd(), 0.1, epsilon = 1e-12);
    sim.run_for(5).unwrap();

    sim.reset();
    assert_eq!(sim.gains().kp(), SliderGains::DEFAULT_KP);
    assert_eq!(sim.gains().kd(), SliderGains::DEFAULT_KD);
}

#[test]
fn test_centering_draws_cart_to_target() {
    let mut config = SimConfig::default();
    config.centering = Some(Centering::new(0.0005, 600.0));
    let mut sim = recorded_sim(config);

    sim.run_for(2000).unwrap();

    let (cart, bob) = sim.positions().unwrap();
    assert!((cart.x - 600.0).abs() < 5.0, "cart settled at x = {}", cart.x);
    assert!(bob.y < cart.y, "bob fell below the cart");
    assert!(sim.last_output().unwrap().error.abs() < 0.05);
}

#[test]
fn test_reset_is_idempotent() {
    let mut sim = recorded_sim(SimConfig::default());
    sim.run_for(10).unwrap();

    sim.reset();
    let once = (sim.positions(), sim.gains().kp(), sim.gains().kd());
    sim.reset();
    let twice = (sim.positions(), sim.gains().kp(), sim.gains().kd());

    assert_eq!(once, twice);
    assert_eq!(sim.controller().previous_error(), 0.0);
    assert_eq!(sim.world().body_count(), 5);
}

#[test]
fn test_first_tick_after_reset_has_no_derivative_kick() {
    let mut sim = recorded_sim(SimConfig::default());
    sim.push(Direction::Left).unwrap();
    sim.run_for(20).unwrap();

    sim.reset();
    let out = sim.step().unwrap().unwrap();

    // Upright again, so the error and its change are both zero
    assert_relative_eq!(out.error, 0.0, epsilon = 1e-9);
    assert_relative_eq!(out.delta_error, 0.0, epsilon = 1e-9);
}

#[test]
fn test_recording_exports_to_csv() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("run.csv");

    let mut sim = recorded_sim(SimConfig::default());
    sim.run_for(20).unwrap();
    let recorder = sim.take_recorder().unwrap();
    recorder.export_csv(&path).unwrap();

    let loaded = Recorder::import_csv("loaded", &path).unwrap();
    assert_eq!(loaded.len(), 20);
    let ticks: Vec<u64> = loaded.records().iter().map(|r| r.tick).collect();
    assert_eq!(ticks, (0..20).collect::<Vec<_>>());
    assert_relative_eq!(loaded.records()[1].time_ms, 1000.0 / 60.0);

    // Recording stops once the recorder is taken
    sim.run_for(5).unwrap();
    assert!(sim.recorder().is_none());
}
