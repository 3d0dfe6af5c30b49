//! rapier2d world holding the cart-pole scene
//!
//! The scene uses screen layout: pixel coordinates with y growing
//! downward, a floor and two side walls, a cart dropped onto the floor and a
//! bob pinned `arm_length` above it. Forces arrive in pixel-millisecond units
//! (mass·px/ms²) and act for exactly one step.

use crate::config::{PendulumConfig, WorldConfig};
use cartpole_core::{ControlError, ControlResult, PendulumRig, PhysicsBackend};
use nalgebra::{Point2, Vector2};
use rapier2d::prelude::*;
use tracing::{debug, info};

/// Converts a force in mass·px/ms² into rapier's mass·px/s²
pub const FORCE_SCALE: f64 = 1.0e6;

/// Handles of the bodies and joint making up the pendulum
#[derive(Debug, Clone, Copy)]
struct PendulumHandles {
    cart: RigidBodyHandle,
    bob: RigidBodyHandle,
    joint: ImpulseJointHandle,
}

/// Physics world for one cart-pole
pub struct PendulumWorld {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    physics_hooks: (),
    event_handler: (),

    world_config: WorldConfig,
    pendulum_config: PendulumConfig,
    pendulum: Option<PendulumHandles>,
}

impl PendulumWorld {
    /// Create the static scene (floor and walls), without a pendulum
    pub fn new(world_config: WorldConfig, pendulum_config: PendulumConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = (1.0 / world_config.tick_rate) as Real;

        // px/ms² to px/s²
        let gravity = vector![0.0, (world_config.gravity * 1.0e6) as Real];

        let mut world = Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity,
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            physics_hooks: (),
            event_handler: (),
            world_config,
            pendulum_config,
            pendulum: None,
        };
        world.build_boundaries();
        world
    }

    fn build_boundaries(&mut self) {
        let w = self.world_config.width as Real;
        let h = self.world_config.height as Real;
        let t = self.world_config.wall_thickness as Real;

        // Floor, left wall, right wall: (centre, half extents)
        let boundaries = [
            (vector![w / 2.0, h - t / 2.0], vector![w / 2.0, t / 2.0]),
            (vector![t / 2.0, h / 2.0], vector![t / 2.0, h / 2.0]),
            (vector![w - t / 2.0, h / 2.0], vector![t / 2.0, h / 2.0]),
        ];

        for (center, half) in boundaries {
            let body = RigidBodyBuilder::fixed().translation(center).build();
            let handle = self.rigid_body_set.insert(body);
            let collider = ColliderBuilder::cuboid(half.x, half.y)
                .friction(0.0)
                .restitution(1.0)
                .build();
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        }
    }

    /// Per-second damping equivalent to losing `air_friction` of the
    /// velocity every 60 Hz step
    fn damping(&self) -> Real {
        let f = self.world_config.air_friction;
        let base_dt = 1.0 / 60.0;
        (f / ((1.0 - f) * base_dt)) as Real
    }

    /// Add the cart, the bob and the arm joining them at their initial pose
    ///
    /// Any existing pendulum is removed first.
    pub fn build_pendulum(&mut self) -> PendulumRig<RigidBodyHandle> {
        self.clear_pendulum();

        let cfg = &self.pendulum_config;
        let x = (self.world_config.width / 2.0) as Real;
        let arm = cfg.arm_length as Real;
        let damping = self.damping();

        let cart_body = RigidBodyBuilder::dynamic()
            .translation(vector![x, arm])
            .linear_damping(damping)
            .angular_damping(damping)
            .build();
        let cart = self.rigid_body_set.insert(cart_body);
        let cart_collider = ColliderBuilder::cuboid(
            (cfg.cart_size[0] / 2.0) as Real,
            (cfg.cart_size[1] / 2.0) as Real,
        )
        .density(cfg.density as Real)
        .friction(0.0)
        .restitution(0.0)
        .build();
        self.collider_set
            .insert_with_parent(cart_collider, cart, &mut self.rigid_body_set);

        let bob_body = RigidBodyBuilder::dynamic()
            .translation(vector![x, 0.0])
            .linear_damping(damping)
            .angular_damping(damping)
            .build();
        let bob = self.rigid_body_set.insert(bob_body);
        let bob_collider = ColliderBuilder::ball(cfg.bob_radius as Real)
            .density(cfg.density as Real)
            .friction(0.0)
            .restitution(cfg.bob_restitution as Real)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .build();
        self.collider_set
            .insert_with_parent(bob_collider, bob, &mut self.rigid_body_set);

        // Pin the bob at arm length from the cart centre, free to swing
        let arm_joint = RevoluteJointBuilder::new()
            .local_anchor1(point![0.0, 0.0])
            .local_anchor2(point![0.0, arm])
            .build();
        let joint = self.impulse_joint_set.insert(cart, bob, arm_joint, true);

        self.pendulum = Some(PendulumHandles { cart, bob, joint });
        info!(arm_length = cfg.arm_length, "Pendulum built");

        PendulumRig::new(cart, bob)
    }

    /// Remove the cart, the bob and their joint
    pub fn clear_pendulum(&mut self) {
        let Some(handles) = self.pendulum.take() else {
            return;
        };

        self.impulse_joint_set.remove(handles.joint, true);
        for body in [handles.cart, handles.bob] {
            self.rigid_body_set.remove(
                body,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
        }
        debug!("Pendulum cleared");
    }

    /// Handles of the current pendulum, if one is built
    pub fn rig(&self) -> Option<PendulumRig<RigidBodyHandle>> {
        self.pendulum.map(|h| PendulumRig::new(h.cart, h.bob))
    }

    pub fn has_pendulum(&self) -> bool {
        self.pendulum.is_some()
    }

    /// Current cart and bob positions
    pub fn pendulum_positions(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let rig = self.rig()?;
        let cart = self.position(rig.cart).ok()?;
        let bob = self.position(rig.bob).ok()?;
        Some((cart, bob))
    }

    /// Horizontal cart velocity in px/ms
    pub fn cart_velocity(&self) -> Option<f64> {
        let rig = self.rig()?;
        let body = self.rigid_body_set.get(rig.cart)?;
        Some(body.linvel().x as f64 / 1000.0)
    }

    /// Advance the world by one tick
    ///
    /// Forces applied since the previous step act during this step only.
    pub fn step(&mut self) {
        let PendulumWorld {
            ref mut physics_pipeline,
            ref gravity,
            ref integration_parameters,
            ref mut island_manager,
            ref mut broad_phase,
            ref mut narrow_phase,
            ref mut rigid_body_set,
            ref mut collider_set,
            ref mut impulse_joint_set,
            ref mut multibody_joint_set,
            ref mut ccd_solver,
            ref physics_hooks,
            ref event_handler,
            ..
        } = *self;

        physics_pipeline.step(
            gravity,
            integration_parameters,
            island_manager,
            broad_phase,
            narrow_phase,
            rigid_body_set,
            collider_set,
            impulse_joint_set,
            multibody_joint_set,
            ccd_solver,
            None,
            physics_hooks,
            event_handler,
        );

        if let Some(handles) = self.pendulum {
            for body in [handles.cart, handles.bob] {
                if let Some(rb) = self.rigid_body_set.get_mut(body) {
                    rb.reset_forces(false);
                }
            }
        }
    }

    /// Duration of one step in milliseconds
    pub fn tick_ms(&self) -> f64 {
        self.world_config.tick_ms()
    }

    pub fn world_config(&self) -> &WorldConfig {
        &self.world_config
    }

    pub fn pendulum_config(&self) -> &PendulumConfig {
        &self.pendulum_config
    }

    /// Number of bodies in the world, boundaries included
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Number of joints in the world
    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }
}

impl PhysicsBackend for PendulumWorld {
    type Body = RigidBodyHandle;

    fn position(&self, body: RigidBodyHandle) -> ControlResult<Point2<f64>> {
        let rb = self
            .rigid_body_set
            .get(body)
            .ok_or_else(|| ControlError::UnknownBody(format!("{:?}", body)))?;
        let t = rb.translation();
        Ok(Point2::new(t.x as f64, t.y as f64))
    }

    fn apply_force(
        &mut self,
        body: RigidBodyHandle,
        at: Point2<f64>,
        force: Vector2<f64>,
    ) -> ControlResult<()> {
        let rb = self
            .rigid_body_set
            .get_mut(body)
            .ok_or_else(|| ControlError::UnknownBody(format!("{:?}", body)))?;

        let scaled = force * FORCE_SCALE;
        rb.add_force_at_point(
            vector![scaled.x as Real, scaled.y as Real],
            point![at.x as Real, at.y as Real],
            true,
        );
        Ok(())
    }
}
