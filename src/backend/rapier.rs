//! Solver backed by `rapier3d`.
//!
//! The backend owns the whole rapier pipeline and steps it itself. Solver handles are
//! rapier's own arena indices, so no lookup table sits between the two.

#[cfg(feature = "parallel")]
use std::sync::Arc;

use std::sync::mpsc::{channel as unbounded, Receiver};
use glam::Vec3;
use rapier3d::prelude::{
    ActiveCollisionTypes, ActiveEvents, BroadPhaseBvh, CCDSolver, ChannelEventCollector,
    CoefficientCombineRule, Collider as RapierCollider, ColliderBuilder, ColliderHandle,
    ColliderSet, CollisionEvent, ContactForceEvent, Group, ImpulseJointSet,
    IntegrationParameters, InteractionGroups, IslandManager, LockedAxes as AxisLocks,
    MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryFilter, Ray as RapierRay, Real,
    RigidBodyBuilder, RigidBodyHandle, RigidBodySet, Vector,
};

use super::{
    BodyStatus, LockedAxes, PhysicsBackend, RawCollisionEvent, Ray, SolverBodyDesc,
    SolverColliderDesc, SolverRayHit, SolverShape,
};
use crate::{
    collision::contact::{ContactManifold, ManifoldPoint},
    config::{DEFAULT_ANGULAR_DAMPING, DEFAULT_GRAVITY, DEFAULT_LINEAR_DAMPING},
    core::{
        collider::CollisionFilter,
        types::{Material, MixingMode, Transform, Velocity},
    },
    error::{PhysicsError, Result},
    utils::{
        allocator::{ArenaId, GenerationalId, SolverBodyHandle, SolverColliderHandle},
        math::{from_isometry, from_point, from_vector, to_isometry, to_point, to_vector},
    },
};

fn rapier_body(handle: SolverBodyHandle) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(handle.index(), handle.generation())
}

fn solver_body(handle: RigidBodyHandle) -> SolverBodyHandle {
    let (index, generation) = handle.into_raw_parts();
    SolverBodyHandle::from_raw(GenerationalId::new(index, generation))
}

fn rapier_collider(handle: SolverColliderHandle) -> ColliderHandle {
    ColliderHandle::from_raw_parts(handle.index(), handle.generation())
}

fn solver_collider(handle: ColliderHandle) -> SolverColliderHandle {
    let (index, generation) = handle.into_raw_parts();
    SolverColliderHandle::from_raw(GenerationalId::new(index, generation))
}

fn combine_rule(mode: MixingMode) -> CoefficientCombineRule {
    match mode {
        MixingMode::Average => CoefficientCombineRule::Average,
        MixingMode::Min => CoefficientCombineRule::Min,
        MixingMode::Multiply => CoefficientCombineRule::Multiply,
        MixingMode::Max => CoefficientCombineRule::Max,
    }
}

fn interaction_groups(filter: &CollisionFilter) -> InteractionGroups {
    InteractionGroups::all()
        .with_memberships(Group::from_bits_truncate(filter.layer))
        .with_filter(Group::from_bits_truncate(filter.mask))
}

fn axis_locks(locked: LockedAxes) -> AxisLocks {
    let flags = [
        (locked.translation.x, AxisLocks::TRANSLATION_LOCKED_X),
        (locked.translation.y, AxisLocks::TRANSLATION_LOCKED_Y),
        (locked.translation.z, AxisLocks::TRANSLATION_LOCKED_Z),
        (locked.rotation.x, AxisLocks::ROTATION_LOCKED_X),
        (locked.rotation.y, AxisLocks::ROTATION_LOCKED_Y),
        (locked.rotation.z, AxisLocks::ROTATION_LOCKED_Z),
    ];
    flags
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(AxisLocks::empty(), |acc, (_, flag)| acc | flag)
}

fn shape_builder(shape: &SolverShape) -> Result<ColliderBuilder> {
    let builder = match shape {
        SolverShape::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        SolverShape::Ball { radius } => ColliderBuilder::ball(*radius),
        SolverShape::Capsule {
            half_height,
            radius,
        } => ColliderBuilder::capsule_y(*half_height, *radius),
        SolverShape::Cylinder {
            half_height,
            radius,
        } => ColliderBuilder::cylinder(*half_height, *radius),
        SolverShape::TriMesh { vertices, indices } => ColliderBuilder::trimesh(
            vertices.iter().copied().map(to_point).collect(),
            indices.clone(),
        )
        .map_err(|err| PhysicsError::BackendRejected(format!("triangle mesh: {err:?}")))?,
        SolverShape::ConvexHull { points } => {
            let points: Vec<_> = points.iter().copied().map(to_point).collect();
            ColliderBuilder::convex_hull(&points).ok_or_else(|| {
                PhysicsError::BackendRejected("convex hull points are degenerate".to_owned())
            })?
        }
    };
    Ok(builder)
}

/// [`PhysicsBackend`] running a rapier [`PhysicsPipeline`].
pub struct RapierBackend {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    event_collector: ChannelEventCollector,
    collision_events: Receiver<CollisionEvent>,
    _contact_forces: Receiver<ContactForceEvent>,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new(Vec3::from_array(DEFAULT_GRAVITY))
    }
}

impl RapierBackend {
    pub fn new(gravity: Vec3) -> Self {
        let (collision_send, collision_events) = unbounded();
        let (force_send, contact_forces) = unbounded();
        Self {
            gravity: to_vector(gravity),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            event_collector: ChannelEventCollector::new(collision_send, force_send),
            collision_events,
            _contact_forces: contact_forces,
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    /// Runs every step on a dedicated pool of `threads` workers instead of rayon's
    /// global pool.
    #[cfg(feature = "parallel")]
    pub fn with_worker_threads(mut self, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("space-physics-{index}"))
            .build()
            .map_err(|err| PhysicsError::BackendRejected(format!("solver thread pool: {err}")))?;
        self.pool = Some(Arc::new(pool));
        Ok(self)
    }

    pub fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = to_vector(gravity);
    }

    pub fn velocity(&self, body: SolverBodyHandle) -> Option<Velocity> {
        self.bodies.get(rapier_body(body)).map(|body| Velocity {
            linear: from_vector(body.linvel()),
            angular: from_vector(body.angvel()),
        })
    }

    pub fn set_linear_velocity(&mut self, body: SolverBodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(rapier_body(body)) {
            body.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn run_pipeline(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &self.event_collector,
        );
    }

    #[cfg(feature = "parallel")]
    fn run_step(&mut self) {
        match self.pool.clone() {
            Some(pool) => pool.install(|| self.run_pipeline()),
            None => self.run_pipeline(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_step(&mut self) {
        self.run_pipeline();
    }
}

impl PhysicsBackend for RapierBackend {
    fn name(&self) -> &str {
        "rapier"
    }

    fn create_body(&mut self, desc: &SolverBodyDesc) -> SolverBodyHandle {
        let builder = match desc.status {
            BodyStatus::Dynamic => RigidBodyBuilder::dynamic(),
            BodyStatus::KinematicPositionBased => RigidBodyBuilder::kinematic_position_based(),
            BodyStatus::Fixed => RigidBodyBuilder::fixed(),
        };
        let body = builder
            .pose(to_isometry(&desc.transform))
            .ccd_enabled(desc.ccd_enabled)
            .can_sleep(desc.can_sleep)
            .linear_damping(DEFAULT_LINEAR_DAMPING)
            .angular_damping(DEFAULT_ANGULAR_DAMPING)
            .build();
        solver_body(self.bodies.insert(body))
    }

    fn remove_body(&mut self, body: SolverBodyHandle) {
        self.bodies.remove(
            rapier_body(body),
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn create_collider(
        &mut self,
        desc: &SolverColliderDesc,
        parent: SolverBodyHandle,
    ) -> Result<SolverColliderHandle> {
        let parent_handle = rapier_body(parent);
        if !self.bodies.contains(parent_handle) {
            return Err(PhysicsError::BackendRejected(format!(
                "collider parent {parent} does not exist"
            )));
        }

        let Material {
            density,
            restitution,
            friction,
            mixing,
        } = desc.material;
        let collider = shape_builder(&desc.shape)?
            .sensor(desc.sensor)
            .collision_groups(interaction_groups(&desc.filter))
            .density(density)
            .friction(friction)
            .restitution(restitution)
            .friction_combine_rule(combine_rule(mixing))
            .restitution_combine_rule(combine_rule(mixing))
            .translation(to_vector(desc.offset.position))
            .rotation(to_vector(desc.offset.rotation.to_scaled_axis()))
            .active_collision_types(
                ActiveCollisionTypes::all().difference(ActiveCollisionTypes::FIXED_FIXED),
            )
            .active_events(ActiveEvents::empty())
            .build();

        let handle = self
            .colliders
            .insert_with_parent(collider, parent_handle, &mut self.bodies);
        Ok(solver_collider(handle))
    }

    fn remove_collider(&mut self, collider: SolverColliderHandle) {
        self.colliders.remove(
            rapier_collider(collider),
            &mut self.islands,
            &mut self.bodies,
            true,
        );
    }

    fn set_body_transform(&mut self, body: SolverBodyHandle, transform: &Transform) {
        let Some(body) = self.bodies.get_mut(rapier_body(body)) else {
            return;
        };
        let pose = to_isometry(transform);
        if body.is_kinematic() {
            body.set_next_kinematic_position(pose);
        } else {
            body.set_position(pose, true);
        }
    }

    fn body_transform(&self, body: SolverBodyHandle) -> Option<Transform> {
        self.bodies
            .get(rapier_body(body))
            .map(|body| from_isometry(body.position()))
    }

    fn set_locked_axes(&mut self, body: SolverBodyHandle, locked: LockedAxes) {
        if let Some(body) = self.bodies.get_mut(rapier_body(body)) {
            body.set_locked_axes(axis_locks(locked), true);
        }
    }

    fn set_active_events(&mut self, collider: SolverColliderHandle, enabled: bool) {
        if let Some(collider) = self.colliders.get_mut(rapier_collider(collider)) {
            collider.set_active_events(if enabled {
                ActiveEvents::COLLISION_EVENTS
            } else {
                ActiveEvents::empty()
            });
        }
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;
        self.run_step();
    }

    fn drain_collision_events(&mut self, sink: &mut dyn FnMut(RawCollisionEvent)) {
        while let Ok(event) = self.collision_events.try_recv() {
            // Pairs ended by removal are settled by the caller that removed them.
            if event.removed() {
                continue;
            }
            sink(RawCollisionEvent {
                collider_a: solver_collider(event.collider1()),
                collider_b: solver_collider(event.collider2()),
                started: event.started(),
            });
        }
    }

    fn contact_pair(
        &self,
        a: SolverColliderHandle,
        b: SolverColliderHandle,
        visit: &mut dyn FnMut(&ContactManifold, bool),
    ) {
        let (handle_a, handle_b) = (rapier_collider(a), rapier_collider(b));
        let Some(pair) = self.narrow_phase.contact_pair(handle_a, handle_b) else {
            return;
        };
        let flipped = pair.collider1 != handle_a;
        for manifold in &pair.manifolds {
            if manifold.data.solver_contacts.is_empty() {
                continue;
            }
            let converted = ContactManifold {
                normal: from_vector(&manifold.data.normal),
                points: manifold
                    .data
                    .solver_contacts
                    .iter()
                    .map(|contact| ManifoldPoint {
                        point: from_point(&contact.point),
                        depth: -contact.dist,
                    })
                    .collect(),
            };
            visit(&converted, flipped);
        }
    }

    fn intersection_pair(&self, a: SolverColliderHandle, b: SolverColliderHandle) -> bool {
        self.narrow_phase
            .intersection_pair(rapier_collider(a), rapier_collider(b))
            == Some(true)
    }

    fn cast_ray(
        &self,
        ray: &Ray,
        max_distance: f32,
        solid: bool,
        filter: &dyn Fn(SolverColliderHandle) -> bool,
    ) -> Option<SolverRayHit> {
        let direction = ray.direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }

        let accepts =
            |handle: ColliderHandle, _: &RapierCollider| -> bool { filter(solver_collider(handle)) };
        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::default().predicate(&accepts),
        );
        let rapier_ray = RapierRay::new(to_point(ray.origin), to_vector(direction));
        let (handle, hit) = query.cast_ray_and_get_normal(&rapier_ray, max_distance, solid)?;

        Some(SolverRayHit {
            collider: solver_collider(handle),
            distance: hit.time_of_impact,
            point: ray.origin + direction * hit.time_of_impact,
            normal: from_vector(&hit.normal),
        })
    }

    fn is_sensor(&self, collider: SolverColliderHandle) -> bool {
        self.colliders
            .get(rapier_collider(collider))
            .is_some_and(|collider| collider.is_sensor())
    }

    fn reset(&mut self) {
        self.islands = IslandManager::new();
        self.broad_phase = BroadPhaseBvh::new();
        self.narrow_phase = NarrowPhase::new();
        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.ccd_solver = CCDSolver::new();
        while self.collision_events.try_recv().is_ok() {}
    }
}
