//! Fixed-timestep world driver.
//!
//! [`PhysicsWorld::advance`] is called once per rendered frame with the wall-clock
//! delta. The delta is clamped, accumulated, and consumed in fixed ticks. Each tick:
//!
//! 1. copies scene transforms of auto-synced bodies into the solver,
//! 2. steps the solver once,
//! 3. copies solver transforms of dynamic bodies back into the scene,
//! 4. drains the solver's collision notifications and routes them to collider pairs,
//! 5. advances every tracked pair's state machine and dispatches listeners.
//!
//! Whatever listeners asked for through [`Commands`] is applied after step 5, so it
//! becomes visible from the next tick on.

mod emission;
mod routing;
mod sync;

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::{
    backend::{LockedAxes, PhysicsBackend, RapierBackend, Ray, SolverColliderDesc},
    collision::{
        contact::ContactQuery,
        event::{CharacterHit, CollisionEvent},
        listeners::{Command, Commands, EventKind, ListenerContext, ListenerId, ListenerResult},
        queries::{RaycastHit, RaycastQuery},
    },
    config::WorldConfig,
    core::{
        collider::{Collider, ColliderDesc},
        rigidbody::{RigidBody, RigidBodyDesc},
        types::{ComponentId, Transform},
    },
    error::{PhysicsError, Result},
    scene::SceneGraph,
    utils::{
        allocator::{Arena, BodyId, ColliderId, SolverColliderHandle},
        logging::{warn_if_delta_clamped, ScopedTimer},
        profiling::{PhaseTimer, TickProfiler},
    },
};

/// Outcome of one [`PhysicsWorld::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Fixed ticks executed by the call.
    pub ticks: u32,
    /// Leftover fraction of a fixed step, in `[0, 1)`.
    pub alpha: f64,
    /// Frame counter after the call.
    pub frame: u64,
}

/// Owner of the solver and every body, collider, and pair tracker of one space.
pub struct PhysicsWorld<B: PhysicsBackend = RapierBackend> {
    backend: B,
    config: WorldConfig,
    bodies: Arena<RigidBody, BodyId>,
    colliders: Arena<Collider, ColliderId>,
    handle_lookup: HashMap<SolverColliderHandle, ColliderId>,
    frame: u64,
    accumulator: f64,
    elapsed: f64,
    alpha: f64,
    /// Hits reported since the last `advance` that ran a tick, keyed by `(controller, other)`.
    character_hits: BTreeMap<(ColliderId, ColliderId), CharacterHit>,
    /// Hits routed on every tick of the current `advance`.
    held_hits: Vec<(ColliderId, CharacterHit)>,
    commands: Commands,
    profiler: TickProfiler,
}

impl PhysicsWorld<RapierBackend> {
    /// World driven by a [`RapierBackend`] using the configured gravity.
    pub fn rapier(config: WorldConfig) -> Result<Self> {
        Self::new(RapierBackend::new(config.gravity), config)
    }
}

impl<B: PhysicsBackend> PhysicsWorld<B> {
    pub fn new(backend: B, config: WorldConfig) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "physics world on {} backend, fixed step {:.4}s, clamp {:.3}s",
            backend.name(),
            config.fixed_step,
            config.max_frame_delta
        );

        Ok(Self {
            backend,
            config,
            bodies: Arena::new(),
            colliders: Arena::new(),
            handle_lookup: HashMap::new(),
            frame: 0,
            accumulator: 0.0,
            elapsed: 0.0,
            alpha: 0.0,
            character_hits: BTreeMap::new(),
            held_hits: Vec::new(),
            commands: Commands::default(),
            profiler: TickProfiler::default(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Number of fixed ticks executed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Interpolation fraction left by the last `advance` call.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Simulated time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn profiler(&self) -> &TickProfiler {
        &self.profiler
    }

    /// Read access to contact geometry for the current frame.
    pub fn contact_query(&self) -> ContactQuery<'_> {
        ContactQuery::new(&self.backend, self.frame)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> + '_ {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id)
    }

    pub fn colliders(&self) -> impl Iterator<Item = (ColliderId, &Collider)> + '_ {
        self.colliders.iter()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Total number of pair state machines alive across all colliders.
    pub fn tracked_pair_count(&self) -> usize {
        self.colliders
            .iter()
            .map(|(_, collider)| collider.tracked_pairs())
            .sum()
    }

    /// Creates a body for `component` from its descriptor, along with all its colliders.
    ///
    /// Every collider descriptor is validated before anything reaches the solver, so a
    /// failure never leaves a partially built body behind.
    pub fn create_rigid_body(
        &mut self,
        desc: &RigidBodyDesc,
        component: ComponentId,
        scene: &dyn SceneGraph,
    ) -> Result<BodyId> {
        let transform = scene
            .world_transform(component)
            .ok_or(PhysicsError::UnknownComponent(component))?;

        let solver_colliders = desc
            .colliders
            .iter()
            .map(|collider| collider.to_solver_desc(transform.scale))
            .collect::<Result<Vec<_>>>()?;

        let profile = desc.kind.profile();
        let handle = self.backend.create_body(&profile.solver_desc(transform));
        let id = self
            .bodies
            .insert_with(|id| RigidBody::new(id, handle, component, desc, transform));

        if !desc.locked_axes.is_empty() {
            self.set_locked_axes(id, desc.locked_axes)?;
        }

        for (collider, solver_desc) in desc.colliders.iter().zip(&solver_colliders) {
            if let Err(err) = self.attach_collider(id, collider, solver_desc) {
                self.remove_rigid_body(id)?;
                return Err(err);
            }
        }

        log::debug!(
            "created {} body {id} for {component} with {} colliders",
            desc.kind,
            desc.colliders.len()
        );
        Ok(id)
    }

    /// Removes a body and cascades removal of its colliders.
    pub fn remove_rigid_body(&mut self, id: BodyId) -> Result<()> {
        let body = self.bodies.remove(id).ok_or(PhysicsError::UnknownBody(id))?;
        for collider in &body.colliders {
            self.forget_collider(*collider);
        }
        self.backend.remove_body(body.handle());
        log::debug!("removed body {id}");
        Ok(())
    }

    /// Attaches another collider to an existing body.
    pub fn add_collider(&mut self, body: BodyId, desc: &ColliderDesc) -> Result<ColliderId> {
        let scale = self
            .bodies
            .get(body)
            .ok_or(PhysicsError::UnknownBody(body))?
            .current_transform()
            .scale;
        let solver_desc = desc.to_solver_desc(scale)?;
        self.attach_collider(body, desc, &solver_desc)
    }

    pub fn remove_collider(&mut self, id: ColliderId) -> Result<()> {
        let body = self
            .colliders
            .get(id)
            .ok_or(PhysicsError::UnknownCollider(id))?
            .body();
        if let Some(body) = self.bodies.get_mut(body) {
            body.colliders.retain(|collider| *collider != id);
        }
        if let Some(handle) = self.forget_collider(id) {
            self.backend.remove_collider(handle);
        }
        Ok(())
    }

    pub fn set_locked_axes(&mut self, id: BodyId, locked: LockedAxes) -> Result<()> {
        let body = self.bodies.get_mut(id).ok_or(PhysicsError::UnknownBody(id))?;
        self.backend.set_locked_axes(body.handle(), locked);
        body.set_locked_axes(locked);
        Ok(())
    }

    /// Teleports a body in the solver and resets its interpolation snapshots.
    pub fn set_body_transform(&mut self, id: BodyId, transform: Transform) -> Result<()> {
        let body = self.bodies.get_mut(id).ok_or(PhysicsError::UnknownBody(id))?;
        self.backend.set_body_transform(body.handle(), &transform);
        body.reset_transform(transform.with_scale_of(&body.current_transform()));
        Ok(())
    }

    /// Registers a callback; the collider's active-event flag follows on the next tick.
    pub fn add_listener<F>(
        &mut self,
        collider: ColliderId,
        kind: EventKind,
        callback: F,
    ) -> Result<ListenerId>
    where
        F: FnMut(&CollisionEvent, &mut ListenerContext<'_>) -> ListenerResult + 'static,
    {
        let collider_ref = self
            .colliders
            .get_mut(collider)
            .ok_or(PhysicsError::UnknownCollider(collider))?;
        let id = collider_ref.listeners.add(kind, Box::new(callback));
        collider_ref.mark_events_dirty();
        Ok(id)
    }

    /// Unregisters a callback; returns whether it was registered.
    pub fn remove_listener(&mut self, collider: ColliderId, listener: ListenerId) -> Result<bool> {
        let collider_ref = self
            .colliders
            .get_mut(collider)
            .ok_or(PhysicsError::UnknownCollider(collider))?;
        let removed = collider_ref.listeners.remove(listener);
        if removed {
            collider_ref.mark_events_dirty();
        }
        Ok(removed)
    }

    /// Reports a character-controller hit.
    ///
    /// The hit is routed on every tick of the next `advance` call that runs at least one
    /// tick; reporting the same pair again before then replaces it.
    pub fn report_character_collision(
        &mut self,
        controller: ColliderId,
        hit: CharacterHit,
    ) -> Result<()> {
        if !self.colliders.contains(controller) {
            return Err(PhysicsError::UnknownCollider(controller));
        }
        if !self.colliders.contains(hit.other) {
            return Err(PhysicsError::UnknownCollider(hit.other));
        }
        self.character_hits.insert((controller, hit.other), hit);
        Ok(())
    }

    /// Nearest hit along the ray, or `None`.
    pub fn raycast(&self, query: &RaycastQuery) -> Option<RaycastHit> {
        self.raycast_with_filter(query, |_, _| true)
    }

    pub fn raycast_with_filter<F>(&self, query: &RaycastQuery, filter: F) -> Option<RaycastHit>
    where
        F: Fn(BodyId, ColliderId) -> bool,
    {
        let ray = Ray {
            origin: query.origin,
            direction: query.direction,
        };
        let accepts = |handle: SolverColliderHandle| {
            let Some(id) = self.handle_lookup.get(&handle) else {
                return false;
            };
            let Some(collider) = self.colliders.get(*id) else {
                return false;
            };
            (query.include_sensors || !collider.is_sensor())
                && (query.filter.mask & collider.filter().layer) != 0
                && filter(collider.body(), *id)
        };

        let hit = self
            .backend
            .cast_ray(&ray, query.max_distance, query.solid, &accepts)?;
        let collider_id = *self.handle_lookup.get(&hit.collider)?;
        let collider = self.colliders.get(collider_id)?;
        let body = self.bodies.get(collider.body())?;

        Some(RaycastHit {
            body: body.id(),
            collider: collider_id,
            component: body.component(),
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
        })
    }

    /// Consumes `dt` seconds of wall-clock time, running as many fixed ticks as fit.
    pub fn advance(&mut self, dt: f64, scene: &mut dyn SceneGraph) -> StepReport {
        let requested = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            log::warn!("ignoring invalid frame delta {dt}");
            0.0
        };
        warn_if_delta_clamped(requested, self.config.max_frame_delta);
        let dt = requested.min(self.config.max_frame_delta);

        self.profiler.reset();
        let start = Instant::now();

        self.accumulator += dt;
        if self.accumulator >= self.config.fixed_step {
            self.held_hits = std::mem::take(&mut self.character_hits)
                .into_iter()
                .map(|((controller, _), hit)| (controller, hit))
                .collect();
        }
        let mut ticks = 0;
        while self.accumulator >= self.config.fixed_step {
            self.fixed_tick(scene);
            self.accumulator -= self.config.fixed_step;
            self.elapsed += self.config.fixed_step;
            ticks += 1;
        }

        self.alpha = self.accumulator / self.config.fixed_step;
        self.apply_interpolation(scene);

        self.profiler.ticks = ticks;
        self.profiler.total_time = start.elapsed();
        self.profiler.report();

        StepReport {
            ticks,
            alpha: self.alpha,
            frame: self.frame,
        }
    }

    /// Releases the solver's contents and hands the backend back.
    pub fn dispose(mut self) -> B {
        log::debug!(
            "disposing physics world at frame {} ({} bodies, {} colliders)",
            self.frame,
            self.bodies.len(),
            self.colliders.len()
        );
        self.bodies.clear();
        self.colliders.clear();
        self.handle_lookup.clear();
        self.character_hits.clear();
        self.held_hits.clear();
        self.commands.take();
        self.backend.reset();
        self.backend
    }

    fn fixed_tick(&mut self, scene: &mut dyn SceneGraph) {
        let _timer = ScopedTimer::new("physics::tick");
        self.frame += 1;
        self.flush_active_events();

        let mut phase = Duration::ZERO;
        {
            let _t = PhaseTimer::new(&mut phase);
            self.sync_in(scene);
        }
        self.profiler.sync_in_time += std::mem::take(&mut phase);

        {
            let _t = PhaseTimer::new(&mut phase);
            self.backend.step(self.config.fixed_step as f32);
        }
        self.profiler.solver_time += std::mem::take(&mut phase);

        {
            let _t = PhaseTimer::new(&mut phase);
            self.sync_out(scene);
        }
        self.profiler.sync_out_time += std::mem::take(&mut phase);

        {
            let _t = PhaseTimer::new(&mut phase);
            self.drain_and_route();
        }
        self.profiler.routing_time += std::mem::take(&mut phase);

        {
            let _t = PhaseTimer::new(&mut phase);
            self.emit_collider_events();
        }
        self.profiler.emission_time += phase;

        self.apply_commands();
    }

    /// Pushes recomputed active-event flags of colliders whose listeners changed.
    fn flush_active_events(&mut self) {
        for collider in self.colliders.values_mut() {
            if let Some(active) = collider.refresh_active_events() {
                self.backend.set_active_events(collider.handle(), active);
            }
        }
    }

    fn apply_commands(&mut self) {
        for command in self.commands.take() {
            let outcome = match command {
                Command::RemoveBody(body) => self.remove_rigid_body(body),
                Command::RemoveCollider(collider) => self.remove_collider(collider),
                Command::SetBodyTransform(body, transform) => {
                    self.set_body_transform(body, transform)
                }
            };
            if let Err(err) = outcome {
                log::debug!("deferred command skipped: {err}");
            }
        }
    }

    fn attach_collider(
        &mut self,
        body_id: BodyId,
        desc: &ColliderDesc,
        solver_desc: &SolverColliderDesc,
    ) -> Result<ColliderId> {
        let body = self
            .bodies
            .get_mut(body_id)
            .ok_or(PhysicsError::UnknownBody(body_id))?;
        let handle = self.backend.create_collider(solver_desc, body.handle())?;
        self.backend.set_active_events(handle, false);

        let id = self
            .colliders
            .insert_with(|id| Collider::new(id, body_id, handle, desc));
        body.colliders.push(id);
        self.handle_lookup.insert(handle, id);
        Ok(id)
    }

    /// Drops a collider from the world's bookkeeping and ends every pair that involved it.
    fn forget_collider(&mut self, id: ColliderId) -> Option<SolverColliderHandle> {
        let collider = self.colliders.remove(id)?;
        self.handle_lookup.remove(&collider.handle());
        self.character_hits
            .retain(|(controller, other), _| *controller != id && *other != id);
        self.held_hits
            .retain(|(controller, hit)| *controller != id && hit.other != id);
        for other in self.colliders.values_mut() {
            other.clear_collision(id);
        }
        Some(collider.handle())
    }
}
