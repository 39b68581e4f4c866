#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use space_physics::{
    backend::{
        BodyStatus, LockedAxes, PhysicsBackend, RawCollisionEvent, Ray, SolverBodyDesc,
        SolverColliderDesc, SolverRayHit,
    },
    collision::contact::{ContactManifold, ManifoldPoint},
    utils::allocator::{Arena, SolverBodyHandle, SolverColliderHandle},
    *,
};

#[derive(Debug, Clone)]
pub struct ScriptedBody {
    pub desc: SolverBodyDesc,
    pub transform: Transform,
    pub velocity: Vec3,
    pub locked: LockedAxes,
}

#[derive(Debug, Clone)]
pub struct ScriptedCollider {
    pub parent: SolverBodyHandle,
    pub desc: SolverColliderDesc,
    pub active_events: bool,
}

/// Backend that replays queued notifications instead of simulating contacts.
///
/// Dynamic bodies drift by their velocity each step so transform sync can be observed.
#[derive(Default)]
pub struct ScriptedBackend {
    pub bodies: Arena<ScriptedBody, SolverBodyHandle>,
    pub colliders: Arena<ScriptedCollider, SolverColliderHandle>,
    pub steps: Vec<f32>,
    script: VecDeque<Vec<RawCollisionEvent>>,
    pending: Vec<RawCollisionEvent>,
    intersecting: HashSet<(SolverColliderHandle, SolverColliderHandle)>,
    manifolds: HashMap<(SolverColliderHandle, SolverColliderHandle), ContactManifold>,
    pub reset_calls: usize,
}

impl ScriptedBackend {
    /// Queues the notifications the next unscripted step will emit.
    pub fn script_step(&mut self, events: Vec<RawCollisionEvent>) {
        self.script.push_back(events);
    }

    /// Queues a step that emits nothing.
    pub fn script_quiet(&mut self) {
        self.script.push_back(Vec::new());
    }

    pub fn set_intersecting(&mut self, a: SolverColliderHandle, b: SolverColliderHandle, on: bool) {
        if on {
            self.intersecting.insert((a, b));
            self.intersecting.insert((b, a));
        } else {
            self.intersecting.remove(&(a, b));
            self.intersecting.remove(&(b, a));
        }
    }

    /// Stores a manifold expressed with `a` as its first collider.
    pub fn set_manifold(&mut self, a: SolverColliderHandle, b: SolverColliderHandle, normal: Vec3) {
        self.manifolds.insert(
            (a, b),
            ContactManifold {
                normal,
                points: vec![ManifoldPoint {
                    point: Vec3::ZERO,
                    depth: 0.01,
                }],
            },
        );
    }

    pub fn active_events(&self, collider: SolverColliderHandle) -> bool {
        self.colliders
            .get(collider)
            .is_some_and(|collider| collider.active_events)
    }

    pub fn set_velocity(&mut self, body: SolverBodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.velocity = velocity;
        }
    }
}

pub fn started(a: SolverColliderHandle, b: SolverColliderHandle) -> RawCollisionEvent {
    RawCollisionEvent {
        collider_a: a,
        collider_b: b,
        started: true,
    }
}

pub fn stopped(a: SolverColliderHandle, b: SolverColliderHandle) -> RawCollisionEvent {
    RawCollisionEvent {
        collider_a: a,
        collider_b: b,
        started: false,
    }
}

impl PhysicsBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn create_body(&mut self, desc: &SolverBodyDesc) -> SolverBodyHandle {
        self.bodies.insert(ScriptedBody {
            desc: *desc,
            transform: desc.transform,
            velocity: Vec3::ZERO,
            locked: LockedAxes::default(),
        })
    }

    fn remove_body(&mut self, body: SolverBodyHandle) {
        self.bodies.remove(body);
        let orphans: Vec<_> = self
            .colliders
            .iter()
            .filter(|(_, collider)| collider.parent == body)
            .map(|(handle, _)| handle)
            .collect();
        for handle in orphans {
            self.colliders.remove(handle);
        }
    }

    fn create_collider(
        &mut self,
        desc: &SolverColliderDesc,
        parent: SolverBodyHandle,
    ) -> Result<SolverColliderHandle> {
        if !self.bodies.contains(parent) {
            return Err(PhysicsError::BackendRejected("no parent".into()));
        }
        Ok(self.colliders.insert(ScriptedCollider {
            parent,
            desc: desc.clone(),
            active_events: false,
        }))
    }

    fn remove_collider(&mut self, collider: SolverColliderHandle) {
        self.colliders.remove(collider);
    }

    fn set_body_transform(&mut self, body: SolverBodyHandle, transform: &Transform) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.transform = *transform;
        }
    }

    fn body_transform(&self, body: SolverBodyHandle) -> Option<Transform> {
        self.bodies.get(body).map(|body| body.transform)
    }

    fn set_locked_axes(&mut self, body: SolverBodyHandle, locked: LockedAxes) {
        if let Some(body) = self.bodies.get_mut(body) {
            body.locked = locked;
        }
    }

    fn set_active_events(&mut self, collider: SolverColliderHandle, enabled: bool) {
        if let Some(collider) = self.colliders.get_mut(collider) {
            collider.active_events = enabled;
        }
    }

    fn step(&mut self, dt: f32) {
        self.steps.push(dt);
        for body in self.bodies.values_mut() {
            if body.desc.status == BodyStatus::Dynamic {
                body.transform.position += body.velocity * dt;
            }
        }
        if let Some(events) = self.script.pop_front() {
            self.pending.extend(events);
        }
    }

    fn drain_collision_events(&mut self, sink: &mut dyn FnMut(RawCollisionEvent)) {
        for event in self.pending.drain(..) {
            sink(event);
        }
    }

    fn contact_pair(
        &self,
        a: SolverColliderHandle,
        b: SolverColliderHandle,
        visit: &mut dyn FnMut(&ContactManifold, bool),
    ) {
        if let Some(manifold) = self.manifolds.get(&(a, b)) {
            visit(manifold, false);
        } else if let Some(manifold) = self.manifolds.get(&(b, a)) {
            visit(manifold, true);
        }
    }

    fn intersection_pair(&self, a: SolverColliderHandle, b: SolverColliderHandle) -> bool {
        self.intersecting.contains(&(a, b))
    }

    fn cast_ray(
        &self,
        _ray: &Ray,
        _max_distance: f32,
        _solid: bool,
        _filter: &dyn Fn(SolverColliderHandle) -> bool,
    ) -> Option<SolverRayHit> {
        None
    }

    fn is_sensor(&self, collider: SolverColliderHandle) -> bool {
        self.colliders
            .get(collider)
            .is_some_and(|collider| collider.desc.sensor)
    }

    fn reset(&mut self) {
        self.reset_calls += 1;
        self.bodies.clear();
        self.colliders.clear();
        self.pending.clear();
        self.script.clear();
    }
}

pub const STEP: f64 = 0.1;

pub fn scripted_world() -> PhysicsWorld<ScriptedBackend> {
    let config = WorldConfig::default()
        .with_fixed_step(STEP)
        .with_max_frame_delta(0.25);
    PhysicsWorld::new(ScriptedBackend::default(), config).expect("valid config")
}

/// Creates a body with one collider at `position`; returns body, collider, and solver handle.
pub fn spawn(
    world: &mut PhysicsWorld<ScriptedBackend>,
    scene: &mut TransformStore,
    component: u64,
    kind: RigidBodyKind,
    collider: ColliderDesc,
    position: Vec3,
) -> (BodyId, ColliderId, SolverColliderHandle) {
    let component = ComponentId(component);
    scene.insert(component, Transform::from_position(position));
    let body = world
        .create_rigid_body(
            &RigidBodyDesc::new(kind).with_collider(collider),
            component,
            &*scene,
        )
        .expect("body created");
    let collider = world.body(body).expect("body exists").colliders()[0];
    let handle = world.collider(collider).expect("collider exists").handle();
    (body, collider, handle)
}

pub fn solid() -> ColliderDesc {
    ColliderDesc::builder().sphere(0.5).build()
}

pub fn sensor() -> ColliderDesc {
    ColliderDesc::builder().sphere(0.5).sensor(true).build()
}

pub type EventLog = Rc<RefCell<Vec<(EventKind, u64)>>>;

/// Registers a recorder for every event kind on `collider`.
pub fn record_all<B: PhysicsBackend>(world: &mut PhysicsWorld<B>, collider: ColliderId) -> EventLog {
    let log: EventLog = Rc::default();
    for kind in [
        EventKind::SensorEnter,
        EventKind::SensorStay,
        EventKind::SensorExit,
        EventKind::CollisionEnter,
        EventKind::CollisionStay,
        EventKind::CollisionExit,
    ] {
        let log = Rc::clone(&log);
        world
            .add_listener(collider, kind, move |event, _ctx| {
                log.borrow_mut().push((kind, event.frame()));
                Ok(())
            })
            .expect("collider exists");
    }
    log
}

pub fn kinds(log: &EventLog) -> Vec<EventKind> {
    log.borrow().iter().map(|(kind, _)| *kind).collect()
}

/// Runs exactly one fixed tick.
pub fn tick<B: PhysicsBackend>(world: &mut PhysicsWorld<B>, scene: &mut TransformStore) {
    let report = world.advance(STEP, scene);
    assert_eq!(report.ticks, 1);
}
