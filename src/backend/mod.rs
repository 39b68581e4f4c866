//! Contract between the world driver and the physics solver it steps.
//!
//! The world never looks inside the solver: it creates bodies and colliders from
//! descriptors, steps it once per fixed tick, drains its `(a, b, started)` event
//! stream, and asks it for manifolds, intersection tests, and ray casts on demand.

pub mod rapier;

pub use rapier::RapierBackend;

use glam::{BVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
    collision::contact::ContactManifold,
    core::{
        collider::CollisionFilter,
        types::{Material, Transform},
    },
    error::Result,
    utils::allocator::{SolverBodyHandle, SolverColliderHandle},
};

/// How the solver treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyStatus {
    /// Integrated by the solver.
    Dynamic,
    /// Moved only by `set_body_transform`; pushes dynamic bodies but is never pushed.
    KinematicPositionBased,
    /// Never moves.
    Fixed,
}

/// Body description handed to [`PhysicsBackend::create_body`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverBodyDesc {
    pub status: BodyStatus,
    pub ccd_enabled: bool,
    pub can_sleep: bool,
    pub transform: Transform,
}

/// Shape description in solver terms, already scaled and validated.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverShape {
    Cuboid { half_extents: Vec3 },
    Ball { radius: f32 },
    /// Y-aligned capsule; `half_height` is half the length of the inner segment.
    Capsule { half_height: f32, radius: f32 },
    /// Y-aligned cylinder.
    Cylinder { half_height: f32, radius: f32 },
    TriMesh { vertices: Vec<Vec3>, indices: Vec<[u32; 3]> },
    ConvexHull { points: Vec<Vec3> },
}

/// Collider description handed to [`PhysicsBackend::create_collider`].
#[derive(Debug, Clone, PartialEq)]
pub struct SolverColliderDesc {
    pub shape: SolverShape,
    pub sensor: bool,
    pub filter: CollisionFilter,
    pub material: Material,
    /// Pose relative to the parent body.
    pub offset: Transform,
}

/// One raw notification from the solver's event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCollisionEvent {
    pub collider_a: SolverColliderHandle,
    pub collider_b: SolverColliderHandle,
    pub started: bool,
}

/// Per-axis translation and rotation locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedAxes {
    pub translation: BVec3,
    pub rotation: BVec3,
}

impl Default for LockedAxes {
    fn default() -> Self {
        Self {
            translation: BVec3::FALSE,
            rotation: BVec3::FALSE,
        }
    }
}

impl LockedAxes {
    pub fn is_empty(&self) -> bool {
        !self.translation.any() && !self.rotation.any()
    }

    pub fn lock_rotations() -> Self {
        Self {
            translation: BVec3::FALSE,
            rotation: BVec3::TRUE,
        }
    }
}

/// Ray in world space; `direction` need not be normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Nearest hit reported by [`PhysicsBackend::cast_ray`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverRayHit {
    pub collider: SolverColliderHandle,
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Physics solver consumed by [`PhysicsWorld`](crate::world::PhysicsWorld).
pub trait PhysicsBackend {
    fn name(&self) -> &str;

    fn create_body(&mut self, desc: &SolverBodyDesc) -> SolverBodyHandle;

    /// Removes the body and every collider attached to it.
    fn remove_body(&mut self, body: SolverBodyHandle);

    fn create_collider(
        &mut self,
        desc: &SolverColliderDesc,
        parent: SolverBodyHandle,
    ) -> Result<SolverColliderHandle>;

    fn remove_collider(&mut self, collider: SolverColliderHandle);

    /// Teleports fixed and dynamic bodies; sets the next pose of kinematic ones.
    fn set_body_transform(&mut self, body: SolverBodyHandle, transform: &Transform);

    fn body_transform(&self, body: SolverBodyHandle) -> Option<Transform>;

    fn set_locked_axes(&mut self, body: SolverBodyHandle, locked: LockedAxes);

    /// Enables or disables collision notifications involving this collider.
    fn set_active_events(&mut self, collider: SolverColliderHandle, enabled: bool);

    /// Advances the simulation by exactly `dt` seconds, queueing collision notifications.
    fn step(&mut self, dt: f32);

    /// Hands every queued notification to `sink`, emptying the queue.
    fn drain_collision_events(&mut self, sink: &mut dyn FnMut(RawCollisionEvent));

    /// Visits the contact manifolds between two colliders.
    ///
    /// `flipped` is true when the manifold is expressed with `b` as its first collider.
    fn contact_pair(
        &self,
        a: SolverColliderHandle,
        b: SolverColliderHandle,
        visit: &mut dyn FnMut(&ContactManifold, bool),
    );

    fn intersection_pair(&self, a: SolverColliderHandle, b: SolverColliderHandle) -> bool;

    fn cast_ray(
        &self,
        ray: &Ray,
        max_distance: f32,
        solid: bool,
        filter: &dyn Fn(SolverColliderHandle) -> bool,
    ) -> Option<SolverRayHit>;

    fn is_sensor(&self, collider: SolverColliderHandle) -> bool;

    /// Drops every body, collider, and queued event.
    fn reset(&mut self);
}
