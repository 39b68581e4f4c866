//! Space Physics – fixed-timestep physics driver and collision eventing.
//!
//! A [`PhysicsWorld`] owns a solver behind the [`PhysicsBackend`] trait, steps it at a
//! fixed rate regardless of frame rate, keeps scene transforms and solver poses in
//! sync, and turns the solver's raw start/stop notifications into per-pair
//! Enter/Stay/Exit callbacks on colliders.

pub mod backend;
pub mod collision;
pub mod config;
pub mod core;
pub mod error;
pub mod scene;
pub mod utils;
pub mod world;

pub use glam::{Quat, Vec3};

pub use backend::{LockedAxes, PhysicsBackend, RapierBackend};
pub use collision::{
    contact::{ContactPoint, ContactQuery},
    event::{CharacterHit, CollisionEvent, Payload},
    fsm::CollisionState,
    listeners::{Commands, EventKind, ListenerContext, ListenerId, ListenerResult},
    queries::{RaycastHit, RaycastQuery},
};
pub use config::{ConfigError, WorldConfig};
pub use core::{
    collider::{Collider, ColliderDesc, ColliderShape, CollisionFilter},
    rigidbody::{RigidBody, RigidBodyDesc, RigidBodyKind},
    types::{ComponentId, Material, MixingMode, Transform, Velocity},
};
pub use error::{PhysicsError, Result};
pub use scene::{SceneGraph, TransformStore};
pub use utils::allocator::{BodyId, ColliderId};
pub use world::{PhysicsWorld, StepReport};
