//! Core types describing bodies, colliders, and their authored descriptors.

pub mod collider;
pub mod rigidbody;
pub mod types;

pub use collider::{Collider, ColliderBuilder, ColliderDesc, ColliderShape, CollisionFilter};
pub use rigidbody::{BodyProfile, RigidBody, RigidBodyDesc, RigidBodyKind};
pub use types::{ComponentId, Material, MixingMode, Transform, Velocity};
