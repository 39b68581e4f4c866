//! Collision eventing: per-pair state machines, event payloads, listeners, contacts, queries.

pub mod contact;
pub mod event;
pub mod fsm;
pub mod listeners;
pub mod queries;

pub use contact::{ContactManifold, ContactPoint, ContactQuery, ManifoldPoint};
pub use event::{CharacterHit, CollisionEvent, EventPair, LazyManifold, Payload};
pub use fsm::{CollisionFsm, CollisionState};
pub use listeners::{
    CollisionCallback, Command, Commands, EventKind, ListenerContext, ListenerId, ListenerResult,
    ListenerSet,
};
pub use queries::{RaycastHit, RaycastQuery};
