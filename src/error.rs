//! Error types for the physics layer.
//!
//! All fallible operations return [`PhysicsError`] through the crate-wide [`Result`] alias.

use std::error::Error;
use std::fmt;

use crate::config::ConfigError;
use crate::core::types::ComponentId;
use crate::utils::allocator::{BodyId, ColliderId};

/// Main error type of the physics layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// Contact points were read from a manifold event produced on an earlier tick.
    StaleContact { event_frame: u64, current_frame: u64 },
    /// A body descriptor named a kind that does not exist.
    UnknownBodyKind(String),
    /// A collider descriptor carried unusable dimensions or buffers.
    InvalidShape(String),
    /// The world configuration failed validation.
    InvalidConfig(ConfigError),
    /// No live body has this id.
    UnknownBody(BodyId),
    /// No live collider has this id.
    UnknownCollider(ColliderId),
    /// The scene has no transform for this component.
    UnknownComponent(ComponentId),
    /// The backend refused to create a body.
    BackendRejected(String),
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::StaleContact {
                event_frame,
                current_frame,
            } => write!(
                f,
                "contact points of frame {event_frame} read at frame {current_frame}"
            ),
            Self::UnknownBodyKind(kind) => write!(f, "unknown rigid body kind: {kind}"),
            Self::InvalidShape(msg) => write!(f, "invalid collider shape: {msg}"),
            Self::InvalidConfig(err) => write!(f, "invalid world config: {err}"),
            Self::UnknownBody(id) => write!(f, "unknown body {id}"),
            Self::UnknownCollider(id) => write!(f, "unknown collider {id}"),
            Self::UnknownComponent(id) => write!(f, "component {id} has no world transform"),
            Self::BackendRejected(msg) => write!(f, "backend rejected request: {msg}"),
        }
    }
}

impl Error for PhysicsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for PhysicsError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err)
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, PhysicsError>;
