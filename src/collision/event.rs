//! Collision event payloads handed to listeners.
//!
//! Every event carries the receiving collider (`me`), the collider it touched
//! (`other`) and the frame it was produced on. The payload decides how contact
//! geometry is obtained:
//!
//! - [`Payload::Intersection`]: sensor overlap, no geometry.
//! - [`Payload::Manifold`]: rigid contact, points pulled from the solver on first
//!   access and cached; only valid during the frame that produced the event.
//! - [`Payload::Character`]: a character-controller hit with its contact already
//!   resolved.
//! - [`Payload::Separation`]: the bare pair carried by exit callbacks.

use std::cell::OnceCell;

use glam::Vec3;

use crate::{
    collision::contact::{ContactPoint, ContactQuery},
    core::types::ComponentId,
    error::{PhysicsError, Result},
    utils::allocator::{ColliderId, SolverColliderHandle},
};

/// The two colliders (and their components) an event is about, from `me`'s point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPair {
    pub me: ColliderId,
    pub other: ColliderId,
    pub me_component: ComponentId,
    pub other_component: ComponentId,
    /// Either collider is a sensor.
    pub sensor: bool,
}

impl EventPair {
    pub fn swapped(&self) -> Self {
        Self {
            me: self.other,
            other: self.me,
            me_component: self.other_component,
            other_component: self.me_component,
            sensor: self.sensor,
        }
    }
}

/// Single collision result reported by an external character controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterHit {
    /// Collider the character ran into.
    pub other: ColliderId,
    /// World-space witness point on the character.
    pub witness: Vec3,
    /// Unit normal pointing from the character towards `other`.
    pub normal: Vec3,
    pub penetration_depth: f32,
}

impl CharacterHit {
    pub(crate) fn contact(&self) -> ContactPoint {
        ContactPoint {
            point: self.witness,
            normal: self.normal,
            depth: self.penetration_depth,
        }
    }
}

/// Contact geometry of a rigid pair, resolved against the solver on demand.
#[derive(Debug, Clone)]
pub struct LazyManifold {
    me_handle: SolverColliderHandle,
    other_handle: SolverColliderHandle,
    points: OnceCell<Vec<ContactPoint>>,
}

impl LazyManifold {
    pub(crate) fn new(me_handle: SolverColliderHandle, other_handle: SolverColliderHandle) -> Self {
        Self {
            me_handle,
            other_handle,
            points: OnceCell::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.points.get().is_some()
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    Intersection,
    Manifold(LazyManifold),
    Character(ContactPoint),
    Separation,
}

#[derive(Debug, Clone)]
pub struct CollisionEvent {
    pair: EventPair,
    frame: u64,
    payload: Payload,
}

impl CollisionEvent {
    pub(crate) fn intersection(pair: EventPair, frame: u64) -> Self {
        Self {
            pair,
            frame,
            payload: Payload::Intersection,
        }
    }

    pub(crate) fn manifold(
        pair: EventPair,
        frame: u64,
        me_handle: SolverColliderHandle,
        other_handle: SolverColliderHandle,
    ) -> Self {
        Self {
            pair,
            frame,
            payload: Payload::Manifold(LazyManifold::new(me_handle, other_handle)),
        }
    }

    pub(crate) fn character(pair: EventPair, frame: u64, contact: ContactPoint) -> Self {
        Self {
            pair,
            frame,
            payload: Payload::Character(contact),
        }
    }

    pub(crate) fn separation(pair: EventPair, frame: u64) -> Self {
        Self {
            pair,
            frame,
            payload: Payload::Separation,
        }
    }

    pub fn me(&self) -> ColliderId {
        self.pair.me
    }

    pub fn other(&self) -> ColliderId {
        self.pair.other
    }

    pub fn me_component(&self) -> ComponentId {
        self.pair.me_component
    }

    pub fn other_component(&self) -> ComponentId {
        self.pair.other_component
    }

    pub fn pair(&self) -> &EventPair {
        &self.pair
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// True for payloads that are consumed after every tick instead of persisting
    /// until the solver reports a stop.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self.payload, Payload::Character(_))
    }

    /// Restamps the event for `frame`, dropping geometry cached for an earlier frame.
    pub(crate) fn refresh(&mut self, frame: u64) {
        if self.frame == frame {
            return;
        }
        self.frame = frame;
        if let Payload::Manifold(manifold) = &mut self.payload {
            manifold.points = OnceCell::new();
        }
    }

    /// Contact points from `me`'s point of view.
    ///
    /// Manifold events resolve their points through `query` on first access. Reading them
    /// with a query for a later frame fails with [`PhysicsError::StaleContact`].
    pub fn contact_points(&self, query: &ContactQuery<'_>) -> Result<&[ContactPoint]> {
        match &self.payload {
            Payload::Manifold(manifold) => {
                if query.frame() != self.frame {
                    return Err(PhysicsError::StaleContact {
                        event_frame: self.frame,
                        current_frame: query.frame(),
                    });
                }
                Ok(manifold
                    .points
                    .get_or_init(|| query.contact_points(manifold.me_handle, manifold.other_handle)))
            }
            Payload::Character(contact) => Ok(std::slice::from_ref(contact)),
            Payload::Intersection | Payload::Separation => Ok(&[]),
        }
    }
}
