use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::{
    collision::{
        contact::{ContactPoint, ContactQuery},
        event::CollisionEvent,
        fsm::CollisionState,
    },
    core::types::Transform,
    error::Result,
    utils::allocator::{BodyId, ColliderId},
};

/// Callback slot a listener is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    SensorEnter,
    SensorStay,
    SensorExit,
    CollisionEnter,
    CollisionStay,
    CollisionExit,
}

impl EventKind {
    /// Event fired when a pair lands in `state`; `None` for Idle.
    pub fn for_state(sensor: bool, state: CollisionState) -> Option<Self> {
        let kind = match (sensor, state) {
            (_, CollisionState::Idle) => return None,
            (true, CollisionState::Enter) => EventKind::SensorEnter,
            (true, CollisionState::Stay) => EventKind::SensorStay,
            (true, CollisionState::Exit) => EventKind::SensorExit,
            (false, CollisionState::Enter) => EventKind::CollisionEnter,
            (false, CollisionState::Stay) => EventKind::CollisionStay,
            (false, CollisionState::Exit) => EventKind::CollisionExit,
        };
        Some(kind)
    }

    pub fn is_sensor(self) -> bool {
        matches!(
            self,
            EventKind::SensorEnter | EventKind::SensorStay | EventKind::SensorExit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type ListenerResult = std::result::Result<(), Box<dyn Error + Send + Sync>>;

pub type CollisionCallback =
    Box<dyn FnMut(&CollisionEvent, &mut ListenerContext<'_>) -> ListenerResult>;

/// World mutation requested from inside a listener, applied once the tick has finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RemoveBody(BodyId),
    RemoveCollider(ColliderId),
    SetBodyTransform(BodyId, Transform),
}

/// Deferred command buffer.
#[derive(Debug, Default)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    pub fn remove_body(&mut self, body: BodyId) {
        self.queue.push(Command::RemoveBody(body));
    }

    pub fn remove_collider(&mut self, collider: ColliderId) {
        self.queue.push(Command::RemoveCollider(collider));
    }

    pub fn set_body_transform(&mut self, body: BodyId, transform: Transform) {
        self.queue.push(Command::SetBodyTransform(body, transform));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.queue)
    }
}

/// What a listener can reach while it runs.
pub struct ListenerContext<'a> {
    query: ContactQuery<'a>,
    commands: &'a mut Commands,
}

impl<'a> ListenerContext<'a> {
    pub(crate) fn new(query: ContactQuery<'a>, commands: &'a mut Commands) -> Self {
        Self { query, commands }
    }

    pub fn frame(&self) -> u64 {
        self.query.frame()
    }

    pub fn query(&self) -> &ContactQuery<'a> {
        &self.query
    }

    /// Shorthand for [`CollisionEvent::contact_points`] against the current frame.
    pub fn contact_points<'e>(&self, event: &'e CollisionEvent) -> Result<&'e [ContactPoint]> {
        event.contact_points(&self.query)
    }

    pub fn commands(&mut self) -> &mut Commands {
        self.commands
    }
}

/// Callbacks registered on one collider.
#[derive(Default)]
pub struct ListenerSet {
    next_id: u64,
    entries: Vec<(ListenerId, EventKind, CollisionCallback)>,
}

impl ListenerSet {
    pub fn add(&mut self, kind: EventKind, callback: CollisionCallback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, kind, callback));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, kind: EventKind) -> bool {
        self.entries.iter().any(|(_, entry, _)| *entry == kind)
    }

    /// Runs every callback registered for `kind`; returns how many ran.
    ///
    /// A callback that errors or panics is logged and skipped; the rest still run.
    pub fn dispatch(
        &mut self,
        kind: EventKind,
        event: &CollisionEvent,
        ctx: &mut ListenerContext<'_>,
    ) -> usize {
        let mut invoked = 0;
        for (id, entry, callback) in self.entries.iter_mut() {
            if *entry != kind {
                continue;
            }
            invoked += 1;
            match catch_unwind(AssertUnwindSafe(|| callback(event, ctx))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log::warn!(
                    "{kind:?} listener {id:?} on {} failed: {err}",
                    event.me()
                ),
                Err(_) => log::warn!(
                    "{kind:?} listener {id:?} on {} panicked; continuing dispatch",
                    event.me()
                ),
            }
        }
        invoked
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, kind, _)| (id, kind)))
            .finish()
    }
}
