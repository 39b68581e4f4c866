//! Per-tick pair state advancement and listener dispatch.

use super::PhysicsWorld;
use crate::{
    backend::PhysicsBackend,
    collision::{
        contact::ContactQuery,
        event::CollisionEvent,
        fsm::CollisionState,
        listeners::{EventKind, ListenerContext},
    },
    core::collider::Collider,
    utils::allocator::ColliderId,
};

impl<B: PhysicsBackend> PhysicsWorld<B> {
    pub(super) fn emit_collider_events(&mut self) {
        let frame = self.frame;
        let active: Vec<ColliderId> = self
            .colliders
            .iter()
            .filter(|(_, collider)| collider.has_active_events() && collider.tracked_pairs() > 0)
            .map(|(id, _)| id)
            .collect();

        let mut events: Vec<(EventKind, CollisionEvent)> = Vec::new();
        let mut idle: Vec<ColliderId> = Vec::new();
        let mut dispatched = 0;

        for id in active {
            let Some(collider) = self.colliders.get(id) else {
                continue;
            };
            let verdicts = self.reverify_sensor_overlaps(collider);

            let Some(collider) = self.colliders.get_mut(id) else {
                continue;
            };
            for (other, touching) in verdicts {
                if !touching {
                    collider.clear_collision(other);
                }
            }

            events.clear();
            idle.clear();
            for (other, fsm) in collider.pairs.iter_mut() {
                let state = fsm.update(frame);
                if let Some(kind) = EventKind::for_state(fsm.pair().sensor, state) {
                    let event = match fsm.collision() {
                        Some(collision) if state != CollisionState::Exit => collision.clone(),
                        _ => CollisionEvent::separation(*fsm.pair(), frame),
                    };
                    events.push((kind, event));
                }
                fsm.consume_transient();
                if state == CollisionState::Idle {
                    idle.push(*other);
                }
            }
            for other in &idle {
                collider.pairs.remove(other);
            }

            let mut ctx =
                ListenerContext::new(ContactQuery::new(&self.backend, frame), &mut self.commands);
            for (kind, event) in &events {
                dispatched += collider.listeners.dispatch(*kind, event, &mut ctx);
            }
        }

        self.profiler.dispatched_callbacks += dispatched;
        self.profiler.tracked_pairs = self.tracked_pair_count();
    }

    /// Asks the solver whether ongoing sensor overlaps still hold.
    ///
    /// A pair whose other collider is gone counts as separated.
    fn reverify_sensor_overlaps(&self, collider: &Collider) -> Vec<(ColliderId, bool)> {
        collider
            .pairs
            .iter()
            .filter(|(_, fsm)| {
                fsm.pair().sensor && fsm.state().is_ongoing() && fsm.collision().is_some()
            })
            .map(|(other, _)| {
                let touching = self.colliders.get(*other).is_some_and(|other| {
                    self.backend
                        .intersection_pair(collider.handle(), other.handle())
                });
                (*other, touching)
            })
            .collect()
    }
}
