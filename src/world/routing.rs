//! Turns solver notifications and character hits into pending pair collisions.

use super::PhysicsWorld;
use crate::{
    backend::{PhysicsBackend, RawCollisionEvent},
    collision::{
        contact::ContactPoint,
        event::{CollisionEvent, EventPair},
    },
    utils::allocator::ColliderId,
};

impl<B: PhysicsBackend> PhysicsWorld<B> {
    pub(super) fn drain_and_route(&mut self) {
        let mut raw = Vec::new();
        self.backend
            .drain_collision_events(&mut |event: RawCollisionEvent| raw.push(event));
        self.profiler.raw_events += raw.len();

        for event in raw {
            let a = self.handle_lookup.get(&event.collider_a).copied();
            let b = self.handle_lookup.get(&event.collider_b).copied();
            let routed = match (a, b) {
                (Some(a), Some(b)) => self.route_solver_event(a, b, event.started),
                _ => false,
            };
            if !routed {
                self.profiler.skipped_events += 1;
                log::trace!(
                    "skipped notification for unknown pair {} / {}",
                    event.collider_a,
                    event.collider_b
                );
            }
        }

        self.route_character_hits();
    }

    /// Builds the pair as seen from `a`; `None` when either side is gone.
    fn event_pair(&self, a: ColliderId, b: ColliderId) -> Option<EventPair> {
        let collider_a = self.colliders.get(a)?;
        let collider_b = self.colliders.get(b)?;
        let body_a = self.bodies.get(collider_a.body())?;
        let body_b = self.bodies.get(collider_b.body())?;
        Some(EventPair {
            me: a,
            other: b,
            me_component: body_a.component(),
            other_component: body_b.component(),
            sensor: collider_a.is_sensor() || collider_b.is_sensor(),
        })
    }

    fn record(&mut self, collider: ColliderId, pair: EventPair, collision: CollisionEvent) {
        if let Some(collider) = self.colliders.get_mut(collider) {
            if collider.has_active_events() {
                collider.record_collision(pair, collision);
            }
        }
    }

    fn clear(&mut self, a: ColliderId, b: ColliderId) {
        if let Some(collider) = self.colliders.get_mut(a) {
            collider.clear_collision(b);
        }
        if let Some(collider) = self.colliders.get_mut(b) {
            collider.clear_collision(a);
        }
    }

    fn route_solver_event(&mut self, a: ColliderId, b: ColliderId, started: bool) -> bool {
        let Some(pair) = self.event_pair(a, b) else {
            return false;
        };
        let frame = self.frame;

        if pair.sensor {
            if started {
                self.record(a, pair, CollisionEvent::intersection(pair, frame));
                self.record(b, pair.swapped(), CollisionEvent::intersection(pair.swapped(), frame));
            }
            // Sensor stops can be spurious; overlap re-verification ends the pair instead.
            return true;
        }

        if started {
            let (Some(handle_a), Some(handle_b)) = (
                self.colliders.get(a).map(|c| c.handle()),
                self.colliders.get(b).map(|c| c.handle()),
            ) else {
                return false;
            };
            self.record(a, pair, CollisionEvent::manifold(pair, frame, handle_a, handle_b));
            self.record(
                b,
                pair.swapped(),
                CollisionEvent::manifold(pair.swapped(), frame, handle_b, handle_a),
            );
        } else {
            self.clear(a, b);
        }
        true
    }

    fn route_character_hits(&mut self) {
        let frame = self.frame;
        let hits = self.held_hits.clone();
        for (controller, hit) in hits {
            let Some(pair) = self.event_pair(controller, hit.other) else {
                self.profiler.skipped_events += 1;
                continue;
            };
            let contact = hit.contact();
            let mirrored = ContactPoint {
                normal: -contact.normal,
                ..contact
            };
            self.record(controller, pair, CollisionEvent::character(pair, frame, contact));
            self.record(
                hit.other,
                pair.swapped(),
                CollisionEvent::character(pair.swapped(), frame, mirrored),
            );
        }
    }
}
