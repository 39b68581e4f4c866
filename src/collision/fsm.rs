//! Per-pair collision state machine.
//!
//! Each collider keeps one [`CollisionFsm`] per collider it is (or just was) touching.
//! Once per tick the machine is fed whether a collision is pending for the pair:
//!
//! | state | pending | no pending |
//! |-------|---------|------------|
//! | Idle  | Enter   | Idle       |
//! | Enter | Stay    | Exit       |
//! | Stay  | Stay    | Exit       |
//! | Exit  | Enter   | Idle       |
//!
//! A pair touching for a single tick therefore yields `Enter, Exit` and never `Stay`.

use crate::collision::event::{CollisionEvent, EventPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CollisionState {
    #[default]
    Idle = 0,
    Enter = 1,
    Stay = 2,
    Exit = 3,
}

impl CollisionState {
    /// The only valid successor of `self` given whether a collision is pending.
    pub const fn next(self, pending: bool) -> CollisionState {
        match (self, pending) {
            (CollisionState::Idle, true) => CollisionState::Enter,
            (CollisionState::Idle, false) => CollisionState::Idle,
            (CollisionState::Enter, true) => CollisionState::Stay,
            (CollisionState::Enter, false) => CollisionState::Exit,
            (CollisionState::Stay, true) => CollisionState::Stay,
            (CollisionState::Stay, false) => CollisionState::Exit,
            (CollisionState::Exit, true) => CollisionState::Enter,
            (CollisionState::Exit, false) => CollisionState::Idle,
        }
    }

    /// Enter or Stay.
    pub const fn is_ongoing(self) -> bool {
        matches!(self, CollisionState::Enter | CollisionState::Stay)
    }
}

/// Lifecycle tracker for one ordered collider pair.
#[derive(Debug, Clone)]
pub struct CollisionFsm {
    pair: EventPair,
    state: CollisionState,
    collision: Option<CollisionEvent>,
}

impl CollisionFsm {
    pub fn new(pair: EventPair) -> Self {
        Self {
            pair,
            state: CollisionState::Idle,
            collision: None,
        }
    }

    pub fn pair(&self) -> &EventPair {
        &self.pair
    }

    pub fn state(&self) -> CollisionState {
        self.state
    }

    /// Collision recorded for the next update, if any.
    pub fn collision(&self) -> Option<&CollisionEvent> {
        self.collision.as_ref()
    }

    pub fn set_collision(&mut self, collision: CollisionEvent) {
        self.collision = Some(collision);
    }

    pub fn clear_collision(&mut self) {
        self.collision = None;
    }

    /// Drops a pending collision that only applies to the tick it was reported on.
    pub fn consume_transient(&mut self) {
        if self.collision.as_ref().is_some_and(CollisionEvent::is_transient) {
            self.collision = None;
        }
    }

    /// Advances the machine for `frame` and returns the new state.
    pub fn update(&mut self, frame: u64) -> CollisionState {
        self.state = self.state.next(self.collision.is_some());
        match self.state {
            CollisionState::Idle => self.collision = None,
            _ => {
                if let Some(collision) = self.collision.as_mut() {
                    collision.refresh(frame);
                }
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ComponentId;
    use crate::utils::allocator::{ArenaId, ColliderId, GenerationalId};
    use proptest::prelude::*;

    fn pair() -> EventPair {
        EventPair {
            me: ColliderId::from_raw(GenerationalId::new(0, 0)),
            other: ColliderId::from_raw(GenerationalId::new(1, 0)),
            me_component: ComponentId(10),
            other_component: ComponentId(11),
            sensor: true,
        }
    }

    fn touch(frame: u64) -> CollisionEvent {
        CollisionEvent::intersection(pair(), frame)
    }

    #[test]
    fn single_tick_touch_is_enter_then_exit() {
        let mut fsm = CollisionFsm::new(pair());
        fsm.set_collision(touch(1));
        assert_eq!(fsm.update(1), CollisionState::Enter);
        fsm.clear_collision();
        assert_eq!(fsm.update(2), CollisionState::Exit);
        assert_eq!(fsm.update(3), CollisionState::Idle);
        assert!(fsm.collision().is_none());
    }

    #[test]
    fn exit_with_pending_collision_reenters() {
        let mut fsm = CollisionFsm::new(pair());
        fsm.set_collision(touch(1));
        fsm.update(1);
        fsm.clear_collision();
        fsm.update(2);
        fsm.set_collision(touch(3));
        assert_eq!(fsm.update(3), CollisionState::Enter);
    }

    #[test]
    fn update_restamps_the_stored_collision() {
        let mut fsm = CollisionFsm::new(pair());
        fsm.set_collision(touch(4));
        fsm.update(4);
        assert_eq!(fsm.update(5), CollisionState::Stay);
        assert_eq!(fsm.collision().map(CollisionEvent::frame), Some(5));
    }

    #[test]
    fn transient_collisions_are_consumed() {
        let mut fsm = CollisionFsm::new(pair());
        let contact = crate::collision::contact::ContactPoint {
            point: glam::Vec3::ZERO,
            normal: glam::Vec3::Y,
            depth: 0.01,
        };
        fsm.set_collision(CollisionEvent::character(pair(), 1, contact));
        assert_eq!(fsm.update(1), CollisionState::Enter);
        fsm.consume_transient();
        assert!(fsm.collision().is_none());

        fsm.set_collision(touch(2));
        fsm.consume_transient();
        assert!(fsm.collision().is_some());
    }

    proptest! {
        #[test]
        fn transitions_follow_the_table(inputs in proptest::collection::vec(any::<bool>(), 1..64)) {
            let mut fsm = CollisionFsm::new(pair());
            for (frame, present) in inputs.into_iter().enumerate() {
                let before = fsm.state();
                if present {
                    fsm.set_collision(touch(frame as u64));
                } else {
                    fsm.clear_collision();
                }
                let after = fsm.update(frame as u64);

                let expected = match (before, present) {
                    (CollisionState::Idle, true) | (CollisionState::Exit, true) => CollisionState::Enter,
                    (CollisionState::Enter, true) | (CollisionState::Stay, true) => CollisionState::Stay,
                    (CollisionState::Enter, false) | (CollisionState::Stay, false) => CollisionState::Exit,
                    (CollisionState::Idle, false) | (CollisionState::Exit, false) => CollisionState::Idle,
                };
                prop_assert_eq!(after, expected);
                prop_assert_ne!(
                    (before, after),
                    (CollisionState::Idle, CollisionState::Stay),
                    "Stay is never reachable from Idle"
                );
                prop_assert_eq!(fsm.collision().is_some(), after != CollisionState::Idle && present);
            }
        }
    }
}
