use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

/// Slot index paired with a generation so stale handles never alias a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: u32,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Typed handle stored in an [`Arena`].
pub trait ArenaId: Copy + Eq {
    fn from_raw(raw: GenerationalId) -> Self;
    fn raw(self) -> GenerationalId;
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(GenerationalId);

        impl $name {
            pub fn index(&self) -> u32 {
                self.0.index
            }

            pub fn generation(&self) -> u32 {
                self.0.generation
            }
        }

        impl ArenaId for $name {
            fn from_raw(raw: GenerationalId) -> Self {
                Self(raw)
            }

            fn raw(self) -> GenerationalId {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", stringify!($name), self.0.index, self.0.generation)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

arena_id!(
    /// Handle of a [`RigidBody`](crate::core::rigidbody::RigidBody) owned by the world.
    BodyId
);
arena_id!(
    /// Handle of a [`Collider`](crate::core::collider::Collider) owned by the world.
    ColliderId
);
arena_id!(
    /// Body handle issued by a [`PhysicsBackend`](crate::backend::PhysicsBackend).
    SolverBodyHandle
);
arena_id!(
    /// Collider handle issued by a [`PhysicsBackend`](crate::backend::PhysicsBackend).
    SolverColliderHandle
);

/// Generational arena that hands out stable IDs while preventing use-after-free.
pub struct Arena<T, I: ArenaId> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<u32>,
    live: usize,
    _id: PhantomData<I>,
}

impl<T, I: ArenaId> Default for Arena<T, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, I: ArenaId> Arena<T, I> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            live: 0,
            _id: PhantomData,
        }
    }

    pub fn insert(&mut self, item: T) -> I {
        self.insert_with(|_| item)
    }

    /// Inserts a value built from the id it will be stored under.
    pub fn insert_with(&mut self, build: impl FnOnce(I) -> T) -> I {
        self.live += 1;
        if let Some(index) = self.free_list.pop_front() {
            let slot = index as usize;
            let id = I::from_raw(GenerationalId::new(index, self.generations[slot]));
            self.items[slot] = Some(build(id));
            return id;
        }

        let index = self.items.len() as u32;
        let id = I::from_raw(GenerationalId::new(index, 0));
        self.items.push(Some(build(id)));
        self.generations.push(0);
        id
    }

    pub fn get(&self, id: I) -> Option<&T> {
        if self.is_valid(id) {
            self.items
                .get(id.raw().index as usize)
                .and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        if self.is_valid(id) {
            self.items
                .get_mut(id.raw().index as usize)
                .and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let slot = id.raw().index as usize;
        let taken = self.items.get_mut(slot).and_then(Option::take)?;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free_list.push_back(id.raw().index);
        self.live -= 1;
        Some(taken)
    }

    pub fn clear(&mut self) {
        for (slot, item) in self.items.iter_mut().enumerate() {
            if item.take().is_some() {
                self.generations[slot] = self.generations[slot].wrapping_add(1);
                self.free_list.push_back(slot as u32);
            }
        }
        self.live = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.items.iter().enumerate().filter_map(|(slot, item)| {
            item.as_ref()
                .map(|value| (self.id_at(slot), value))
        })
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.items.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn id_at(&self, slot: usize) -> I {
        I::from_raw(GenerationalId::new(slot as u32, self.generations[slot]))
    }

    fn is_valid(&self, id: I) -> bool {
        let raw = id.raw();
        self.generations
            .get(raw.index as usize)
            .is_some_and(|gen| *gen == raw.generation)
    }
}
