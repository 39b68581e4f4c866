//! Utility helpers: generational arenas, logging guards, profiling, and math extensions.

pub mod allocator;
pub mod logging;
pub mod math;
pub mod profiling;

pub use allocator::{Arena, ArenaId, BodyId, ColliderId, GenerationalId};
pub use math::*;
pub use profiling::TickProfiler;
