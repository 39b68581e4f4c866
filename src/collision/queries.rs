use glam::Vec3;

use crate::{
    core::{collider::CollisionFilter, types::ComponentId},
    utils::allocator::{BodyId, ColliderId},
};

/// Result of a ray cast against the world's colliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub body: BodyId,
    pub collider: ColliderId,
    pub component: ComponentId,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastQuery {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: f32,
    /// When false, a ray starting inside a shape reports the exit point instead of distance zero.
    pub solid: bool,
    /// Only colliders whose layer intersects `filter.mask` are considered.
    pub filter: CollisionFilter,
    pub include_sensors: bool,
}

impl RaycastQuery {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction,
            max_distance,
            solid: true,
            filter: CollisionFilter::default(),
            include_sensors: false,
        }
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sensors(mut self, include_sensors: bool) -> Self {
        self.include_sensors = include_sensors;
        self
    }

    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }
}
