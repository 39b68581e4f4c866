use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::types::{Material, Transform};
use crate::{
    backend::{SolverColliderDesc, SolverShape},
    collision::{
        event::{CollisionEvent, EventPair},
        fsm::{CollisionFsm, CollisionState},
        listeners::ListenerSet,
    },
    error::{PhysicsError, Result},
    utils::allocator::{BodyId, ColliderId, SolverColliderHandle},
};

/// Authored collider geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColliderShape {
    Cube {
        half_extents: Vec3,
    },
    Sphere {
        radius: f32,
    },
    /// Y-aligned capsule; `height` spans both caps.
    Capsule {
        radius: f32,
        height: f32,
    },
    /// Y-aligned cylinder.
    Cylinder {
        radius: f32,
        height: f32,
    },
    Mesh {
        vertices: Vec<Vec3>,
        indices: Vec<[u32; 3]>,
    },
    ConvexHull {
        vertices: Vec<Vec3>,
    },
}

impl ColliderShape {
    /// Builds the solver shape; mesh and hull vertices are multiplied by `scale`.
    pub fn to_solver_shape(&self, scale: Vec3) -> Result<SolverShape> {
        match self {
            ColliderShape::Cube { half_extents } => {
                if half_extents.min_element() <= 0.0 || !half_extents.is_finite() {
                    return Err(PhysicsError::InvalidShape(format!(
                        "cube half extents must be positive, got {half_extents}"
                    )));
                }
                Ok(SolverShape::Cuboid {
                    half_extents: *half_extents,
                })
            }
            ColliderShape::Sphere { radius } => {
                positive("sphere radius", *radius)?;
                Ok(SolverShape::Ball { radius: *radius })
            }
            ColliderShape::Capsule { radius, height } => {
                positive("capsule radius", *radius)?;
                positive("capsule height", *height)?;
                Ok(SolverShape::Capsule {
                    half_height: (height * 0.5 - radius).max(0.0),
                    radius: *radius,
                })
            }
            ColliderShape::Cylinder { radius, height } => {
                positive("cylinder radius", *radius)?;
                positive("cylinder height", *height)?;
                Ok(SolverShape::Cylinder {
                    half_height: height * 0.5,
                    radius: *radius,
                })
            }
            ColliderShape::Mesh { vertices, indices } => {
                if vertices.is_empty() || indices.is_empty() {
                    return Err(PhysicsError::InvalidShape(
                        "mesh needs at least one triangle".to_owned(),
                    ));
                }
                let vertex_count = vertices.len() as u32;
                if let Some(bad) = indices.iter().flatten().find(|i| **i >= vertex_count) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "mesh index {bad} out of range for {vertex_count} vertices"
                    )));
                }
                Ok(SolverShape::TriMesh {
                    vertices: vertices.iter().map(|v| *v * scale).collect(),
                    indices: indices.clone(),
                })
            }
            ColliderShape::ConvexHull { vertices } => {
                if vertices.len() < 4 {
                    return Err(PhysicsError::InvalidShape(format!(
                        "convex hull needs at least 4 points, got {}",
                        vertices.len()
                    )));
                }
                Ok(SolverShape::ConvexHull {
                    points: vertices.iter().map(|v| *v * scale).collect(),
                })
            }
        }
    }
}

fn positive(what: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidShape(format!(
            "{what} must be positive, got {value}"
        )))
    }
}

/// Collision group membership (`layer`) and the groups it interacts with (`mask`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub layer: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            layer: 1,
            mask: u32::MAX,
        }
    }
}

impl CollisionFilter {
    pub fn new(layer: u32, mask: u32) -> Self {
        Self { layer, mask }
    }

    pub fn matches(&self, other: &CollisionFilter) -> bool {
        (self.mask & other.layer) != 0 && (other.mask & self.layer) != 0
    }
}

/// Declarative collider data as authored on a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColliderDesc {
    pub shape: ColliderShape,
    #[serde(default)]
    pub sensor: bool,
    #[serde(default)]
    pub filter: CollisionFilter,
    #[serde(default)]
    pub material: Material,
    #[serde(default)]
    pub offset: Transform,
}

impl Default for ColliderDesc {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ColliderDesc {
    pub fn builder() -> ColliderBuilder {
        ColliderBuilder::new()
    }

    pub(crate) fn to_solver_desc(&self, scale: Vec3) -> Result<SolverColliderDesc> {
        Ok(SolverColliderDesc {
            shape: self.shape.to_solver_shape(scale)?,
            sensor: self.sensor,
            filter: self.filter,
            material: self.material,
            offset: self.offset,
        })
    }
}

pub struct ColliderBuilder {
    shape: ColliderShape,
    sensor: bool,
    filter: CollisionFilter,
    material: Material,
    offset: Transform,
}

impl Default for ColliderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ColliderBuilder {
    pub fn new() -> Self {
        Self {
            shape: ColliderShape::Sphere { radius: 0.5 },
            sensor: false,
            filter: CollisionFilter::default(),
            material: Material::default(),
            offset: Transform::default(),
        }
    }

    pub fn cube(mut self, half_extents: Vec3) -> Self {
        self.shape = ColliderShape::Cube { half_extents };
        self
    }

    pub fn sphere(mut self, radius: f32) -> Self {
        self.shape = ColliderShape::Sphere { radius };
        self
    }

    pub fn capsule(mut self, radius: f32, height: f32) -> Self {
        self.shape = ColliderShape::Capsule { radius, height };
        self
    }

    pub fn cylinder(mut self, radius: f32, height: f32) -> Self {
        self.shape = ColliderShape::Cylinder { radius, height };
        self
    }

    pub fn shape(mut self, shape: ColliderShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn filter(mut self, layer: u32, mask: u32) -> Self {
        self.filter = CollisionFilter { layer, mask };
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn offset(mut self, offset: Transform) -> Self {
        self.offset = offset;
        self
    }

    pub fn build(self) -> ColliderDesc {
        ColliderDesc {
            shape: self.shape,
            sensor: self.sensor,
            filter: self.filter,
            material: self.material,
            offset: self.offset,
        }
    }
}

/// Live collider owned by a rigid body.
#[derive(Debug)]
pub struct Collider {
    id: ColliderId,
    body: BodyId,
    handle: SolverColliderHandle,
    shape: ColliderShape,
    sensor: bool,
    filter: CollisionFilter,
    pub(crate) listeners: ListenerSet,
    active_events: bool,
    events_dirty: bool,
    pub(crate) pairs: BTreeMap<ColliderId, CollisionFsm>,
}

impl Collider {
    pub(crate) fn new(
        id: ColliderId,
        body: BodyId,
        handle: SolverColliderHandle,
        desc: &ColliderDesc,
    ) -> Self {
        Self {
            id,
            body,
            handle,
            shape: desc.shape.clone(),
            sensor: desc.sensor,
            filter: desc.filter,
            listeners: ListenerSet::default(),
            active_events: false,
            events_dirty: false,
            pairs: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ColliderId {
        self.id
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn handle(&self) -> SolverColliderHandle {
        self.handle
    }

    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    /// Whether the solver currently reports notifications for this collider.
    pub fn has_active_events(&self) -> bool {
        self.active_events
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of pairs currently tracked by a state machine.
    pub fn tracked_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn pair_state(&self, other: ColliderId) -> Option<CollisionState> {
        self.pairs.get(&other).map(CollisionFsm::state)
    }

    pub(crate) fn mark_events_dirty(&mut self) {
        self.events_dirty = true;
    }

    /// Recomputes the active-event flag from listener presence.
    ///
    /// Returns the new flag when it changed.
    pub(crate) fn refresh_active_events(&mut self) -> Option<bool> {
        if !std::mem::take(&mut self.events_dirty) {
            return None;
        }
        let active = !self.listeners.is_empty();
        if active == self.active_events {
            return None;
        }
        self.active_events = active;
        if !active {
            self.pairs.clear();
        }
        Some(active)
    }

    /// Records a collision for the pair, creating its state machine on first use.
    pub(crate) fn record_collision(&mut self, pair: EventPair, collision: CollisionEvent) {
        self.pairs
            .entry(pair.other)
            .or_insert_with(|| CollisionFsm::new(pair))
            .set_collision(collision);
    }

    /// Clears the pending collision of an existing pair; never allocates.
    pub(crate) fn clear_collision(&mut self, other: ColliderId) {
        if let Some(fsm) = self.pairs.get_mut(&other) {
            fsm.clear_collision();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capsule_half_height_excludes_caps() {
        let shape = ColliderShape::Capsule {
            radius: 0.5,
            height: 2.0,
        };
        assert_eq!(
            shape.to_solver_shape(Vec3::ONE).unwrap(),
            SolverShape::Capsule {
                half_height: 0.5,
                radius: 0.5
            }
        );

        let squat = ColliderShape::Capsule {
            radius: 1.0,
            height: 1.0,
        };
        assert!(matches!(
            squat.to_solver_shape(Vec3::ONE).unwrap(),
            SolverShape::Capsule { half_height, .. } if half_height == 0.0
        ));
    }

    #[test]
    fn cylinder_uses_half_height() {
        let shape = ColliderShape::Cylinder {
            radius: 0.25,
            height: 3.0,
        };
        assert_eq!(
            shape.to_solver_shape(Vec3::splat(4.0)).unwrap(),
            SolverShape::Cylinder {
                half_height: 1.5,
                radius: 0.25
            }
        );
    }

    #[test]
    fn mesh_vertices_follow_scale() {
        let shape = ColliderShape::Mesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            indices: vec![[0, 1, 2]],
        };
        let SolverShape::TriMesh { vertices, indices } =
            shape.to_solver_shape(Vec3::new(2.0, 1.0, 3.0)).unwrap()
        else {
            panic!("expected a trimesh");
        };
        assert_eq!(vertices, vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 3.0)]);
        assert_eq!(indices, vec![[0, 1, 2]]);
    }

    #[test]
    fn invalid_dimensions_are_rejected() {
        let bad_index = ColliderShape::Mesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            indices: vec![[0, 1, 3]],
        };
        assert!(matches!(
            bad_index.to_solver_shape(Vec3::ONE),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert!(ColliderShape::Sphere { radius: -1.0 }
            .to_solver_shape(Vec3::ONE)
            .is_err());
        assert!(ColliderShape::ConvexHull {
            vertices: vec![Vec3::ZERO]
        }
        .to_solver_shape(Vec3::ONE)
        .is_err());
    }

    #[test]
    fn filters_match_both_ways() {
        let player = CollisionFilter::new(0b01, 0b10);
        let pickup = CollisionFilter::new(0b10, 0b01);
        let decor = CollisionFilter::new(0b100, u32::MAX);
        assert!(player.matches(&pickup));
        assert!(!player.matches(&decor));
    }
}
