use glam::Vec3;

use crate::{
    backend::PhysicsBackend,
    utils::allocator::SolverColliderHandle,
};

/// One solver contact, expressed on the manifold's first collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    /// World-space contact point.
    pub point: Vec3,
    /// Penetration depth along the manifold normal; negative when separated.
    pub depth: f32,
}

/// Narrow-phase contact manifold as reported by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    /// Unit normal pointing from the first collider towards the second.
    pub normal: Vec3,
    pub points: Vec<ManifoldPoint>,
}

/// Contact point as seen by the collider receiving an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World-space contact point.
    pub point: Vec3,
    /// Unit normal pointing from the receiving collider towards the other one.
    pub normal: Vec3,
    pub depth: f32,
}

/// Read access to the solver for resolving lazy contact geometry during one frame.
#[derive(Clone, Copy)]
pub struct ContactQuery<'a> {
    backend: &'a dyn PhysicsBackend,
    frame: u64,
}

impl<'a> ContactQuery<'a> {
    pub(crate) fn new(backend: &'a dyn PhysicsBackend, frame: u64) -> Self {
        Self { backend, frame }
    }

    /// Frame whose solver state this query reads.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Collects the contacts between `me` and `other`, oriented from `me`.
    pub(crate) fn contact_points(
        &self,
        me: SolverColliderHandle,
        other: SolverColliderHandle,
    ) -> Vec<ContactPoint> {
        let mut points = Vec::new();
        self.backend.contact_pair(me, other, &mut |manifold, flipped| {
            let normal = if flipped {
                -manifold.normal
            } else {
                manifold.normal
            };
            points.extend(manifold.points.iter().map(|p| ContactPoint {
                point: p.point,
                normal,
                depth: p.depth,
            }));
        });
        points
    }
}
