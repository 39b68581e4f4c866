//! Conversions between `glam` values and the `nalgebra` types the solver speaks.

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::{Isometry, Point, Real, Vector};

use crate::core::types::Transform;

pub fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

pub fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn from_point(p: &Point<Real>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

/// Rigid part of `transform`; scale is dropped.
pub fn to_isometry(transform: &Transform) -> Isometry<Real> {
    let p = transform.position;
    let q = transform.rotation;
    Isometry::from_parts(
        Translation3::new(p.x, p.y, p.z),
        UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

/// Solver pose as a unit-scale [`Transform`].
pub fn from_isometry(pose: &Isometry<Real>) -> Transform {
    let q = pose.rotation.quaternion();
    Transform::from_position_rotation(
        from_vector(&pose.translation.vector),
        Quat::from_xyzw(q.i, q.j, q.k, q.w),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn isometry_round_trip_keeps_pose() {
        let transform = Transform::from_position_rotation(
            Vec3::new(1.0, -2.0, 3.5),
            Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3),
        )
        .with_scale(Vec3::splat(2.0));

        let back = from_isometry(&to_isometry(&transform));
        assert_eq!(back.position, transform.position);
        assert_relative_eq!(back.rotation.dot(transform.rotation).abs(), 1.0, epsilon = 1e-5);
        assert_eq!(back.scale, Vec3::ONE);
    }
}
