//! glam ↔ nalgebra conversions at the parry boundary.

use glam::{Quat, Vec3};
use parry3d::na::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

pub(crate) fn isometry(position: Vec3, rotation: Quat) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::new(position.x, position.y, position.z),
        UnitQuaternion::new_normalize(Quaternion::new(
            rotation.w, rotation.x, rotation.y, rotation.z,
        )),
    )
}

pub(crate) fn point(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

pub(crate) fn vector(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub(crate) fn from_point(p: &Point3<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub(crate) fn from_vector(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isometry_matches_glam_transform() {
        let position = Vec3::new(1.0, -2.0, 3.0);
        let rotation = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3);
        let local = Vec3::new(0.5, 1.5, -2.0);

        let expected = position + rotation * local;
        let actual = from_point(&(isometry(position, rotation) * point(local)));
        assert!(actual.distance(expected) < 1e-5);
    }
}
