//! Rigid bodies and their placement.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::filter::CollisionFilter;
use crate::shape::Shape;
use crate::Aabb;

/// Position and orientation of a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position
    pub position: Vec3,
    /// World orientation
    pub rotation: Quat,
}

impl Pose {
    /// Identity pose at the origin.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a pose.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Unrotated pose at `position`.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Local point to world space.
    #[must_use]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// World point to local space.
    #[must_use]
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }

    pub(crate) fn to_isometry(self) -> parry3d::na::Isometry3<f32> {
        crate::convert::isometry(self.position, self.rotation)
    }

    /// Interpolate between two poses (lerp position, slerp rotation).
    #[must_use]
    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.slerp(other.rotation, t),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A static collider in the world snapshot.
///
/// `entity` is an opaque key supplied by the caller; the world maps it back
/// to the body's index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    /// Owning entity key
    pub entity: u64,
    /// Collider shape
    pub shape: Shape,
    /// Placement
    pub pose: Pose,
    /// Layer filter
    pub filter: CollisionFilter,
}

impl RigidBody {
    /// Create a body.
    #[must_use]
    pub const fn new(entity: u64, shape: Shape, pose: Pose, filter: CollisionFilter) -> Self {
        Self {
            entity,
            shape,
            pose,
            filter,
        }
    }

    /// World-space bounds.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.shape.aabb(self.pose.position, self.pose.rotation)
    }
}
