//! # Sweep
//!
//! Deterministic collision world for fixed-timestep simulations.
//!
//! Sweep answers the three questions a combat simulation asks of its physics
//! backend every tick:
//!
//! - **Swept casts**: where along a `start → end` path does a shape first
//!   touch each body? ([`CollisionWorld::cast_collider`])
//! - **Distance queries**: which bodies lie within a distance of a shape?
//!   ([`CollisionWorld::calculate_distance`])
//! - **Point queries**: where is the closest surface point of one body?
//!   ([`CollisionWorld::point_distance`])
//!
//! Narrow-phase work is delegated to [`parry3d`]: casts go through
//! `query::cast_shapes`, distances through `query::contact` and point
//! queries through `PointQuery::project_point`. Sweep owns the layer filter,
//! the AABB broadphase and the ordering of results.
//!
//! The world is an immutable snapshot. It is built once per tick and shared
//! by every parallel worker, so all queries take `&self` and results are
//! sorted deterministically (by fraction or distance, then body index).
//!
//! ## Quick Start
//!
//! ```
//! use glam::{Quat, Vec3};
//! use sweep::{
//!     ColliderCastInput, CollisionFilter, CollisionWorld, Pose, RigidBody, Shape, World,
//! };
//!
//! let world = World::new(vec![RigidBody::new(
//!     7,
//!     Shape::sphere(1.0),
//!     Pose::from_position(Vec3::new(10.0, 0.0, 0.0)),
//!     CollisionFilter::DEFAULT,
//! )]);
//!
//! let hits = world.cast_collider(&ColliderCastInput {
//!     shape: Shape::sphere(0.5),
//!     orientation: Quat::IDENTITY,
//!     start: Vec3::ZERO,
//!     end: Vec3::new(20.0, 0.0, 0.0),
//!     filter: CollisionFilter::DEFAULT,
//! });
//!
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].entity, 7);
//! assert!((hits[0].fraction - 0.425).abs() < 1e-3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod body;
mod convert;
pub mod error;
pub mod filter;
pub mod query;
pub mod shape;
pub mod world;

// Re-exports for convenience
pub use body::{Pose, RigidBody};
pub use error::CollisionError;
pub use filter::CollisionFilter;
pub use query::{CastHit, ColliderCastInput, DistanceHit, DistanceInput};
pub use shape::Shape;
pub use world::{CollisionWorld, World};

use glam::Vec3;

/// Threshold below which a length or distance counts as zero.
///
/// Uses the smallest normal `f32` so denormals never pass as real motion.
pub const EPSILON: f32 = f32::MIN_POSITIVE;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create bounds from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create bounds centered on a point.
    #[must_use]
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the bounds.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the bounds.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow the box by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Check if a point is inside the bounds.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Check if two boxes overlap (touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Check if this bounds intersects a sphere.
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        center.distance_squared(closest) <= radius * radius
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::from_center_extents(Vec3::ZERO, Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_contains() {
        let bounds = Aabb::from_center_extents(Vec3::ZERO, Vec3::splat(5.0));
        assert!(bounds.contains(Vec3::ZERO));
        assert!(bounds.contains(Vec3::new(4.0, 4.0, 4.0)));
        assert!(!bounds.contains(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_union_and_intersects() {
        let a = Aabb::from_min_max(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_min_max(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(!a.intersects(&b));
        assert!(a.expanded(1.0).intersects(&b));

        let u = a.union(&b);
        assert_eq!(u.min, Vec3::ZERO);
        assert_eq!(u.max, Vec3::splat(3.0));
    }

    #[test]
    fn test_aabb_sphere() {
        let bounds = Aabb::from_min_max(Vec3::ZERO, Vec3::ONE);
        assert!(bounds.intersects_sphere(Vec3::new(2.0, 0.5, 0.5), 1.0));
        assert!(!bounds.intersects_sphere(Vec3::new(2.5, 0.5, 0.5), 1.0));
    }
}
