//! Query inputs and results.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::filter::CollisionFilter;
use crate::shape::Shape;

/// Swept cast of a shape along `start → end` at a fixed orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderCastInput {
    /// Cast shape
    pub shape: Shape,
    /// Orientation held for the whole sweep
    pub orientation: Quat,
    /// Sweep origin
    pub start: Vec3,
    /// Sweep end
    pub end: Vec3,
    /// Query filter
    pub filter: CollisionFilter,
}

impl ColliderCastInput {
    /// Unrotated cast that collides with everything.
    #[must_use]
    pub fn new(shape: Shape, start: Vec3, end: Vec3) -> Self {
        Self {
            shape,
            orientation: Quat::IDENTITY,
            start,
            end,
            filter: CollisionFilter::DEFAULT,
        }
    }

    /// Set orientation.
    #[must_use]
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set filter.
    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sweep direction and length.
    #[must_use]
    pub fn displacement(&self) -> Vec3 {
        self.end - self.start
    }

    /// Position along the sweep at `fraction`.
    #[must_use]
    pub fn point_at(&self, fraction: f32) -> Vec3 {
        self.start.lerp(self.end, fraction)
    }
}

/// First contact of a sweep with one body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CastHit {
    /// Sweep fraction in `[0, 1]` where contact begins
    pub fraction: f32,
    /// Contact point on the body surface
    pub position: Vec3,
    /// Surface normal at the contact, pointing toward the cast shape
    pub normal: Vec3,
    /// Index of the body in the world
    pub body_index: usize,
    /// Entity key of the body
    pub entity: u64,
}

/// Overlap query: which bodies lie within `max_distance` of a placed shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceInput {
    /// Query shape
    pub shape: Shape,
    /// Shape position
    pub position: Vec3,
    /// Shape orientation
    pub orientation: Quat,
    /// Largest surface separation reported
    pub max_distance: f32,
    /// Query filter
    pub filter: CollisionFilter,
}

impl DistanceInput {
    /// Unrotated query that collides with everything.
    #[must_use]
    pub fn new(shape: Shape, position: Vec3, max_distance: f32) -> Self {
        Self {
            shape,
            position,
            orientation: Quat::IDENTITY,
            max_distance,
            filter: CollisionFilter::DEFAULT,
        }
    }

    /// Set orientation.
    #[must_use]
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set filter.
    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Separation between the query shape and one body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceHit {
    /// Signed surface distance; negative means overlap
    pub distance: f32,
    /// Closest point on the body surface
    pub position: Vec3,
    /// Surface normal pointing toward the query shape
    pub normal: Vec3,
    /// Index of the body in the world
    pub body_index: usize,
    /// Entity key of the body
    pub entity: u64,
}
