//! Collider shapes.
//!
//! Shapes are described in local space. A [`Pose`](crate::Pose) places them
//! in the world. Capsules are aligned with the local Y axis. Queries lower
//! shapes to their parry equivalents.

use glam::{Quat, Vec3};
use parry3d::shape::{Ball, Capsule, Cuboid};
use serde::{Deserialize, Serialize};

use crate::error::{CollisionError, Result};
use crate::Aabb;

/// A convex collider shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Ball around the origin.
    Sphere {
        /// Radius
        radius: f32,
    },
    /// Segment from `-half_height` to `+half_height` on Y, inflated by `radius`.
    Capsule {
        /// Half length of the inner segment
        half_height: f32,
        /// Radius around the segment
        radius: f32,
    },
    /// Box with the given half extents.
    Cuboid {
        /// Half size on each local axis
        half_extents: Vec3,
    },
}

impl Shape {
    /// Create a sphere.
    #[must_use]
    pub const fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Create a Y-aligned capsule.
    #[must_use]
    pub const fn capsule(half_height: f32, radius: f32) -> Self {
        Self::Capsule {
            half_height,
            radius,
        }
    }

    /// Create a box.
    #[must_use]
    pub const fn cuboid(half_extents: Vec3) -> Self {
        Self::Cuboid { half_extents }
    }

    /// Validate authored dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::InvalidDimension`] for negative or
    /// non-finite dimensions.
    pub fn validate(&self) -> Result<()> {
        fn check(name: &'static str, value: f32) -> Result<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(CollisionError::InvalidDimension { name, value })
            }
        }

        match *self {
            Self::Sphere { radius } => check("radius", radius),
            Self::Capsule {
                half_height,
                radius,
            } => {
                check("half_height", half_height)?;
                check("radius", radius)
            }
            Self::Cuboid { half_extents } => {
                check("half_extents.x", half_extents.x)?;
                check("half_extents.y", half_extents.y)?;
                check("half_extents.z", half_extents.z)
            }
        }
    }

    /// Uniformly scaled copy of this shape.
    #[must_use]
    pub fn scaled(&self, scale: f32) -> Self {
        let scale = scale.abs();
        match *self {
            Self::Sphere { radius } => Self::Sphere {
                radius: radius * scale,
            },
            Self::Capsule {
                half_height,
                radius,
            } => Self::Capsule {
                half_height: half_height * scale,
                radius: radius * scale,
            },
            Self::Cuboid { half_extents } => Self::Cuboid {
                half_extents: half_extents * scale,
            },
        }
    }

    /// World-space bounds at the given placement.
    #[must_use]
    pub fn aabb(&self, position: Vec3, rotation: Quat) -> Aabb {
        match *self {
            Self::Sphere { radius } => Aabb::from_center_extents(position, Vec3::splat(radius)),
            Self::Capsule {
                half_height,
                radius,
            } => {
                let axis = rotation * Vec3::new(0.0, half_height, 0.0);
                let a = position - axis;
                let b = position + axis;
                Aabb::from_min_max(a.min(b), a.max(b)).expanded(radius)
            }
            Self::Cuboid { half_extents } => {
                let basis = glam::Mat3::from_quat(rotation);
                let extents = basis.x_axis.abs() * half_extents.x
                    + basis.y_axis.abs() * half_extents.y
                    + basis.z_axis.abs() * half_extents.z;
                Aabb::from_center_extents(position, extents)
            }
        }
    }

    /// Concrete parry shape for this description.
    pub(crate) fn to_parry(self) -> ParryShape {
        match self {
            Self::Sphere { radius } => ParryShape::Ball(Ball::new(radius)),
            Self::Capsule {
                half_height,
                radius,
            } => ParryShape::Capsule(Capsule::new_y(half_height, radius)),
            Self::Cuboid { half_extents } => {
                ParryShape::Cuboid(Cuboid::new(crate::convert::vector(half_extents)))
            }
        }
    }
}

/// A [`Shape`] lowered to parry, held by value.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ParryShape {
    Ball(Ball),
    Capsule(Capsule),
    Cuboid(Cuboid),
}

impl ParryShape {
    pub(crate) fn as_dyn(&self) -> &dyn parry3d::shape::Shape {
        match self {
            Self::Ball(ball) => ball,
            Self::Capsule(capsule) => capsule,
            Self::Cuboid(cuboid) => cuboid,
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::sphere(0.5)
    }
}
