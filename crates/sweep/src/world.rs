//! The collision world snapshot and its query interface.

use std::collections::BTreeMap;

use glam::Vec3;
use parry3d::na::Vector3;
use parry3d::query::{self, PointQuery, ShapeCastOptions};
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;
use crate::convert;
use crate::error::{CollisionError, Result};
use crate::query::{CastHit, ColliderCastInput, DistanceHit, DistanceInput};
use crate::EPSILON;

/// Separation at which a sweep counts as touching.
const CAST_TOLERANCE: f32 = 1e-4;

/// Read-only collision queries over a frozen snapshot.
///
/// Implementations must be deterministic: identical inputs return identical
/// hits in identical order. Queries take `&self`, so one snapshot can be
/// shared by every worker of a parallel phase.
pub trait CollisionWorld: Send + Sync {
    /// Sweep a shape and report the first contact with every body touched,
    /// sorted by `(fraction, body_index)`.
    fn cast_collider(&self, input: &ColliderCastInput) -> Vec<CastHit>;

    /// Report every body within `max_distance` of a placed shape, sorted by
    /// `(distance, body_index)`.
    fn calculate_distance(&self, input: &DistanceInput) -> Vec<DistanceHit>;

    /// Closest surface point of one body to a world point.
    fn point_distance(&self, body_index: usize, point: Vec3) -> Option<DistanceHit>;

    /// Index of the body owned by `entity`.
    fn rigid_body_index(&self, entity: u64) -> Option<usize>;

    /// The body at `index`.
    fn body(&self, index: usize) -> Option<&RigidBody>;
}

/// Reference collision world: a flat body list with an AABB broadphase.
///
/// Narrow-phase casts, contacts and point projections are answered by parry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    bodies: Vec<RigidBody>,
    entity_index: BTreeMap<u64, usize>,
}

impl World {
    /// Build a world. On duplicate entity keys the first body wins.
    #[must_use]
    pub fn new(bodies: Vec<RigidBody>) -> Self {
        let mut entity_index = BTreeMap::new();
        for (index, body) in bodies.iter().enumerate() {
            if entity_index.contains_key(&body.entity) {
                tracing::warn!(entity = body.entity, index, "duplicate collision body ignored in index");
                continue;
            }
            entity_index.insert(body.entity, index);
        }
        Self {
            bodies,
            entity_index,
        }
    }

    /// Build a world, rejecting invalid shapes and duplicate entity keys.
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::InvalidDimension`] or
    /// [`CollisionError::DuplicateEntity`].
    pub fn try_new(bodies: Vec<RigidBody>) -> Result<Self> {
        let mut entity_index = BTreeMap::new();
        for (index, body) in bodies.iter().enumerate() {
            body.shape.validate()?;
            if entity_index.insert(body.entity, index).is_some() {
                return Err(CollisionError::DuplicateEntity(body.entity));
            }
        }
        Ok(Self {
            bodies,
            entity_index,
        })
    }

    /// All bodies in index order.
    #[must_use]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the world has no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// First contact of the cast with one body, as `(fraction, point, normal)`.
    fn sweep_body(input: &ColliderCastInput, body: &RigidBody) -> Option<(f32, Vec3, Vec3)> {
        let cast_shape = input.shape.to_parry();
        let body_shape = body.shape.to_parry();
        let cast_pose = convert::isometry(input.start, input.orientation);
        let body_pose = body.pose.to_isometry();
        let displacement = input.displacement();

        if displacement.length() <= EPSILON {
            tracing::trace!(entity = body.entity, "zero-length cast treated as overlap test");
            let contact = query::contact(
                &cast_pose,
                cast_shape.as_dyn(),
                &body_pose,
                body_shape.as_dyn(),
                CAST_TOLERANCE,
            )
            .ok()
            .flatten()?;
            return Some((
                0.0,
                convert::from_point(&contact.point2),
                convert::from_vector(&contact.normal2),
            ));
        }

        let options = ShapeCastOptions {
            max_time_of_impact: 1.0,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };
        let hit = match query::cast_shapes(
            &cast_pose,
            &convert::vector(displacement),
            cast_shape.as_dyn(),
            &body_pose,
            &Vector3::zeros(),
            body_shape.as_dyn(),
            options,
        ) {
            Ok(hit) => hit?,
            Err(unsupported) => {
                tracing::warn!(entity = body.entity, ?unsupported, "shape pair not supported by cast");
                return None;
            }
        };

        Some((
            hit.time_of_impact,
            convert::from_point(&(body_pose * hit.witness2)),
            convert::from_vector(&(body_pose.rotation * hit.normal2.into_inner())),
        ))
    }
}

impl CollisionWorld for World {
    fn cast_collider(&self, input: &ColliderCastInput) -> Vec<CastHit> {
        let swept = input
            .shape
            .aabb(input.start, input.orientation)
            .union(&input.shape.aabb(input.end, input.orientation))
            .expanded(CAST_TOLERANCE);

        let mut hits: Vec<CastHit> = self
            .bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| input.filter.can_collide(&body.filter))
            .filter(|(_, body)| swept.intersects(&body.aabb()))
            .filter_map(|(body_index, body)| {
                Self::sweep_body(input, body).map(|(fraction, position, normal)| CastHit {
                    fraction,
                    position,
                    normal,
                    body_index,
                    entity: body.entity,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.fraction
                .total_cmp(&b.fraction)
                .then(a.body_index.cmp(&b.body_index))
        });
        hits
    }

    fn calculate_distance(&self, input: &DistanceInput) -> Vec<DistanceHit> {
        let max_distance = input.max_distance.max(0.0);
        let bounds = input
            .shape
            .aabb(input.position, input.orientation)
            .expanded(max_distance);
        let query_shape = input.shape.to_parry();
        let query_pose = convert::isometry(input.position, input.orientation);

        let mut hits: Vec<DistanceHit> = self
            .bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| input.filter.can_collide(&body.filter))
            .filter(|(_, body)| bounds.intersects(&body.aabb()))
            .filter_map(|(body_index, body)| {
                let body_shape = body.shape.to_parry();
                // Contacts come back in world space.
                let contact = query::contact(
                    &query_pose,
                    query_shape.as_dyn(),
                    &body.pose.to_isometry(),
                    body_shape.as_dyn(),
                    max_distance,
                )
                .ok()
                .flatten()?;
                Some(DistanceHit {
                    distance: contact.dist,
                    position: convert::from_point(&contact.point2),
                    normal: convert::from_vector(&contact.normal2),
                    body_index,
                    entity: body.entity,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.body_index.cmp(&b.body_index))
        });
        hits
    }

    fn point_distance(&self, body_index: usize, point: Vec3) -> Option<DistanceHit> {
        let body = self.bodies.get(body_index)?;
        let projection = body.shape.to_parry().as_dyn().project_point(
            &body.pose.to_isometry(),
            &convert::point(point),
            false,
        );
        let position = convert::from_point(&projection.point);
        let offset = point - position;
        let (distance, normal) = if projection.is_inside {
            (-offset.length(), (-offset).normalize_or_zero())
        } else {
            (offset.length(), offset.normalize_or_zero())
        };
        Some(DistanceHit {
            distance,
            position,
            normal,
            body_index,
            entity: body.entity,
        })
    }

    fn rigid_body_index(&self, entity: u64) -> Option<usize> {
        self.entity_index.get(&entity).copied()
    }

    fn body(&self, index: usize) -> Option<&RigidBody> {
        self.bodies.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Pose;
    use crate::filter::CollisionFilter;
    use crate::shape::Shape;
    use glam::Quat;
    use proptest::prelude::*;

    fn sphere_at(entity: u64, x: f32, radius: f32) -> RigidBody {
        RigidBody::new(
            entity,
            Shape::sphere(radius),
            Pose::from_position(Vec3::new(x, 0.0, 0.0)),
            CollisionFilter::DEFAULT,
        )
    }

    mod cast_tests {
        use super::*;

        #[test]
        fn hits_sorted_by_fraction() {
            let world = World::new(vec![sphere_at(2, 12.0, 1.0), sphere_at(1, 6.0, 1.0)]);
            let hits = world.cast_collider(&ColliderCastInput::new(
                Shape::sphere(0.5),
                Vec3::ZERO,
                Vec3::new(20.0, 0.0, 0.0),
            ));
            assert_eq!(hits.len(), 2);
            assert_eq!(hits[0].entity, 1);
            assert_eq!(hits[1].entity, 2);
            assert!((hits[0].fraction - 4.5 / 20.0).abs() < 1e-3);
            assert!((hits[1].fraction - 10.5 / 20.0).abs() < 1e-3);
            assert!(hits[0].normal.distance(-Vec3::X) < 1e-3);
        }

        #[test]
        fn miss_when_out_of_reach() {
            let world = World::new(vec![sphere_at(1, 30.0, 1.0)]);
            let hits = world.cast_collider(&ColliderCastInput::new(
                Shape::sphere(0.5),
                Vec3::ZERO,
                Vec3::new(20.0, 0.0, 0.0),
            ));
            assert!(hits.is_empty());
        }

        #[test]
        fn initial_overlap_reports_zero_fraction() {
            let world = World::new(vec![sphere_at(1, 0.5, 1.0)]);
            let hits = world.cast_collider(&ColliderCastInput::new(
                Shape::sphere(0.5),
                Vec3::ZERO,
                Vec3::new(5.0, 0.0, 0.0),
            ));
            assert_eq!(hits.len(), 1);
            assert!(hits[0].fraction.abs() < f32::EPSILON);
        }

        #[test]
        fn zero_length_cast_acts_as_overlap() {
            let world = World::new(vec![sphere_at(1, 1.0, 1.0), sphere_at(2, 8.0, 1.0)]);
            let hits = world.cast_collider(&ColliderCastInput::new(
                Shape::sphere(0.5),
                Vec3::ZERO,
                Vec3::ZERO,
            ));
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].entity, 1);
        }

        #[test]
        fn filter_excludes_bodies() {
            let mut wall = sphere_at(1, 6.0, 1.0);
            wall.filter = CollisionFilter::new(0b10, u32::MAX);
            let world = World::new(vec![wall, sphere_at(2, 12.0, 1.0)]);
            let input = ColliderCastInput::new(
                Shape::sphere(0.5),
                Vec3::ZERO,
                Vec3::new(20.0, 0.0, 0.0),
            )
            .with_filter(CollisionFilter::query(0b01));
            let hits = world.cast_collider(&input);
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].entity, 2);
        }

        #[test]
        fn capsule_cast_against_box() {
            let world = World::new(vec![RigidBody::new(
                9,
                Shape::cuboid(Vec3::ONE),
                Pose::from_position(Vec3::new(0.0, 0.0, 10.0)),
                CollisionFilter::DEFAULT,
            )]);
            let input = ColliderCastInput::new(
                Shape::capsule(1.0, 0.5),
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, 20.0),
            )
            .with_orientation(Quat::IDENTITY);
            let hits = world.cast_collider(&input);
            assert_eq!(hits.len(), 1);
            // Front face at z = 9, capsule radius 0.5.
            assert!((hits[0].fraction - 8.5 / 20.0).abs() < 1e-3);
        }

        #[test]
        fn cuboid_cast_uses_exact_faces() {
            let world = World::new(vec![sphere_at(3, 10.0, 1.0)]);
            let hits = world.cast_collider(&ColliderCastInput::new(
                Shape::cuboid(Vec3::ONE),
                Vec3::ZERO,
                Vec3::new(20.0, 0.0, 0.0),
            ));
            assert_eq!(hits.len(), 1);
            // Box face at x = 1 meets the sphere surface at x = 9.
            assert!((hits[0].fraction - 8.0 / 20.0).abs() < 1e-3);
            assert!(hits[0].position.distance(Vec3::new(9.0, 0.0, 0.0)) < 1e-3);
            assert!(hits[0].normal.distance(-Vec3::X) < 1e-3);
        }

        #[test]
        fn rotated_capsule_cast_reaches_farther() {
            let world = World::new(vec![sphere_at(5, 10.0, 1.0)]);
            let lying = ColliderCastInput::new(
                Shape::capsule(2.0, 0.5),
                Vec3::ZERO,
                Vec3::new(20.0, 0.0, 0.0),
            )
            .with_orientation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
            let hits = world.cast_collider(&lying);
            assert_eq!(hits.len(), 1);
            // Capsule tip at x = 2.5 once laid along X.
            assert!((hits[0].fraction - 6.5 / 20.0).abs() < 1e-3);
        }
    }

    mod distance_tests {
        use super::*;

        #[test]
        fn reports_bodies_within_range() {
            let world = World::new(vec![
                sphere_at(1, 3.0, 1.0),
                sphere_at(2, -2.0, 1.0),
                sphere_at(3, 10.0, 1.0),
            ]);
            let hits = world.calculate_distance(&DistanceInput::new(Shape::sphere(0.5), Vec3::ZERO, 2.0));
            assert_eq!(hits.len(), 2);
            assert_eq!(hits[0].entity, 2);
            assert!((hits[0].distance - 0.5).abs() < 1e-5);
            assert_eq!(hits[1].entity, 1);
            assert!((hits[1].distance - 1.5).abs() < 1e-5);
        }

        #[test]
        fn point_distance_on_box() {
            let world = World::new(vec![RigidBody::new(
                4,
                Shape::cuboid(Vec3::ONE),
                Pose::from_position(Vec3::new(5.0, 0.0, 0.0)),
                CollisionFilter::DEFAULT,
            )]);
            let index = world.rigid_body_index(4).unwrap();
            let hit = world.point_distance(index, Vec3::ZERO).unwrap();
            assert!((hit.distance - 4.0).abs() < 1e-5);
            assert!(hit.position.distance(Vec3::new(4.0, 0.0, 0.0)) < 1e-5);
            assert!(world.point_distance(7, Vec3::ZERO).is_none());
        }
    }

    mod projection_tests {
        use super::*;

        #[test]
        fn point_inside_box_is_negative() {
            let world = World::new(vec![RigidBody::new(
                4,
                Shape::cuboid(Vec3::splat(2.0)),
                Pose::from_position(Vec3::ZERO),
                CollisionFilter::DEFAULT,
            )]);
            let hit = world.point_distance(0, Vec3::new(1.5, 0.0, 0.0)).unwrap();
            assert!((hit.distance + 0.5).abs() < 1e-5);
            assert!(hit.position.distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-5);
            assert!(hit.normal.distance(Vec3::X) < 1e-5);
        }

        #[test]
        fn distance_reports_overlap_as_negative() {
            let world = World::new(vec![sphere_at(1, 1.0, 1.0)]);
            let hits = world.calculate_distance(&DistanceInput::new(Shape::sphere(0.5), Vec3::ZERO, 0.0));
            assert_eq!(hits.len(), 1);
            assert!((hits[0].distance + 0.5).abs() < 1e-5);
            assert!(hits[0].normal.distance(-Vec3::X) < 1e-5);
        }
    }

    mod index_tests {
        use super::*;

        #[test]
        fn new_keeps_first_duplicate() {
            let world = World::new(vec![sphere_at(1, 0.0, 1.0), sphere_at(1, 5.0, 1.0)]);
            assert_eq!(world.rigid_body_index(1), Some(0));
            assert_eq!(world.len(), 2);
        }

        #[test]
        fn try_new_rejects_duplicates_and_bad_shapes() {
            let err = World::try_new(vec![sphere_at(1, 0.0, 1.0), sphere_at(1, 5.0, 1.0)]).unwrap_err();
            assert_eq!(err, CollisionError::DuplicateEntity(1));
            assert!(World::try_new(vec![sphere_at(1, 0.0, -1.0)]).is_err());
        }
    }

    proptest! {
        #[test]
        fn sphere_cast_matches_closed_form(
            x in 3.0_f32..50.0,
            r in 0.1_f32..2.0,
            q in 0.1_f32..1.0,
        ) {
            let world = World::new(vec![sphere_at(1, x, r)]);
            let end = Vec3::new(60.0, 0.0, 0.0);
            let hits = world.cast_collider(&ColliderCastInput::new(Shape::sphere(q), Vec3::ZERO, end));
            prop_assert_eq!(hits.len(), 1);
            let expected = (x - r - q) / 60.0;
            prop_assert!((hits[0].fraction - expected).abs() < 1e-3);
        }

        #[test]
        fn distance_hits_are_sorted(xs in proptest::collection::vec(-20.0_f32..20.0, 1..12)) {
            let bodies = xs.iter().enumerate().map(|(i, &x)| sphere_at(i as u64, x, 0.5)).collect();
            let world = World::new(bodies);
            let hits = world.calculate_distance(&DistanceInput::new(Shape::sphere(0.5), Vec3::ZERO, 100.0));
            prop_assert_eq!(hits.len(), xs.len());
            for pair in hits.windows(2) {
                prop_assert!(pair[0].distance <= pair[1].distance);
            }
        }
    }
}
