//! Layer-based collision filtering.

use serde::{Deserialize, Serialize};

/// Membership and mask bits deciding which bodies a query may touch.
///
/// Two filters collide when each one's `belongs_to` intersects the other's
/// `collides_with`.
///
/// # Example
///
/// ```
/// use sweep::CollisionFilter;
///
/// let actors = CollisionFilter::new(0b01, u32::MAX);
/// let walls = CollisionFilter::new(0b10, u32::MAX);
/// let query = CollisionFilter::new(u32::MAX, 0b01);
///
/// assert!(query.can_collide(&actors));
/// assert!(!query.can_collide(&walls));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionFilter {
    /// Layers this filter is a member of
    pub belongs_to: u32,
    /// Layers this filter accepts contacts with
    pub collides_with: u32,
}

impl CollisionFilter {
    /// Member of every layer, collides with every layer.
    pub const DEFAULT: Self = Self {
        belongs_to: u32::MAX,
        collides_with: u32::MAX,
    };

    /// Collides with nothing.
    pub const NOTHING: Self = Self {
        belongs_to: 0,
        collides_with: 0,
    };

    /// Create a new filter.
    #[must_use]
    pub const fn new(belongs_to: u32, collides_with: u32) -> Self {
        Self {
            belongs_to,
            collides_with,
        }
    }

    /// A query filter restricted to the given layer mask.
    #[must_use]
    pub const fn query(mask: u32) -> Self {
        Self {
            belongs_to: u32::MAX,
            collides_with: mask,
        }
    }

    /// Check whether two filters accept each other.
    #[must_use]
    pub const fn can_collide(&self, other: &Self) -> bool {
        (self.belongs_to & other.collides_with) != 0 && (self.collides_with & other.belongs_to) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}
