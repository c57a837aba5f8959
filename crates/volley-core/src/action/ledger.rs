//! Per-action hit ledger and interval gate.
//!
//! The ledger remembers, per target, when the action last counted a hit
//! and the running total it has dealt. With a positive interval a target
//! inside the collider is counted once per elapsed interval, measured on
//! the action's own clock:
//!
//! ```
//! use volley_core::action::HitLedger;
//! use volley_core::entity::EntityId;
//! use volley_core::time::Time;
//!
//! let mut ledger = HitLedger::default();
//! let target = EntityId::new(9);
//! let interval = Time::from_millis(200);
//!
//! assert_eq!(ledger.record(target, Time::from_millis(100), interval, 5.0).count, 1);
//! assert_eq!(ledger.record(target, Time::from_millis(250), interval, 5.0).count, 0);
//! assert_eq!(ledger.record(target, Time::from_millis(300), interval, 5.0).count, 1);
//! assert_eq!(ledger.total(target), 10.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::time::Time;

/// One target's row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Target entity
    pub target: EntityId,
    /// Running total of `value * count`
    pub hit: f32,
    /// Action-clock time of the last counted boundary
    pub elapsed: Time,
    /// Amount added by the most recent counted hit
    pub delta: f32,
}

/// Result of one gate check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerHit {
    /// Counted repetitions; zero means the hit is gated out
    pub count: u32,
    /// Running total after this hit
    pub total: f32,
    /// Amount this hit added
    pub delta: f32,
}

/// Append-only per-target hit record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitLedger {
    entries: Vec<LedgerEntry>,
}

impl HitLedger {
    /// Gate a hit on `target` at action time `elapsed`.
    ///
    /// A first hit always counts once. After that, `interval <= 0` never
    /// counts again; a positive interval counts
    /// `floor((elapsed - last) / interval)` and moves `last` forward by that
    /// many intervals. An `elapsed` before `last` counts zero.
    pub fn record(&mut self, target: EntityId, elapsed: Time, interval: Time, value: f32) -> LedgerHit {
        let Some(entry) = self.entries.iter_mut().find(|e| e.target == target) else {
            self.entries.push(LedgerEntry {
                target,
                hit: value,
                elapsed,
                delta: value,
            });
            return LedgerHit {
                count: 1,
                total: value,
                delta: value,
            };
        };

        let gated = LedgerHit {
            count: 0,
            total: entry.hit,
            delta: 0.0,
        };
        if !interval.is_positive() || elapsed < entry.elapsed {
            return gated;
        }

        let count = (elapsed - entry.elapsed) / interval;
        if count <= 0 {
            return gated;
        }
        let count = u32::try_from(count).unwrap_or(u32::MAX);

        entry.elapsed += interval * i64::from(count);
        #[allow(clippy::cast_precision_loss)]
        let delta = value * count as f32;
        entry.delta = delta;
        entry.hit += delta;

        LedgerHit {
            count,
            total: entry.hit,
            delta,
        }
    }

    /// Running total for `target`, zero if never hit.
    #[must_use]
    pub fn total(&self, target: EntityId) -> f32 {
        self.get(target).map_or(0.0, |e| e.hit)
    }

    /// Row for `target`.
    #[must_use]
    pub fn get(&self, target: EntityId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.target == target)
    }

    /// Whether `target` has been counted.
    #[must_use]
    pub fn contains(&self, target: EntityId) -> bool {
        self.get(target).is_some()
    }

    /// All rows in first-hit order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Number of distinct targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was hit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every row.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
