//! Action status lattice.
//!
//! Flags only accumulate. Each flag requires another to already be present:
//!
//! | Flag        | Requires  |
//! |-------------|-----------|
//! | `CREATED`   | –         |
//! | `PERFORM`   | `CREATED` |
//! | `DAMAGE`    | `PERFORM` |
//! | `DAMAGED`   | `DAMAGE`  |
//! | `DESTROIED` | `CREATED` |
//! | `DESTROY`   | `CREATED` |
//! | `BREAK`     | `DESTROY` |
//! | `MANAGED`   | –         |
//!
//! `MANAGED` belongs to the presentation layer and is the only flag that may
//! also be cleared.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Lifecycle flags of an action instance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ActionStatus: u32 {
        /// First advance has run
        const CREATED = 1 << 0;
        /// Perform time reached
        const PERFORM = 1 << 1;
        /// Damage window has opened
        const DAMAGE = 1 << 2;
        /// At least one damage output emitted
        const DAMAGED = 1 << 3;
        /// Lifetime ran out
        const DESTROIED = 1 << 4;
        /// Marked for removal
        const DESTROY = 1 << 5;
        /// Kept alive by the presentation layer
        const MANAGED = 1 << 6;
        /// Cancelled by a break
        const BREAK = 1 << 7;
    }
}

impl ActionStatus {
    /// The flag that must be present before `flag` may be set.
    #[must_use]
    pub fn prerequisite(flag: Self) -> Self {
        match flag {
            f if f == Self::PERFORM || f == Self::DESTROIED || f == Self::DESTROY => Self::CREATED,
            f if f == Self::DAMAGE => Self::PERFORM,
            f if f == Self::DAMAGED => Self::DAMAGE,
            f if f == Self::BREAK => Self::DESTROY,
            _ => Self::empty(),
        }
    }

    /// Set `flag` if its prerequisite holds. Returns whether it is now set.
    pub fn advance(&mut self, flag: Self) -> bool {
        if self.contains(flag) {
            return true;
        }
        let required = Self::prerequisite(flag);
        if !self.contains(required) {
            #[cfg(debug_assertions)]
            panic!("status {flag:?} requires {required:?}, have {self:?}");

            #[cfg(not(debug_assertions))]
            return false;
        }
        self.insert(flag);
        true
    }

    /// Whether cleanup should remove the action.
    #[must_use]
    pub fn is_disposable(self) -> bool {
        self.contains(Self::DESTROY) && !self.contains(Self::MANAGED)
    }
}
