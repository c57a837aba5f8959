//! Fixed-point simulation time.
//!
//! [`Time`] counts whole microseconds in an `i64`. Deadlines, elapsed times
//! and hit intervals are all integer arithmetic, so a 0.1 s window plus a
//! 0.2 s interval lands exactly on 0.3 s on every platform.
//!
//! Authored data and snapshots serialize `Time` as seconds (`f64`).

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Microseconds per second.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Simulation time or duration in microseconds.
///
/// # Example
///
/// ```
/// use volley_core::time::Time;
///
/// let damage_time = Time::from_secs_f64(0.1);
/// let interval = Time::from_millis(200);
/// assert_eq!(damage_time + interval, Time::from_millis(300));
/// assert_eq!((Time::from_millis(500) - damage_time) / interval, 2);
/// ```
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Time(i64);

impl Time {
    /// Zero time.
    pub const ZERO: Self = Self(0);

    /// Largest representable time.
    pub const MAX: Self = Self(i64::MAX);

    /// Create from microseconds.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Create from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * 1_000)
    }

    /// Create from seconds, rounded to the nearest microsecond.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * MICROS_PER_SECOND as f64).round() as i64)
    }

    /// Create from seconds, rounded to the nearest microsecond.
    #[must_use]
    pub fn from_secs_f32(secs: f32) -> Self {
        Self::from_secs_f64(f64::from(secs))
    }

    /// Raw microseconds.
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Seconds as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND as f64
    }

    /// Seconds as `f32`, for physics math.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_secs_f32(self) -> f32 {
        self.as_secs_f64() as f32
    }

    /// Whether this is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Saturating subtraction clamped at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        let d = self.0.saturating_sub(other.0);
        if d < 0 {
            Self(0)
        } else {
            Self(d)
        }
    }

    /// Time at `tick` for a fixed tick length.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn at_tick(tick: u64, tick_length: Self) -> Self {
        Self((tick as i64).saturating_mul(tick_length.0))
    }
}

impl Add for Time {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Time {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Time {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<i64> for Time {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }
}

/// Number of whole `rhs` periods in `self` (floor division).
impl std::ops::Div for Time {
    type Output = i64;

    fn div(self, rhs: Self) -> i64 {
        debug_assert!(rhs.0 != 0, "division by zero-length Time");
        if rhs.0 == 0 {
            return 0;
        }
        self.0.div_euclid(rhs.0)
    }
}

impl From<f64> for Time {
    fn from(secs: f64) -> Self {
        Self::from_secs_f64(secs)
    }
}

impl From<Time> for f64 {
    fn from(time: Time) -> Self {
        time.as_secs_f64()
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({}us)", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}
