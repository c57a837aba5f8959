//! Simulation configuration.
//!
//! # Example
//!
//! ```
//! use volley_core::config::SimConfig;
//! use volley_core::time::Time;
//!
//! let config = SimConfig::default()
//!     .with_tick_length(Time::from_millis(50))
//!     .with_alert_duration(Time::from_millis(500));
//!
//! assert!(config.validate().is_ok());
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::Time;

/// Default tick length (1/60 s, rounded to whole microseconds).
pub const DEFAULT_TICK_LENGTH: Time = Time::from_micros(16_667);

/// Collision layer holding actor bodies.
pub const ACTOR_LAYER: u32 = 1 << 0;

/// Collision layer holding static obstacles.
pub const OBSTACLE_LAYER: u32 = 1 << 1;

/// Layout of property vectors.
///
/// Channels `[0, hit_count)` are damage channels feeding health; channels
/// `[hit_count, count)` are torpidity channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyLayout {
    /// Total channel count
    pub count: usize,
    /// Number of leading damage channels
    pub hit_count: usize,
}

impl PropertyLayout {
    /// Create a layout.
    #[must_use]
    pub const fn new(count: usize, hit_count: usize) -> Self {
        Self { count, hit_count }
    }
}

impl Default for PropertyLayout {
    fn default() -> Self {
        // physical, fire, frost | stagger
        Self::new(4, 3)
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed tick length
    pub tick_length: Time,
    /// Gravity acceleration (m/s²)
    pub gravity: Vec3,
    /// Poise window after a break during which further breaks are ignored
    pub alert_duration: Time,
    /// Rage gained by an attacker per point of damage dealt
    pub rage_per_damage_dealt: f32,
    /// Rage gained by a target per point of damage taken
    pub rage_per_damage_taken: f32,
    /// Property vector layout
    pub property_layout: PropertyLayout,
    /// Fraction of actor velocity removed per second
    pub knockback_damping: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_length: DEFAULT_TICK_LENGTH,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            alert_duration: Time::from_millis(800),
            rage_per_damage_dealt: 0.1,
            rage_per_damage_taken: 0.05,
            property_layout: PropertyLayout::default(),
            knockback_damping: 4.0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for unusable values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_length.is_positive() {
            return Err(ConfigError::Invalid {
                field: "tick_length",
                reason: format!("must be positive, got {}", self.tick_length),
            });
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::Invalid {
                field: "gravity",
                reason: "must be finite".to_string(),
            });
        }
        if self.property_layout.hit_count > self.property_layout.count {
            return Err(ConfigError::Invalid {
                field: "property_layout",
                reason: format!(
                    "hit_count {} exceeds count {}",
                    self.property_layout.hit_count, self.property_layout.count
                ),
            });
        }
        if self.knockback_damping < 0.0 || !self.knockback_damping.is_finite() {
            return Err(ConfigError::Invalid {
                field: "knockback_damping",
                reason: format!("must be a non-negative number, got {}", self.knockback_damping),
            });
        }
        Ok(())
    }

    /// Set the tick length.
    #[must_use]
    pub fn with_tick_length(mut self, tick_length: Time) -> Self {
        self.tick_length = tick_length;
        self
    }

    /// Set gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the break alert window.
    #[must_use]
    pub fn with_alert_duration(mut self, alert_duration: Time) -> Self {
        self.alert_duration = alert_duration;
        self
    }

    /// Set rage gains for dealing and taking damage.
    #[must_use]
    pub fn with_rage_gains(mut self, dealt: f32, taken: f32) -> Self {
        self.rage_per_damage_dealt = dealt;
        self.rage_per_damage_taken = taken;
        self
    }

    /// Set the property layout.
    #[must_use]
    pub fn with_property_layout(mut self, layout: PropertyLayout) -> Self {
        self.property_layout = layout;
        self
    }

    /// Set knockback damping.
    #[must_use]
    pub fn with_knockback_damping(mut self, damping: f32) -> Self {
        self.knockback_damping = damping;
        self
    }

    /// Unit vector along gravity, or `-Y` when gravity is zero.
    #[must_use]
    pub fn gravity_axis(&self) -> Vec3 {
        self.gravity.try_normalize().unwrap_or(Vec3::NEG_Y)
    }
}
