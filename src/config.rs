//! Global configuration constants and the validated world configuration.

use std::error::Error;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Default gravity vector (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default fixed simulation step (in seconds).
pub const DEFAULT_FIXED_STEP: f64 = 1.0 / 60.0;

/// Largest wall-clock delta a single `advance` call will consume (in seconds).
pub const DEFAULT_MAX_FRAME_DELTA: f64 = 0.1;

/// Linear damping given to every solver body.
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.02;

/// Angular damping given to every solver body.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.02;

/// Construction parameters for a [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Size of one fixed tick in seconds.
    pub fixed_step: f64,
    /// Upper bound on the delta consumed by one `advance` call.
    pub max_frame_delta: f64,
    /// Gravity handed to backends that simulate it.
    pub gravity: Vec3,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            fixed_step: DEFAULT_FIXED_STEP,
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
        }
    }
}

impl WorldConfig {
    pub fn with_fixed_step(mut self, fixed_step: f64) -> Self {
        self.fixed_step = fixed_step;
        self
    }

    pub fn with_max_frame_delta(mut self, max_frame_delta: f64) -> Self {
        self.max_frame_delta = max_frame_delta;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Checks the timing invariants the fixed-step loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_step.is_finite() || self.fixed_step <= 0.0 {
            return Err(ConfigError::InvalidFixedStep {
                value: self.fixed_step,
            });
        }
        if !self.max_frame_delta.is_finite() || self.max_frame_delta <= 0.0 {
            return Err(ConfigError::InvalidFrameClamp {
                value: self.max_frame_delta,
            });
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::NonFiniteGravity);
        }
        Ok(())
    }
}

/// Errors detected by [`WorldConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// `fixed_step` is NaN, infinite, zero, or negative.
    InvalidFixedStep { value: f64 },
    /// `max_frame_delta` is NaN, infinite, zero, or negative.
    InvalidFrameClamp { value: f64 },
    /// A gravity component is NaN or infinite.
    NonFiniteGravity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFixedStep { value } => {
                write!(f, "fixed_step must be finite and positive, got {value}")
            }
            Self::InvalidFrameClamp { value } => {
                write!(f, "max_frame_delta must be finite and positive, got {value}")
            }
            Self::NonFiniteGravity => write!(f, "gravity must be finite"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(WorldConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_step() {
        let config = WorldConfig::default().with_fixed_step(0.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidFixedStep { value: 0.0 })
        );
    }

    #[test]
    fn rejects_nan_clamp() {
        let config = WorldConfig::default().with_max_frame_delta(f64::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFrameClamp { .. })
        ));
    }

    #[test]
    fn rejects_infinite_gravity() {
        let config = WorldConfig::default().with_gravity(Vec3::new(0.0, f32::INFINITY, 0.0));
        assert_eq!(config.validate(), Err(ConfigError::NonFiniteGravity));
    }
}
