use std::fmt;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Identifier of the scene component a rigid body reads its transform from and writes it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Position, orientation, and non-uniform scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builds a homogeneous matrix representation of the transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Blends position and scale linearly and rotation spherically; `alpha` is clamped to `[0, 1]`.
    pub fn interpolate(&self, next: &Transform, alpha: f32) -> Transform {
        let alpha = alpha.clamp(0.0, 1.0);
        Transform {
            position: self.position.lerp(next.position, alpha),
            rotation: self.rotation.slerp(next.rotation, alpha).normalize(),
            scale: self.scale.lerp(next.scale, alpha),
        }
    }

    /// Pose of `self` with the scale taken from `scale_source`.
    pub fn with_scale_of(&self, scale_source: &Transform) -> Transform {
        Transform {
            scale: scale_source.scale,
            ..*self
        }
    }
}

/// Linear and angular velocity of a rigid body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// Surface and bulk properties handed to the solver with each collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    /// How this material mixes its coefficients with another material.
    pub mixing: MixingMode,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            restitution: 0.1,
            friction: 0.5,
            mixing: MixingMode::default(),
        }
    }
}

impl Material {
    pub fn rubber() -> Self {
        Self {
            density: 1.4,
            restitution: 0.8,
            friction: 1.0,
            mixing: MixingMode::default(),
        }
    }

    pub fn ice() -> Self {
        Self {
            density: 0.9,
            restitution: 0.05,
            friction: 0.03,
            mixing: MixingMode::Min,
        }
    }
}

/// How a friction or restitution coefficient is mixed with the other collider's.
///
/// When two materials disagree, the rule listed last wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum MixingMode {
    #[default]
    Average,
    Min,
    Multiply,
    Max,
}

impl MixingMode {
    /// Coefficient seen by a pair whose materials use `self` and `other`.
    pub fn mix(self, other: MixingMode, a: f32, b: f32) -> f32 {
        match self.max(other) {
            MixingMode::Average => 0.5 * (a + b),
            MixingMode::Min => a.min(b),
            MixingMode::Multiply => a * b,
            MixingMode::Max => a.max(b),
        }
    }
}
