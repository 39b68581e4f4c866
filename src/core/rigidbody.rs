use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{collider::ColliderDesc, types::{ComponentId, Transform}};
use crate::{
    backend::{BodyStatus, LockedAxes, SolverBodyDesc},
    error::PhysicsError,
    utils::allocator::{BodyId, ColliderId, SolverBodyHandle},
};

/// Authored rigid body kind. Serialized by name; parsing goes through [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum RigidBodyKind {
    Dynamic,
    Kinematic,
    Fixed,
    Player,
    DynamicPlayer,
}

impl RigidBodyKind {
    pub const ALL: [RigidBodyKind; 5] = [
        RigidBodyKind::Dynamic,
        RigidBodyKind::Kinematic,
        RigidBodyKind::Fixed,
        RigidBodyKind::Player,
        RigidBodyKind::DynamicPlayer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RigidBodyKind::Dynamic => "DYNAMIC",
            RigidBodyKind::Kinematic => "KINEMATIC",
            RigidBodyKind::Fixed => "FIXED",
            RigidBodyKind::Player => "PLAYER",
            RigidBodyKind::DynamicPlayer => "DYNAMIC_PLAYER",
        }
    }

    /// Solver treatment and sync behaviour of this kind, resolved once at creation.
    pub const fn profile(self) -> BodyProfile {
        match self {
            RigidBodyKind::Kinematic | RigidBodyKind::Player => BodyProfile {
                status: BodyStatus::KinematicPositionBased,
                ccd_enabled: true,
                can_sleep: true,
                auto_sync: true,
                externally_driven: true,
            },
            RigidBodyKind::DynamicPlayer => BodyProfile {
                status: BodyStatus::Dynamic,
                ccd_enabled: true,
                can_sleep: false,
                auto_sync: false,
                externally_driven: true,
            },
            RigidBodyKind::Dynamic => BodyProfile {
                status: BodyStatus::Dynamic,
                ccd_enabled: true,
                can_sleep: false,
                auto_sync: false,
                externally_driven: false,
            },
            RigidBodyKind::Fixed => BodyProfile {
                status: BodyStatus::Fixed,
                ccd_enabled: false,
                can_sleep: true,
                auto_sync: false,
                externally_driven: false,
            },
        }
    }
}

impl fmt::Display for RigidBodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RigidBodyKind {
    type Error = PhysicsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RigidBodyKind> for &'static str {
    fn from(kind: RigidBodyKind) -> Self {
        kind.as_str()
    }
}

impl FromStr for RigidBodyKind {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RigidBodyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                log::warn!("unknown rigid body kind {s:?}; no body will be created");
                PhysicsError::UnknownBodyKind(s.to_owned())
            })
    }
}

/// Per-kind behaviour table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyProfile {
    pub status: BodyStatus,
    pub ccd_enabled: bool,
    pub can_sleep: bool,
    /// Default for copying the scene transform into the solver before each step.
    pub auto_sync: bool,
    /// Pose is driven by a script or player rather than the solver's dynamics.
    pub externally_driven: bool,
}

impl BodyProfile {
    pub fn solver_desc(&self, transform: Transform) -> SolverBodyDesc {
        SolverBodyDesc {
            status: self.status,
            ccd_enabled: self.ccd_enabled,
            can_sleep: self.can_sleep,
            transform,
        }
    }

    /// Bodies whose solver pose is copied back into the scene after each step.
    pub fn writes_back(&self) -> bool {
        self.status == BodyStatus::Dynamic
    }
}

/// Declarative rigid body data as authored on a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyDesc {
    pub kind: RigidBodyKind,
    /// Overrides the kind's default scene→solver sync.
    #[serde(default)]
    pub auto_sync: Option<bool>,
    #[serde(default)]
    pub interpolate: bool,
    #[serde(default)]
    pub locked_axes: LockedAxes,
    #[serde(default)]
    pub colliders: Vec<ColliderDesc>,
}

impl RigidBodyDesc {
    pub fn new(kind: RigidBodyKind) -> Self {
        Self {
            kind,
            auto_sync: None,
            interpolate: false,
            locked_axes: LockedAxes::default(),
            colliders: Vec::new(),
        }
    }

    /// Parses the kind from its authored name; unknown names are a hard error.
    pub fn from_kind_name(kind: &str) -> Result<Self, PhysicsError> {
        kind.parse().map(Self::new)
    }

    pub fn dynamic() -> Self {
        Self::new(RigidBodyKind::Dynamic)
    }

    pub fn kinematic() -> Self {
        Self::new(RigidBodyKind::Kinematic)
    }

    pub fn fixed() -> Self {
        Self::new(RigidBodyKind::Fixed)
    }

    pub fn with_collider(mut self, collider: ColliderDesc) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = Some(auto_sync);
        self
    }

    pub fn with_interpolation(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }

    pub fn with_locked_axes(mut self, locked_axes: LockedAxes) -> Self {
        self.locked_axes = locked_axes;
        self
    }
}

/// Live rigid body owned by the world.
#[derive(Debug, Clone)]
pub struct RigidBody {
    id: BodyId,
    handle: SolverBodyHandle,
    component: ComponentId,
    kind: RigidBodyKind,
    profile: BodyProfile,
    auto_sync: bool,
    interpolate: bool,
    locked_axes: LockedAxes,
    previous: Transform,
    current: Transform,
    pub(crate) colliders: Vec<ColliderId>,
}

impl RigidBody {
    pub(crate) fn new(
        id: BodyId,
        handle: SolverBodyHandle,
        component: ComponentId,
        desc: &RigidBodyDesc,
        transform: Transform,
    ) -> Self {
        let profile = desc.kind.profile();
        Self {
            id,
            handle,
            component,
            kind: desc.kind,
            profile,
            auto_sync: desc.auto_sync.unwrap_or(profile.auto_sync),
            interpolate: desc.interpolate,
            locked_axes: LockedAxes::default(),
            previous: transform,
            current: transform,
            colliders: Vec::new(),
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn handle(&self) -> SolverBodyHandle {
        self.handle
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn kind(&self) -> RigidBodyKind {
        self.kind
    }

    pub fn profile(&self) -> &BodyProfile {
        &self.profile
    }

    pub fn auto_sync(&self) -> bool {
        self.auto_sync
    }

    pub fn set_auto_sync(&mut self, auto_sync: bool) {
        self.auto_sync = auto_sync;
    }

    pub fn interpolate(&self) -> bool {
        self.interpolate
    }

    pub fn locked_axes(&self) -> LockedAxes {
        self.locked_axes
    }

    pub(crate) fn set_locked_axes(&mut self, locked_axes: LockedAxes) {
        self.locked_axes = locked_axes;
    }

    /// Kinematic and player bodies, whose pose comes from a script or the player.
    pub fn is_externally_driven(&self) -> bool {
        self.profile.externally_driven
    }

    pub fn colliders(&self) -> &[ColliderId] {
        &self.colliders
    }

    /// Pose before the most recent fixed tick.
    pub fn previous_transform(&self) -> Transform {
        self.previous
    }

    /// Pose after the most recent fixed tick.
    pub fn current_transform(&self) -> Transform {
        self.current
    }

    /// Rolls the snapshots forward with the pose produced by a fixed tick.
    pub(crate) fn push_transform(&mut self, transform: Transform) {
        self.previous = self.current;
        self.current = transform;
    }

    /// Resets both snapshots so the next blend does not sweep from a stale pose.
    pub(crate) fn reset_transform(&mut self, transform: Transform) {
        self.previous = transform;
        self.current = transform;
    }

    /// Render pose `alpha` of the way from the previous to the current snapshot.
    pub fn interpolated_transform(&self, alpha: f32) -> Transform {
        self.previous.interpolate(&self.current, alpha)
    }
}
