//! Transform exchange between the scene graph and the solver.

use super::PhysicsWorld;
use crate::{backend::PhysicsBackend, scene::SceneGraph};

impl<B: PhysicsBackend> PhysicsWorld<B> {
    /// Copies scene poses of auto-synced bodies into the solver.
    pub(super) fn sync_in(&mut self, scene: &dyn SceneGraph) {
        for body in self.bodies.values_mut() {
            if !body.auto_sync() {
                continue;
            }
            let Some(transform) = scene.world_transform(body.component()) else {
                log::trace!("{} has no scene transform; sync skipped", body.component());
                continue;
            };
            self.backend.set_body_transform(body.handle(), &transform);
            if !body.profile().writes_back() {
                body.push_transform(transform);
            }
        }
    }

    /// Copies solver poses of dynamic bodies back into the scene.
    ///
    /// Interpolated bodies only roll their snapshots here; the blended pose is written
    /// once per `advance` by [`apply_interpolation`](Self::apply_interpolation).
    pub(super) fn sync_out(&mut self, scene: &mut dyn SceneGraph) {
        for body in self.bodies.values_mut() {
            if !body.profile().writes_back() {
                continue;
            }
            let Some(pose) = self.backend.body_transform(body.handle()) else {
                continue;
            };
            let transform = pose.with_scale_of(&body.current_transform());
            body.push_transform(transform);
            if !body.interpolate() {
                scene.set_world_transform(body.component(), transform);
            }
        }
    }

    pub(super) fn apply_interpolation(&mut self, scene: &mut dyn SceneGraph) {
        let alpha = self.alpha as f32;
        for (_, body) in self.bodies.iter() {
            if body.interpolate() && body.profile().writes_back() {
                scene.set_world_transform(body.component(), body.interpolated_transform(alpha));
            }
        }
    }
}
