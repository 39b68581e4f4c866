//! Transform source and sink on the scene-graph side.

use std::collections::HashMap;

use crate::core::types::{ComponentId, Transform};

/// World-space transforms of scene components, as seen by the physics layer.
pub trait SceneGraph {
    fn world_transform(&self, component: ComponentId) -> Option<Transform>;

    fn set_world_transform(&mut self, component: ComponentId, transform: Transform);
}

/// Map-backed [`SceneGraph`] for tools, benches, and tests.
#[derive(Debug, Default, Clone)]
pub struct TransformStore {
    transforms: HashMap<ComponentId, Transform>,
}

impl TransformStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: ComponentId, transform: Transform) {
        self.transforms.insert(component, transform);
    }

    pub fn remove(&mut self, component: ComponentId) -> Option<Transform> {
        self.transforms.remove(&component)
    }

    pub fn get(&self, component: ComponentId) -> Option<&Transform> {
        self.transforms.get(&component)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl SceneGraph for TransformStore {
    fn world_transform(&self, component: ComponentId) -> Option<Transform> {
        self.transforms.get(&component).copied()
    }

    fn set_world_transform(&mut self, component: ComponentId, transform: Transform) {
        self.transforms.insert(component, transform);
    }
}
