//! In-memory capability registry adapter

use crate::domain::{CapabilityError, CapabilityResult};
use crate::ports::{CallbackCapability, CapabilityRegistry};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Capabilities resolved by id, held in process.
#[derive(Default)]
pub struct InMemoryCapabilityRegistry {
    capabilities: RwLock<HashMap<String, Arc<dyn CallbackCapability>>>,
}

impl InMemoryCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, capability: Arc<dyn CallbackCapability>) {
        let id = capability.info().id;
        self.capabilities.write().insert(id, capability);
    }

    pub fn remove(&self, id: &str) -> bool {
        self.capabilities.write().remove(id).is_some()
    }
}

#[async_trait]
impl CapabilityRegistry for InMemoryCapabilityRegistry {
    async fn get(&self, id: &str) -> CapabilityResult<Arc<dyn CallbackCapability>> {
        self.capabilities
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CapabilityError::Registry(format!("capability {} not found", id)))
    }
}
