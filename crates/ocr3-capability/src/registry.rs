//! Per-workflow aggregator/encoder registry.
//!
//! Owned by the capability and handed to the reporting plugin as an
//! [`AggregatorRegistry`]. Lookups return `Arc` snapshots taken under the
//! read lock, so an unregistration racing an in-progress `outcome` or
//! `reports` call only affects lookups made after it.

use crate::adapters::aggregators::new_aggregator;
use crate::adapters::encoders::new_encoder;
use crate::domain::{CapabilityError, CapabilityResult, WorkflowConfig};
use crate::ports::{Aggregator, AggregatorRegistry, Encoder};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct Registration {
    aggregator: Arc<dyn Aggregator>,
    encoder: Arc<dyn Encoder>,
}

#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<String, Registration>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and store the aggregator and encoder named by `config`.
    ///
    /// Re-registering a workflow replaces its previous entry.
    pub fn register(&self, workflow_id: &str, config: &WorkflowConfig) -> CapabilityResult<()> {
        let aggregator = new_aggregator(&config.aggregation_method, &config.aggregation_config)?;
        let encoder = new_encoder(&config.encoder, &config.encoder_config)?;
        self.insert(workflow_id, aggregator, encoder);
        info!(
            workflow_id,
            aggregation_method = %config.aggregation_method,
            encoder = %config.encoder,
            "Registered workflow"
        );
        Ok(())
    }

    /// Register pre-built strategies directly.
    pub fn insert(
        &self,
        workflow_id: &str,
        aggregator: Arc<dyn Aggregator>,
        encoder: Arc<dyn Encoder>,
    ) {
        self.workflows.write().insert(
            workflow_id.to_string(),
            Registration {
                aggregator,
                encoder,
            },
        );
    }

    /// Idempotent removal; returns whether the workflow was registered.
    pub fn unregister(&self, workflow_id: &str) -> bool {
        self.workflows.write().remove(workflow_id).is_some()
    }

    pub fn contains(&self, workflow_id: &str) -> bool {
        self.workflows.read().contains_key(workflow_id)
    }

    fn lookup(&self, workflow_id: &str) -> CapabilityResult<Registration> {
        self.workflows.read().get(workflow_id).cloned().ok_or_else(|| {
            CapabilityError::NotFound(format!(
                "no aggregator registered for workflow {}",
                workflow_id
            ))
        })
    }
}

impl AggregatorRegistry for WorkflowRegistry {
    fn get_aggregator(&self, workflow_id: &str) -> CapabilityResult<Arc<dyn Aggregator>> {
        self.lookup(workflow_id).map(|r| r.aggregator)
    }

    fn get_encoder(&self, workflow_id: &str) -> CapabilityResult<Arc<dyn Encoder>> {
        self.lookup(workflow_id).map(|r| r.encoder)
    }
}
