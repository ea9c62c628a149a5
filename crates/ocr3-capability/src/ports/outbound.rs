//! Driven ports (Outbound dependencies)

use super::CallbackCapability;
use crate::domain::{
    AggregationOutcome, CapabilityResult, ConsensusResponse, OracleId, Timestamp,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-workflow aggregation strategy
pub trait Aggregator: Send + Sync {
    /// Fold one round of observations into the workflow's running outcome.
    ///
    /// `previous` is `None` the first time the workflow is aggregated.
    fn aggregate(
        &self,
        previous: Option<&AggregationOutcome>,
        observations: &BTreeMap<OracleId, Vec<Value>>,
    ) -> CapabilityResult<AggregationOutcome>;
}

/// Per-workflow report encoder
pub trait Encoder: Send + Sync {
    fn encode(&self, value: &Value) -> CapabilityResult<Vec<u8>>;
}

/// Lookup side of the workflow registry, as seen by the reporting plugin
pub trait AggregatorRegistry: Send + Sync {
    fn get_aggregator(&self, workflow_id: &str) -> CapabilityResult<Arc<dyn Aggregator>>;

    fn get_encoder(&self, workflow_id: &str) -> CapabilityResult<Arc<dyn Encoder>>;
}

/// Delivers a finalized consensus value to the original caller
#[async_trait]
pub trait ResponseTransmitter: Send + Sync {
    async fn transmit_response(&self, response: ConsensusResponse) -> CapabilityResult<()>;
}

/// Resolves capabilities by id for the contract transmitter
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    async fn get(&self, id: &str) -> CapabilityResult<Arc<dyn CallbackCapability>>;
}

/// Time source for request expiry.
///
/// Abstracted to allow testing with deterministic time.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;

    /// Completes once `now() >= deadline`.
    async fn sleep_until(&self, deadline: Timestamp);
}
