//! Request and response entities exchanged with the workflow runtime.

use super::{RequestId, ResponsePromise};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Milliseconds since the clock's epoch.
pub type Timestamp = u64;

/// Whole milliseconds of `d`, saturating at `Timestamp::MAX`.
pub fn millis(d: Duration) -> Timestamp {
    Timestamp::try_from(d.as_millis()).unwrap_or(Timestamp::MAX)
}

/// Error string delivered to callers whose request expired.
pub const TIMEOUT_EXCEEDED: &str = "timeout exceeded";

/// Workflow identity attached to every capability call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub workflow_id: String,
    pub workflow_execution_id: String,
    #[serde(default)]
    pub workflow_owner: String,
}

/// Incoming `execute` call from the workflow runtime.
///
/// `config.method` selects the route: absent or `"start"` begins a new
/// consensus round, `"transmit"` delivers a finalized report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRequest {
    pub metadata: RequestMetadata,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub inputs: Value,
}

/// The externally observable result of one consensus round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapabilityResponse {
    pub value: Option<Value>,
    pub err: Option<String>,
}

impl CapabilityResponse {
    pub fn ok(value: Value) -> Self {
        Self {
            value: Some(value),
            err: None,
        }
    }

    pub fn error(err: impl Into<String>) -> Self {
        Self {
            value: None,
            err: Some(err.into()),
        }
    }

    pub fn timeout() -> Self {
        Self::error(TIMEOUT_EXCEEDED)
    }

    pub fn is_timeout(&self) -> bool {
        self.err.as_deref() == Some(TIMEOUT_EXCEEDED)
    }
}

/// A pending consensus request, immutable once stored.
#[derive(Clone, Debug)]
pub struct Request {
    pub workflow_id: String,
    pub workflow_execution_id: String,
    pub workflow_owner: String,
    pub observations: Vec<Value>,
    pub expires_at: Timestamp,
    pub request_ctx: CancellationToken,
    pub callback: ResponsePromise,
}

impl Request {
    pub fn id(&self) -> RequestId {
        RequestId {
            workflow_execution_id: self.workflow_execution_id.clone(),
            workflow_id: self.workflow_id.clone(),
        }
    }
}

/// Finalized consensus value routed back to one execution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConsensusResponse {
    pub workflow_execution_id: String,
    pub value: Option<Value>,
    pub err: Option<String>,
}

impl From<ConsensusResponse> for CapabilityResponse {
    fn from(resp: ConsensusResponse) -> Self {
        Self {
            value: resp.value,
            err: resp.err,
        }
    }
}

/// Metadata for `register_to_workflow` / `unregister_from_workflow`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationMetadata {
    pub workflow_id: String,
    #[serde(default)]
    pub workflow_owner: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub metadata: RegistrationMetadata,
    #[serde(default)]
    pub config: Value,
}

/// Per-workflow aggregation and encoding choice, decoded at registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub aggregation_method: String,
    #[serde(default)]
    pub aggregation_config: Value,
    #[serde(default = "default_encoder")]
    pub encoder: String,
    #[serde(default)]
    pub encoder_config: Value,
}

fn default_encoder() -> String {
    "json".to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityType {
    Trigger,
    Action,
    Consensus,
    Target,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    pub id: String,
    pub capability_type: CapabilityType,
    pub description: String,
}
