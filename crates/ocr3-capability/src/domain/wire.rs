//! Round payloads exchanged with the consensus driver.
//!
//! The driver treats these as opaque bytes; they are serialized with
//! `serde_json` so the same structures can be inspected in logs.

use super::{CapabilityError, CapabilityResult, ConsensusResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Index of an oracle within the DON.
pub type OracleId = u8;

/// Correlates a round entry back to the original caller.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId {
    pub workflow_execution_id: String,
    pub workflow_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub ids: Vec<RequestId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestObservation {
    pub id: RequestId,
    pub observations: Vec<Value>,
}

/// One node's observation payload for a round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Observations {
    pub observations: Vec<RequestObservation>,
}

/// Result of folding one round of observations into a workflow's state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationOutcome {
    pub encodable_outcome: Value,
    /// Aggregator-private running state.
    #[serde(default)]
    pub metadata: Vec<u8>,
    pub should_report: bool,
}

impl AggregationOutcome {
    /// The encodable outcome with the workflow identifiers appended.
    pub fn with_workflow_ids(&self, id: &RequestId) -> Value {
        let mut fields = match &self.encodable_outcome {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        fields.insert("workflow_id".to_string(), json!(id.workflow_id));
        fields.insert(
            "workflow_execution_id".to_string(),
            json!(id.workflow_execution_id),
        );
        Value::Object(fields)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub id: RequestId,
    pub outcome: AggregationOutcome,
}

/// Round outcome, carried into the next round as `previous_outcome`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Running aggregation state, keyed by workflow id.
    #[serde(default)]
    pub outcomes: BTreeMap<String, AggregationOutcome>,
    /// Executions resolved by the current round that must be reported.
    #[serde(default)]
    pub reports_to_generate: Vec<ReportRequest>,
}

impl Outcome {
    /// Decode a previous outcome; the first round has none.
    pub fn decode_previous(bytes: &[u8]) -> CapabilityResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        decode("outcome", bytes)
    }
}

/// Info attached to every report so the transmitter can find the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInfo {
    pub id: RequestId,
    pub should_report: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportWithInfo {
    pub report: Vec<u8>,
    pub info: Vec<u8>,
}

impl ReportWithInfo {
    pub fn report_info(&self) -> CapabilityResult<ReportInfo> {
        decode("report info", &self.info)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributedObservation {
    pub observation: Vec<u8>,
    pub observer: OracleId,
}

/// Driver-supplied round context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutcomeContext {
    pub seq_nr: u64,
    pub previous_outcome: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedSignature {
    pub signer: OracleId,
    pub signature: Vec<u8>,
}

/// Inputs of a `"transmit"` execute call built by the contract transmitter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransmitPayload {
    /// Hex-encoded report, `None` when the round had nothing to report.
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub signatures: Vec<AttributedSignature>,
    #[serde(default)]
    pub config_digest: String,
    #[serde(default)]
    pub seq_nr: u64,
    #[serde(default)]
    pub err: Option<String>,
}

impl TransmitPayload {
    pub fn into_response(
        self,
        workflow_execution_id: String,
    ) -> CapabilityResult<ConsensusResponse> {
        let report = match &self.report {
            Some(encoded) => {
                hex::decode(encoded).map_err(|e| CapabilityError::decode("transmit report", e))?
            }
            None => Vec::new(),
        };
        Ok(ConsensusResponse {
            workflow_execution_id,
            value: report_value(&report, &self.signatures),
            err: self.err,
        })
    }
}

/// Number of observations the driver must collect before `outcome`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quorum {
    FPlusOne,
    TwoFPlusOne,
}

impl Quorum {
    /// Observers required for a DON tolerating `f` faults.
    pub fn threshold(&self, f: usize) -> usize {
        match self {
            Quorum::FPlusOne => f + 1,
            Quorum::TwoFPlusOne => 2 * f + 1,
        }
    }
}

/// Value handed to the caller for a finalized report.
///
/// An empty report means the round agreed there was nothing to report.
pub fn report_value(report: &[u8], signatures: &[AttributedSignature]) -> Option<Value> {
    if report.is_empty() {
        return None;
    }
    Some(json!({
        "report": hex::encode(report),
        "signatures": signatures,
    }))
}

pub fn encode<T: Serialize>(what: &'static str, value: &T) -> CapabilityResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| CapabilityError::Encoding(format!("{}: {}", what, e)))
}

pub fn decode<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> CapabilityResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CapabilityError::decode(what, e))
}
