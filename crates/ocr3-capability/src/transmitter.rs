//! Contract transmitter
//!
//! Closes the loop for signed reports: instead of writing to a chain, a
//! finalized report is handed back to the consensus capability as a
//! `"transmit"` execute call, which routes it to the waiting caller.

use crate::domain::{
    AttributedSignature, CapabilityError, CapabilityRequest, CapabilityResult, ReportWithInfo,
    RequestMetadata, ResponsePromise, TransmitPayload,
};
use crate::ports::CapabilityRegistry;
use crate::service::METHOD_TRANSMIT;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub struct ContractTransmitter {
    capability_id: String,
    registry: Arc<dyn CapabilityRegistry>,
    from_account: String,
}

impl ContractTransmitter {
    pub fn new(
        capability_id: impl Into<String>,
        registry: Arc<dyn CapabilityRegistry>,
        from_account: impl Into<String>,
    ) -> Self {
        Self {
            capability_id: capability_id.into(),
            registry,
            from_account: from_account.into(),
        }
    }

    /// Account reports are attributed to.
    pub fn from_account(&self) -> &str {
        &self.from_account
    }

    /// Hand one signed report to the capability.
    ///
    /// # Errors
    /// - `Decode` if the report info is unreadable
    /// - `Registry` if the capability cannot be resolved
    /// - whatever the capability's `execute` returns; there is no retry
    pub async fn transmit(
        &self,
        config_digest: [u8; 32],
        seq_nr: u64,
        report: ReportWithInfo,
        signatures: Vec<AttributedSignature>,
    ) -> CapabilityResult<()> {
        let info = report.report_info()?;

        let payload = TransmitPayload {
            report: (info.should_report && !report.report.is_empty())
                .then(|| hex::encode(&report.report)),
            signatures,
            config_digest: hex::encode(config_digest),
            seq_nr,
            err: None,
        };
        let inputs = serde_json::to_value(&payload)
            .map_err(|e| CapabilityError::Encoding(format!("transmit inputs: {}", e)))?;

        let request = CapabilityRequest {
            metadata: RequestMetadata {
                workflow_id: info.id.workflow_id.clone(),
                workflow_execution_id: info.id.workflow_execution_id.clone(),
                workflow_owner: String::new(),
            },
            config: json!({ "method": METHOD_TRANSMIT }),
            inputs,
        };

        let capability = self.registry.get(&self.capability_id).await.map_err(|e| {
            error!(capability = %self.capability_id, error = %e, "Capability lookup failed");
            e
        })?;

        // The acknowledgement carries nothing execute does not already return.
        let (ack, _ack_future) = ResponsePromise::new();
        if let Err(e) = capability
            .execute(CancellationToken::new(), ack, request)
            .await
        {
            error!(
                seq_nr,
                workflow_execution_id = %info.id.workflow_execution_id,
                error = %e,
                "Failed to transmit report"
            );
            return Err(e);
        }

        debug!(
            seq_nr,
            workflow_execution_id = %info.id.workflow_execution_id,
            should_report = info.should_report,
            "Transmitted report"
        );
        Ok(())
    }
}
