//! Driving ports (Inbound API)
//!
//! Two callers drive this crate: the workflow runtime, through
//! [`CallbackCapability`], and the consensus driver, through
//! [`ReportingPlugin`].

use crate::domain::{
    AttributedObservation, CapabilityInfo, CapabilityRequest, CapabilityResult, OutcomeContext,
    Quorum, RegistrationRequest, ResponsePromise, ReportWithInfo,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Capability API consumed by the workflow runtime
#[async_trait]
pub trait CallbackCapability: Send + Sync {
    fn info(&self) -> CapabilityInfo;

    /// Submit a request. Returns once the request is accepted; the result
    /// arrives exactly once on `callback`.
    async fn execute(
        &self,
        ctx: CancellationToken,
        callback: ResponsePromise,
        request: CapabilityRequest,
    ) -> CapabilityResult<()>;

    async fn register_to_workflow(&self, request: RegistrationRequest) -> CapabilityResult<()>;

    async fn unregister_from_workflow(&self, request: RegistrationRequest)
        -> CapabilityResult<()>;
}

/// Round contract invoked by the BFT consensus driver
///
/// Every method may run concurrently with `execute` and with request expiry.
#[async_trait]
pub trait ReportingPlugin: Send + Sync {
    /// Leader only. Selects the batch of executions for this round.
    async fn query(&self, outctx: &OutcomeContext) -> CapabilityResult<Vec<u8>>;

    /// This node's observations for the queried executions.
    async fn observation(&self, outctx: &OutcomeContext, query: &[u8])
        -> CapabilityResult<Vec<u8>>;

    async fn validate_observation(
        &self,
        outctx: &OutcomeContext,
        query: &[u8],
        ao: &AttributedObservation,
    ) -> CapabilityResult<()>;

    async fn observation_quorum(
        &self,
        outctx: &OutcomeContext,
        query: &[u8],
    ) -> CapabilityResult<Quorum>;

    /// Fold attributed observations into the running outcome.
    async fn outcome(
        &self,
        outctx: &OutcomeContext,
        query: &[u8],
        aos: &[AttributedObservation],
    ) -> CapabilityResult<Vec<u8>>;

    async fn reports(&self, seq_nr: u64, outcome: &[u8])
        -> CapabilityResult<Vec<ReportWithInfo>>;

    async fn should_accept_attested_report(
        &self,
        seq_nr: u64,
        report: &ReportWithInfo,
    ) -> CapabilityResult<bool>;

    async fn should_transmit_accepted_report(
        &self,
        seq_nr: u64,
        report: &ReportWithInfo,
    ) -> CapabilityResult<bool>;

    async fn close(&self) -> CapabilityResult<()>;
}
