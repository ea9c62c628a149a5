//! OCR3 Reporting Plugin - round logic
//!
//! ```text
//! query ──→ observation ──→ outcome ──→ reports ──→ should_accept_attested_report
//!  │            │              │           │                   │
//!  first_n     get_n       aggregate    encode          transmit_response
//! ```
//!
//! The plugin keeps no state of its own beyond the batch size and the DON
//! parameters: pending work lives in the shared store, the running
//! per-workflow outcome travels through the driver as `previous_outcome`.
//!
//! Per-execution failures inside `outcome` and `reports` are logged and
//! skipped; one misconfigured workflow never fails a whole round.

use crate::domain::{
    decode, encode, report_value, AggregationOutcome, AttributedObservation, CapabilityError,
    CapabilityResult, ConsensusResponse, Observations, OracleId, Outcome, OutcomeContext, Query,
    Quorum, ReportInfo, ReportRequest, ReportWithInfo, ReportingPluginConfig,
    ReportingPluginInfo, RequestId, RequestObservation, RequestStore,
};
use crate::metrics;
use crate::ports::{AggregatorRegistry, ReportingPlugin, ResponseTransmitter};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PLUGIN_NAME: &str = "OCR3 Capability Reporting Plugin";

/// Builds reporting plugins bound to one capability's store and registry.
pub struct ReportingPluginFactory {
    store: Arc<RequestStore>,
    registry: Arc<dyn AggregatorRegistry>,
    transmitter: Arc<dyn ResponseTransmitter>,
    batch_size: usize,
}

impl ReportingPluginFactory {
    pub fn new(
        store: Arc<RequestStore>,
        registry: Arc<dyn AggregatorRegistry>,
        transmitter: Arc<dyn ResponseTransmitter>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            registry,
            transmitter,
            batch_size,
        }
    }

    /// # Errors
    /// - `InvalidArgument` if the DON cannot tolerate `f` faults (`n < 3f+1`)
    pub fn new_reporting_plugin(
        &self,
        config: ReportingPluginConfig,
    ) -> CapabilityResult<(CapabilityReportingPlugin, ReportingPluginInfo)> {
        config.validate()?;
        let info = ReportingPluginInfo {
            name: PLUGIN_NAME.to_string(),
            limits: config.limits.clone(),
        };
        let plugin = CapabilityReportingPlugin {
            config,
            batch_size: self.batch_size,
            store: self.store.clone(),
            registry: self.registry.clone(),
            transmitter: self.transmitter.clone(),
        };
        Ok((plugin, info))
    }
}

pub struct CapabilityReportingPlugin {
    config: ReportingPluginConfig,
    batch_size: usize,
    store: Arc<RequestStore>,
    registry: Arc<dyn AggregatorRegistry>,
    transmitter: Arc<dyn ResponseTransmitter>,
}

impl CapabilityReportingPlugin {
    fn check_limit(what: &'static str, bytes: &[u8], limit: usize) -> CapabilityResult<()> {
        if bytes.len() > limit {
            return Err(CapabilityError::LimitExceeded {
                what,
                size: bytes.len(),
                limit,
            });
        }
        Ok(())
    }

    /// Observations grouped by execution id, then by observer.
    fn group_observations(
        aos: &[AttributedObservation],
    ) -> HashMap<String, BTreeMap<OracleId, Vec<Value>>> {
        let mut grouped: HashMap<String, BTreeMap<OracleId, Vec<Value>>> = HashMap::new();
        for ao in aos {
            let observations: Observations = match decode("observation", &ao.observation) {
                Ok(obs) => obs,
                Err(e) => {
                    warn!(observer = ao.observer, error = %e, "Dropping undecodable observation");
                    continue;
                }
            };
            for entry in observations.observations {
                grouped
                    .entry(entry.id.workflow_execution_id)
                    .or_default()
                    .insert(ao.observer, entry.observations);
            }
        }
        grouped
    }

    /// Encoded report for one execution, `None` if it has to be skipped.
    fn encode_report(&self, id: &RequestId, outcome: &AggregationOutcome) -> Option<Vec<u8>> {
        let encoder = match self.registry.get_encoder(&id.workflow_id) {
            Ok(encoder) => encoder,
            Err(e) => {
                warn!(
                    workflow_id = %id.workflow_id,
                    error = %e,
                    "No encoder registered, skipping report"
                );
                return None;
            }
        };

        let report = match encoder.encode(&outcome.with_workflow_ids(id)) {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    workflow_id = %id.workflow_id,
                    workflow_execution_id = %id.workflow_execution_id,
                    error = %e,
                    "Failed to encode report"
                );
                return None;
            }
        };
        let limit = self.config.limits.max_report_length;
        if let Err(e) = Self::check_limit("report", &report, limit) {
            warn!(workflow_execution_id = %id.workflow_execution_id, error = %e, "Dropping report");
            return None;
        }
        Some(report)
    }
}

#[async_trait]
impl ReportingPlugin for CapabilityReportingPlugin {
    async fn query(&self, outctx: &OutcomeContext) -> CapabilityResult<Vec<u8>> {
        let batch = self.store.first_n(self.batch_size)?;
        let query = Query {
            ids: batch.iter().map(|req| req.id()).collect(),
        };
        let bytes = encode("query", &query)?;
        Self::check_limit("query", &bytes, self.config.limits.max_query_length)?;

        debug!(seq_nr = outctx.seq_nr, batch = query.ids.len(), "Built query");
        Ok(bytes)
    }

    async fn observation(
        &self,
        outctx: &OutcomeContext,
        query: &[u8],
    ) -> CapabilityResult<Vec<u8>> {
        let query: Query = decode("query", query)?;
        let ids: Vec<&str> = query
            .ids
            .iter()
            .map(|id| id.workflow_execution_id.as_str())
            .collect();

        // A request expiring between query and observation fails the round.
        let requests = self.store.get_n(&ids)?;

        let observations = Observations {
            observations: requests
                .into_iter()
                .map(|req| RequestObservation {
                    id: req.id(),
                    observations: req.observations,
                })
                .collect(),
        };
        let bytes = encode("observation", &observations)?;
        Self::check_limit(
            "observation",
            &bytes,
            self.config.limits.max_observation_length,
        )?;

        debug!(
            seq_nr = outctx.seq_nr,
            count = observations.observations.len(),
            "Built observation"
        );
        Ok(bytes)
    }

    async fn validate_observation(
        &self,
        _outctx: &OutcomeContext,
        _query: &[u8],
        ao: &AttributedObservation,
    ) -> CapabilityResult<()> {
        decode::<Observations>("observation", &ao.observation).map(|_| ())
    }

    async fn observation_quorum(
        &self,
        _outctx: &OutcomeContext,
        _query: &[u8],
    ) -> CapabilityResult<Quorum> {
        Ok(Quorum::TwoFPlusOne)
    }

    async fn outcome(
        &self,
        outctx: &OutcomeContext,
        query: &[u8],
        aos: &[AttributedObservation],
    ) -> CapabilityResult<Vec<u8>> {
        let query: Query = decode("query", query)?;
        let previous = Outcome::decode_previous(&outctx.previous_outcome)?;

        // Reports are only ever generated for ids in the current query.
        let mut outcomes = previous.outcomes;
        outcomes.retain(|workflow_id, _| {
            let registered = self.registry.get_aggregator(workflow_id).is_ok();
            if !registered {
                debug!(workflow_id = %workflow_id, "Dropping state of unregistered workflow");
            }
            registered
        });
        let mut outcome = Outcome {
            outcomes,
            reports_to_generate: Vec::new(),
        };

        let grouped = Self::group_observations(aos);
        let required = Quorum::TwoFPlusOne.threshold(self.config.f);

        for id in query.ids {
            let observed = grouped.get(&id.workflow_execution_id);
            let count = observed.map_or(0, |obs| obs.len());
            let Some(observed) = observed.filter(|_| count >= required) else {
                warn!(
                    seq_nr = outctx.seq_nr,
                    workflow_execution_id = %id.workflow_execution_id,
                    observers = count,
                    required,
                    "Insufficient observations, skipping execution"
                );
                metrics::record_observation_skipped("insufficient_observations");
                continue;
            };

            let aggregator = match self.registry.get_aggregator(&id.workflow_id) {
                Ok(aggregator) => aggregator,
                Err(e) => {
                    warn!(
                        workflow_id = %id.workflow_id,
                        error = %e,
                        "No aggregator registered, skipping execution"
                    );
                    metrics::record_observation_skipped("missing_aggregator");
                    continue;
                }
            };

            let previous = outcome.outcomes.get(&id.workflow_id);
            let aggregated = match aggregator.aggregate(previous, observed) {
                Ok(aggregated) => aggregated,
                Err(e) => {
                    warn!(
                        workflow_id = %id.workflow_id,
                        workflow_execution_id = %id.workflow_execution_id,
                        error = %e,
                        "Aggregation failed, skipping execution"
                    );
                    metrics::record_observation_skipped("aggregation_failed");
                    continue;
                }
            };

            // Quiet executions are resolved too, with an empty report.
            outcome.reports_to_generate.push(ReportRequest {
                id: id.clone(),
                outcome: aggregated.clone(),
            });
            outcome.outcomes.insert(id.workflow_id, aggregated);
        }

        let bytes = encode("outcome", &outcome)?;
        Self::check_limit("outcome", &bytes, self.config.limits.max_outcome_length)?;

        debug!(
            seq_nr = outctx.seq_nr,
            reports = outcome.reports_to_generate.len(),
            "Computed outcome"
        );
        Ok(bytes)
    }

    async fn reports(&self, seq_nr: u64, outcome: &[u8]) -> CapabilityResult<Vec<ReportWithInfo>> {
        let outcome: Outcome = decode("outcome", outcome)?;
        let limits = &self.config.limits;

        let mut reports = Vec::with_capacity(outcome.reports_to_generate.len());
        for ReportRequest { id, outcome } in outcome.reports_to_generate {
            if reports.len() >= limits.max_report_count {
                warn!(seq_nr, limit = limits.max_report_count, "Report count limit reached");
                break;
            }

            let report = if outcome.should_report {
                match self.encode_report(&id, &outcome) {
                    Some(report) => report,
                    None => continue,
                }
            } else {
                Vec::new()
            };

            let info = encode(
                "report info",
                &ReportInfo {
                    id,
                    should_report: outcome.should_report,
                },
            )?;
            reports.push(ReportWithInfo { report, info });
        }

        metrics::record_reports_generated(reports.len());
        debug!(seq_nr, count = reports.len(), "Generated reports");
        Ok(reports)
    }

    async fn should_accept_attested_report(
        &self,
        seq_nr: u64,
        report: &ReportWithInfo,
    ) -> CapabilityResult<bool> {
        let info = match report.report_info() {
            Ok(info) => info,
            Err(e) => {
                warn!(seq_nr, error = %e, "Attested report carries no usable info");
                return Ok(false);
            }
        };

        let response = ConsensusResponse {
            workflow_execution_id: info.id.workflow_execution_id.clone(),
            value: report_value(&report.report, &[]),
            err: None,
        };
        match self.transmitter.transmit_response(response).await {
            Ok(()) => info!(
                seq_nr,
                workflow_execution_id = %info.id.workflow_execution_id,
                "Delivered attested report"
            ),
            // Expected on nodes where the request already expired.
            Err(e) => debug!(
                seq_nr,
                workflow_execution_id = %info.id.workflow_execution_id,
                error = %e,
                "Could not deliver attested report"
            ),
        }
        Ok(false)
    }

    async fn should_transmit_accepted_report(
        &self,
        _seq_nr: u64,
        _report: &ReportWithInfo,
    ) -> CapabilityResult<bool> {
        Ok(false)
    }

    async fn close(&self) -> CapabilityResult<()> {
        Ok(())
    }
}
