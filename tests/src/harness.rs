//! # Simulated DON
//!
//! Drives the reporting plugin of every node the way the consensus driver
//! would: the leader builds the query, every node observes, the outcome is
//! computed on every node and must agree, reports are attested and each
//! node gets to accept them.
//!
//! Signing and the network are out of the picture; a node whose
//! observation fails simply does not contribute to the round.

use ocr3_capability::domain::{
    AttributedObservation, AttributedSignature, CapabilityRequest, OutcomeContext,
    RegistrationMetadata, ReportWithInfo, RequestMetadata,
};
use ocr3_capability::{
    CallbackCapability, CapabilityConfig, CapabilityReportingPlugin, CapabilityResult,
    ManualClock, Ocr3Capability, RegistrationRequest, ReportingPlugin, ReportingPluginConfig,
    ResponseFuture, ResponsePromise,
};
use ocr3_telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

static TELEMETRY: OnceLock<Option<TelemetryGuard>> = OnceLock::new();

/// Install logging once per test binary. `RUST_LOG` still applies.
pub fn init_test_logging() {
    TELEMETRY.get_or_init(|| {
        let config = TelemetryConfig::from_env();
        init_telemetry(config).ok()
    });
}

/// One oracle: its own capability instance and reporting plugin.
pub struct Node {
    pub capability: Arc<Ocr3Capability>,
    pub plugin: CapabilityReportingPlugin,
}

/// What one round produced.
#[derive(Debug, Default)]
pub struct RoundResult {
    pub seq_nr: u64,
    pub observers: usize,
    pub reports: Vec<ReportWithInfo>,
}

pub struct SimulatedDon {
    pub nodes: Vec<Node>,
    pub clock: Arc<ManualClock>,
    n: usize,
    f: usize,
    seq_nr: u64,
    previous_outcome: Vec<u8>,
}

impl SimulatedDon {
    /// `n` started nodes sharing one manual clock.
    pub fn new(n: usize, f: usize, config: CapabilityConfig) -> CapabilityResult<Self> {
        init_test_logging();
        let clock = Arc::new(ManualClock::new(1_000));
        let mut nodes = Vec::with_capacity(n);
        for _ in 0..n {
            let capability =
                Arc::new(Ocr3Capability::new(config.clone()).with_clock(clock.clone()));
            capability.start()?;
            let (plugin, _info) = capability
                .reporting_plugin_factory()
                .new_reporting_plugin(ReportingPluginConfig::new(n, f))?;
            nodes.push(Node { capability, plugin });
        }
        Ok(Self {
            nodes,
            clock,
            n,
            f,
            seq_nr: 0,
            previous_outcome: Vec::new(),
        })
    }

    pub fn seq_nr(&self) -> u64 {
        self.seq_nr
    }

    /// Register `workflow_id` on every node.
    pub async fn register(&self, workflow_id: &str, config: Value) -> CapabilityResult<()> {
        for node in &self.nodes {
            let request = RegistrationRequest {
                metadata: RegistrationMetadata {
                    workflow_id: workflow_id.into(),
                    workflow_owner: "owner".into(),
                },
                config: config.clone(),
            };
            node.capability.register_to_workflow(request).await?;
        }
        Ok(())
    }

    /// Submit the same execution on the given nodes, each with its own
    /// observations. Returns the callers' futures in node order.
    pub async fn submit(
        &self,
        workflow_id: &str,
        execution_id: &str,
        observations: &[(usize, Value)],
    ) -> CapabilityResult<Vec<ResponseFuture>> {
        let mut futures = Vec::with_capacity(observations.len());
        for (node, observation) in observations {
            let (callback, future) = ResponsePromise::new();
            let request = CapabilityRequest {
                metadata: RequestMetadata {
                    workflow_id: workflow_id.into(),
                    workflow_execution_id: execution_id.into(),
                    workflow_owner: "owner".into(),
                },
                config: json!({}),
                inputs: json!({ "observations": [observation] }),
            };
            self.nodes[*node]
                .capability
                .execute(CancellationToken::new(), callback, request)
                .await?;
            futures.push(future);
        }
        Ok(futures)
    }

    /// Submit on every node with the same observation.
    pub async fn submit_all(
        &self,
        workflow_id: &str,
        execution_id: &str,
        observation: Value,
    ) -> CapabilityResult<Vec<ResponseFuture>> {
        let observations: Vec<_> = (0..self.n).map(|i| (i, observation.clone())).collect();
        self.submit(workflow_id, execution_id, &observations).await
    }

    /// Run one full round without accepting the reports.
    pub async fn run_round_without_accept(&mut self) -> CapabilityResult<RoundResult> {
        self.seq_nr += 1;
        let outctx = OutcomeContext {
            seq_nr: self.seq_nr,
            previous_outcome: self.previous_outcome.clone(),
        };
        let leader = &self.nodes[(self.seq_nr as usize) % self.n];
        let query = leader.plugin.query(&outctx).await?;

        let mut aos = Vec::with_capacity(self.n);
        for (i, node) in self.nodes.iter().enumerate() {
            let Ok(observation) = node.plugin.observation(&outctx, &query).await else {
                continue;
            };
            let ao = AttributedObservation {
                observation,
                observer: i as u8,
            };
            if leader
                .plugin
                .validate_observation(&outctx, &query, &ao)
                .await
                .is_ok()
            {
                aos.push(ao);
            }
        }

        let mut outcomes = Vec::with_capacity(self.n);
        for node in &self.nodes {
            outcomes.push(node.plugin.outcome(&outctx, &query, &aos).await?);
        }
        let outcome = outcomes.remove(0);
        assert!(
            outcomes.iter().all(|o| *o == outcome),
            "nodes disagree on the outcome of round {}",
            self.seq_nr
        );

        let reports = leader.plugin.reports(self.seq_nr, &outcome).await?;
        self.previous_outcome = outcome;

        Ok(RoundResult {
            seq_nr: self.seq_nr,
            observers: aos.len(),
            reports,
        })
    }

    /// Run one full round and let every node accept the attested reports.
    pub async fn run_round(&mut self) -> CapabilityResult<RoundResult> {
        let result = self.run_round_without_accept().await?;
        for report in &result.reports {
            for node in &self.nodes {
                let transmit = node
                    .plugin
                    .should_accept_attested_report(result.seq_nr, report)
                    .await?;
                assert!(!transmit, "accept path must never ask for transmission");
            }
        }
        Ok(result)
    }

    /// Fake signatures from the first `2f+1` oracles.
    pub fn signatures(&self) -> Vec<AttributedSignature> {
        (0..2 * self.f + 1)
            .map(|i| AttributedSignature {
                signer: i as u8,
                signature: vec![i as u8; 65],
            })
            .collect()
    }

    pub fn close(&self) {
        for node in &self.nodes {
            node.capability.close();
        }
    }
}
