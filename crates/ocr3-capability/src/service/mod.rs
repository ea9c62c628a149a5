//! Capability Service - caller-facing executor
//!
//! # Request lifecycle
//!
//! ```text
//! execute ──add──→ [InFlight] ──transmit_response──→ [Delivered]
//!                      │
//!                      └── expires_at / ctx canceled ──→ [TimedOut]
//! ```
//!
//! Both terminal transitions evict from the store first; whichever evicts
//! completes the callback, the other becomes a no-op.

mod expiry;

use crate::adapters::SystemClock;
use crate::domain::{
    millis, CapabilityConfig, CapabilityError, CapabilityInfo, CapabilityRequest,
    CapabilityResponse, CapabilityResult, CapabilityType, ConsensusResponse, RegistrationRequest,
    Request, RequestMetadata, RequestStore, ResponsePromise, TransmitPayload, WorkflowConfig,
};
use crate::metrics;
use crate::plugin::ReportingPluginFactory;
use crate::ports::{CallbackCapability, Clock, ResponseTransmitter};
use crate::registry::WorkflowRegistry;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Capability id under which the executor registers itself.
pub const CAPABILITY_ID: &str = "offchain_reporting@1.0.0";

/// Routing marker for a new consensus round.
pub const METHOD_START: &str = "start";

/// Routing marker for delivering a finalized transmission.
pub const METHOD_TRANSMIT: &str = "transmit";

#[derive(Deserialize)]
struct StartInputs {
    observations: Vec<Value>,
}

/// OCR3 consensus capability
///
/// Owns the request store and the workflow registry. Reporting plugins
/// created from [`Ocr3Capability::reporting_plugin_factory`] share both.
pub struct Ocr3Capability {
    config: CapabilityConfig,
    store: Arc<RequestStore>,
    registry: Arc<WorkflowRegistry>,
    clock: Arc<dyn Clock>,
    expiry_tx: mpsc::UnboundedSender<Request>,
    expiry_rx: Mutex<Option<mpsc::UnboundedReceiver<Request>>>,
    shutdown: CancellationToken,
}

impl Ocr3Capability {
    pub fn new(config: CapabilityConfig) -> Self {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        Self {
            config,
            store: Arc::new(RequestStore::new()),
            registry: Arc::new(WorkflowRegistry::new()),
            clock: Arc::new(SystemClock),
            expiry_tx,
            expiry_rx: Mutex::new(Some(expiry_rx)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Set custom clock (for testing)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CapabilityConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<RequestStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> Arc<WorkflowRegistry> {
        self.registry.clone()
    }

    /// Spawn the expiry dispatcher. Must be called inside a Tokio runtime;
    /// calling it again is a no-op.
    pub fn start(&self) -> CapabilityResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(CapabilityError::Closed);
        }
        let Some(rx) = self.expiry_rx.lock().take() else {
            return Ok(());
        };
        tokio::spawn(expiry::run_dispatcher(
            rx,
            self.store.clone(),
            self.clock.clone(),
            self.shutdown.clone(),
        ));
        info!(capability = CAPABILITY_ID, "Expiry dispatcher started");
        Ok(())
    }

    /// Stop the dispatcher and every watcher. Pending callers are released
    /// without a value; in-flight requests are not persisted.
    pub fn close(&self) {
        self.shutdown.cancel();
        self.expiry_rx.lock().take();
        let pending = self.store.drain();
        for req in &pending {
            req.callback.close();
        }
        info!(
            capability = CAPABILITY_ID,
            dropped = pending.len(),
            "Capability closed"
        );
    }

    pub fn reporting_plugin_factory(self: &Arc<Self>) -> ReportingPluginFactory {
        let transmitter: Arc<dyn ResponseTransmitter> = self.clone();
        ReportingPluginFactory::new(
            self.store.clone(),
            self.registry.clone(),
            transmitter,
            self.config.batch_size,
        )
    }

    /// Look up the caller for `response`, deliver and evict.
    ///
    /// # Errors
    /// - `NotFound` if the request is gone (expired, delivered, never existed)
    /// - `Canceled` if the caller's context is done; the request stays in the
    ///   store for the expiry path to clean up
    pub fn transmit_response(&self, response: ConsensusResponse) -> CapabilityResult<()> {
        let id = response.workflow_execution_id.clone();
        let req = self.store.get(&id)?;
        if req.request_ctx.is_cancelled() {
            return Err(CapabilityError::Canceled(id));
        }

        // Lost the race to the expiry watcher.
        let Some(req) = self.store.evict_request(&req) else {
            return Err(CapabilityError::NotFound(id));
        };

        req.callback.complete(response.into());
        metrics::record_response_delivered();
        debug!(
            workflow_id = %req.workflow_id,
            workflow_execution_id = %req.workflow_execution_id,
            "Delivered consensus response"
        );
        Ok(())
    }

    fn start_request(
        &self,
        ctx: CancellationToken,
        callback: ResponsePromise,
        request: CapabilityRequest,
    ) -> CapabilityResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(CapabilityError::Closed);
        }

        let RequestMetadata {
            workflow_id,
            workflow_execution_id,
            workflow_owner,
        } = request.metadata;
        if workflow_id.is_empty() || workflow_execution_id.is_empty() {
            return Err(CapabilityError::decode(
                "request metadata",
                "workflow id and execution id are required",
            ));
        }

        let inputs: StartInputs = serde_json::from_value(request.inputs)
            .map_err(|e| CapabilityError::decode("request inputs", e))?;

        let timeout_ms = millis(self.config.request_timeout);
        let req = Request {
            workflow_id,
            workflow_execution_id,
            workflow_owner,
            observations: inputs.observations,
            expires_at: self.clock.now().saturating_add(timeout_ms),
            request_ctx: ctx,
            callback,
        };

        self.store.add(req.clone())?;
        if self.expiry_tx.send(req.clone()).is_err() {
            self.store.evict_request(&req);
            return Err(CapabilityError::Closed);
        }

        metrics::record_request_accepted();
        debug!(
            workflow_id = %req.workflow_id,
            workflow_execution_id = %req.workflow_execution_id,
            expires_at = req.expires_at,
            "Accepted consensus request"
        );
        Ok(())
    }

    fn transmit_request(
        &self,
        callback: ResponsePromise,
        request: CapabilityRequest,
    ) -> CapabilityResult<()> {
        let payload: TransmitPayload = serde_json::from_value(request.inputs)
            .map_err(|e| CapabilityError::decode("transmit inputs", e))?;
        let response = payload.into_response(request.metadata.workflow_execution_id)?;

        let result = self.transmit_response(response);
        match &result {
            Ok(()) => callback.complete(CapabilityResponse::ok(Value::Null)),
            Err(e) => callback.complete(CapabilityResponse::error(e.to_string())),
        };
        result
    }
}

fn request_method(config: &Value) -> CapabilityResult<String> {
    match config.get("method") {
        None | Some(Value::Null) => Ok(METHOD_START.to_string()),
        Some(Value::String(method)) => Ok(method.clone()),
        Some(other) => Err(CapabilityError::decode(
            "request config",
            format!("method must be a string, got {}", other),
        )),
    }
}

#[async_trait]
impl CallbackCapability for Ocr3Capability {
    fn info(&self) -> CapabilityInfo {
        CapabilityInfo {
            id: CAPABILITY_ID.to_string(),
            capability_type: CapabilityType::Consensus,
            description: "OCR3 consensus exposed as a capability".to_string(),
        }
    }

    async fn execute(
        &self,
        ctx: CancellationToken,
        callback: ResponsePromise,
        request: CapabilityRequest,
    ) -> CapabilityResult<()> {
        let method = request_method(&request.config)?;
        match method.as_str() {
            METHOD_START => self.start_request(ctx, callback, request),
            METHOD_TRANSMIT => self.transmit_request(callback, request),
            other => Err(CapabilityError::unsupported("method", other)),
        }
    }

    async fn register_to_workflow(&self, request: RegistrationRequest) -> CapabilityResult<()> {
        let workflow_id = request.metadata.workflow_id;
        if workflow_id.is_empty() {
            return Err(CapabilityError::decode(
                "registration metadata",
                "workflow id is required",
            ));
        }
        let config: WorkflowConfig = serde_json::from_value(request.config)
            .map_err(|e| CapabilityError::decode("workflow config", e))?;
        self.registry.register(&workflow_id, &config)
    }

    async fn unregister_from_workflow(
        &self,
        request: RegistrationRequest,
    ) -> CapabilityResult<()> {
        if !self.registry.unregister(&request.metadata.workflow_id) {
            debug!(
                workflow_id = %request.metadata.workflow_id,
                "Workflow was not registered"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseTransmitter for Ocr3Capability {
    async fn transmit_response(&self, response: ConsensusResponse) -> CapabilityResult<()> {
        Ocr3Capability::transmit_response(self, response)
    }
}

impl Drop for Ocr3Capability {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
