//! # OCR3 Consensus Capability
//!
//! Exposes a BFT consensus round (OCR3) as a workflow capability. A workflow
//! step submits its observations through `execute`; the reporting plugin
//! batches pending requests into rounds, aggregates what the DON observed,
//! and the finalized report is routed back to the waiting caller.
//!
//! ## Architecture
//!
//! ```text
//! workflow ──execute──→ Ocr3Capability ──add──→ RequestStore
//!     ↑                      │                      ↑
//!     │                 expiry watcher          first_n / get_n
//!     │                      │                      │
//!     └──── callback ←── transmit_response ←── CapabilityReportingPlugin
//!                            ↑                      │
//!                   ContractTransmitter ←── signed reports (driver)
//! ```
//!
//! ## Guarantees
//!
//! | Guarantee | Where |
//! |-----------|-------|
//! | One request per execution id | `RequestStore::add` |
//! | FIFO batching, evicted ids pruned | `RequestStore::first_n` |
//! | At most one response per request | evict-then-complete in `service` |
//! | Reports only for 2f+1 observed executions | `CapabilityReportingPlugin::outcome` |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, store, wire payloads, errors
//! - `ports/` - Inbound API (capability, plugin) and outbound SPI
//! - `adapters/` - Clocks, aggregators, encoders, capability registry
//! - `service/` - Capability executor and request expiry
//! - `plugin/` - Reporting plugin and its factory
//! - `registry.rs` - Per-workflow aggregator/encoder registry
//! - `transmitter.rs` - Contract transmitter
//!
//! ## Usage
//!
//! ```ignore
//! use ocr3_capability::{CapabilityConfig, Ocr3Capability, ReportingPluginConfig};
//!
//! let capability = Arc::new(Ocr3Capability::new(CapabilityConfig::default()));
//! capability.start()?;
//!
//! let factory = capability.reporting_plugin_factory();
//! let (plugin, info) = factory.new_reporting_plugin(ReportingPluginConfig::new(4, 1))?;
//! ```

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod plugin;
pub mod ports;
pub mod registry;
pub mod service;
pub mod transmitter;

// Re-export key types for convenience
pub use adapters::{InMemoryCapabilityRegistry, ManualClock, SystemClock};
pub use domain::{
    CapabilityConfig, CapabilityError, CapabilityRequest, CapabilityResponse, CapabilityResult,
    ConsensusResponse, PluginLimits, RegistrationRequest, ReportingPluginConfig, RequestStore,
    ResponseFuture, ResponsePromise, WorkflowConfig,
};
pub use plugin::{CapabilityReportingPlugin, ReportingPluginFactory};
pub use ports::{
    Aggregator, AggregatorRegistry, CallbackCapability, CapabilityRegistry, Clock, Encoder,
    ReportingPlugin, ResponseTransmitter,
};
pub use registry::WorkflowRegistry;
pub use service::{Ocr3Capability, CAPABILITY_ID};
pub use transmitter::ContractTransmitter;
