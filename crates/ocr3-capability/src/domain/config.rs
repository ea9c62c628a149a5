//! Construction options for the capability and its reporting plugin.

use super::{CapabilityError, CapabilityResult};
use std::time::Duration;

/// Default number of requests drained per round.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default per-request expiry.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Default byte limit for any single round payload.
pub const DEFAULT_MAX_PAYLOAD_LENGTH: usize = 5 * 1024 * 1024;

/// Configuration for the capability front-end
#[derive(Clone, Debug)]
pub struct CapabilityConfig {
    /// Maximum requests drained by one `query`
    pub batch_size: usize,
    /// Time a request may stay in flight before the caller gets a timeout
    pub request_timeout: Duration,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CapabilityConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Byte limits advertised to the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginLimits {
    pub max_query_length: usize,
    pub max_observation_length: usize,
    pub max_outcome_length: usize,
    pub max_report_length: usize,
    pub max_report_count: usize,
}

impl Default for PluginLimits {
    fn default() -> Self {
        Self {
            max_query_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            max_observation_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            max_outcome_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            max_report_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            max_report_count: 1000,
        }
    }
}

/// DON parameters supplied by the driver when instantiating the plugin.
#[derive(Clone, Debug)]
pub struct ReportingPluginConfig {
    /// Number of oracles
    pub n: usize,
    /// Byzantine fault tolerance (f in 3f+1)
    pub f: usize,
    pub limits: PluginLimits,
}

impl Default for ReportingPluginConfig {
    fn default() -> Self {
        Self {
            n: 4,
            f: 1,
            limits: PluginLimits::default(),
        }
    }
}

impl ReportingPluginConfig {
    pub fn new(n: usize, f: usize) -> Self {
        Self {
            n,
            f,
            limits: PluginLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: PluginLimits) -> Self {
        self.limits = limits;
        self
    }

    /// A DON of `n` oracles tolerates `f` faults only if `n >= 3f+1`.
    ///
    /// # Errors
    /// - `InvalidArgument` otherwise
    pub fn validate(&self) -> CapabilityResult<()> {
        if self.n < 3 * self.f + 1 {
            return Err(CapabilityError::InvalidArgument(format!(
                "n = {} cannot tolerate f = {} faults, need n >= 3f+1",
                self.n, self.f
            )));
        }
        Ok(())
    }
}

/// Name and limits returned alongside a new plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportingPluginInfo {
    pub name: String,
    pub limits: PluginLimits,
}
