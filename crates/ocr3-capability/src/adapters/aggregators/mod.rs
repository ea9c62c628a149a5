//! Built-in aggregation strategies

mod data_feeds;
mod identical;

pub use data_feeds::*;
pub use identical::*;

use crate::domain::{CapabilityError, CapabilityResult};
use crate::ports::Aggregator;
use serde_json::Value;
use std::sync::Arc;

pub const DATA_FEEDS_AGGREGATOR: &str = "data_feeds";
pub const IDENTICAL_AGGREGATOR: &str = "identical";

/// Build the aggregator registered under `method`.
///
/// # Errors
/// - `Unsupported` for an unknown aggregation method
/// - `Decode` if the method's config is malformed
pub fn new_aggregator(method: &str, config: &Value) -> CapabilityResult<Arc<dyn Aggregator>> {
    match method {
        DATA_FEEDS_AGGREGATOR => Ok(Arc::new(DataFeedsAggregator::from_value(config)?)),
        IDENTICAL_AGGREGATOR => Ok(Arc::new(IdenticalAggregator::from_value(config)?)),
        other => Err(CapabilityError::unsupported("aggregation method", other)),
    }
}
