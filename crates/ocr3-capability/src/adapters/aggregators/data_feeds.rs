//! Data feeds aggregator
//!
//! Each observation is a map of `feed_id -> { price, timestamp }`. Per
//! configured feed the median price and median timestamp across observers
//! become the candidate value. A feed is reported when it has never been
//! reported, when the price moved by more than `deviation`, or when
//! `heartbeat` seconds passed since its last report.

use crate::domain::{AggregationOutcome, CapabilityError, CapabilityResult, OracleId};
use crate::ports::Aggregator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FeedConfig {
    /// Relative price change that triggers a report, e.g. 0.005 for 0.5%.
    pub deviation: f64,
    /// Seconds after which a feed is reported regardless of deviation.
    pub heartbeat: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DataFeedsConfig {
    pub feeds: BTreeMap<String, FeedConfig>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedValue {
    pub price: i64,
    /// Seconds.
    pub timestamp: u64,
}

/// Last reported value per feed, kept in `AggregationOutcome::metadata`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct DataFeedsState {
    feeds: BTreeMap<String, FeedValue>,
}

#[derive(Debug)]
pub struct DataFeedsAggregator {
    config: DataFeedsConfig,
}

impl DataFeedsAggregator {
    pub fn new(config: DataFeedsConfig) -> Self {
        Self { config }
    }

    pub fn from_value(config: &Value) -> CapabilityResult<Self> {
        let config = serde_json::from_value(config.clone())
            .map_err(|e| CapabilityError::decode("data feeds config", e))?;
        Ok(Self::new(config))
    }

    fn should_report(
        &self,
        feed: &FeedConfig,
        previous: Option<&FeedValue>,
        next: &FeedValue,
    ) -> bool {
        let Some(previous) = previous else {
            return true;
        };
        if next.timestamp.saturating_sub(previous.timestamp) >= feed.heartbeat {
            return true;
        }
        deviation(previous.price, next.price) > feed.deviation
    }
}

impl Aggregator for DataFeedsAggregator {
    fn aggregate(
        &self,
        previous: Option<&AggregationOutcome>,
        observations: &BTreeMap<OracleId, Vec<Value>>,
    ) -> CapabilityResult<AggregationOutcome> {
        let mut state = match previous {
            Some(outcome) if !outcome.metadata.is_empty() => {
                serde_json::from_slice::<DataFeedsState>(&outcome.metadata)
                    .map_err(|e| CapabilityError::decode("data feeds state", e))?
            }
            _ => DataFeedsState::default(),
        };

        let mut observed: BTreeMap<&str, Vec<FeedValue>> = BTreeMap::new();
        for (observer, values) in observations {
            for value in values {
                let Some(feeds) = value.as_object() else {
                    debug!(observer, "Ignoring non-map data feeds observation");
                    continue;
                };
                for (feed_id, raw) in feeds {
                    if !self.config.feeds.contains_key(feed_id) {
                        continue;
                    }
                    match serde_json::from_value::<FeedValue>(raw.clone()) {
                        Ok(v) => observed.entry(feed_id.as_str()).or_default().push(v),
                        Err(e) => debug!(
                            observer,
                            feed_id = %feed_id,
                            error = %e,
                            "Ignoring malformed feed value"
                        ),
                    }
                }
            }
        }

        let mut reports = Vec::new();
        for (feed_id, values) in observed {
            let Some(feed) = self.config.feeds.get(feed_id) else {
                continue;
            };
            let next = FeedValue {
                price: median(values.iter().map(|v| v.price).collect()),
                timestamp: median(values.iter().map(|v| v.timestamp).collect()),
            };
            if self.should_report(feed, state.feeds.get(feed_id), &next) {
                reports.push(json!({
                    "feed_id": feed_id,
                    "price": next.price,
                    "timestamp": next.timestamp,
                }));
                state.feeds.insert(feed_id.to_string(), next);
            }
        }

        let metadata = serde_json::to_vec(&state)
            .map_err(|e| CapabilityError::Aggregation(e.to_string()))?;
        Ok(AggregationOutcome {
            should_report: !reports.is_empty(),
            encodable_outcome: json!({ "reports": reports }),
            metadata,
        })
    }
}

/// Upper median of a non-empty list.
fn median<T: Ord + Copy>(mut values: Vec<T>) -> T {
    values.sort_unstable();
    values[values.len() / 2]
}

fn deviation(old: i64, new: i64) -> f64 {
    if old == 0 {
        return if new == 0 { 0.0 } else { f64::INFINITY };
    }
    ((new as f64 - old as f64) / old as f64).abs()
}
