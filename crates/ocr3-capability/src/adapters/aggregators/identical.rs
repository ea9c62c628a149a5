//! Identical-value aggregator
//!
//! Reports the observation list that enough observers submitted verbatim.
//! The threshold comes from `expected_observations` in the config, or a
//! strict majority of the observers present in the round.

use crate::domain::{AggregationOutcome, CapabilityError, CapabilityResult, OracleId};
use crate::ports::Aggregator;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct IdenticalConfig {
    #[serde(default)]
    pub expected_observations: Option<usize>,
}

#[derive(Debug, Default)]
pub struct IdenticalAggregator {
    config: IdenticalConfig,
}

impl IdenticalAggregator {
    pub fn new(config: IdenticalConfig) -> Self {
        Self { config }
    }

    pub fn from_value(config: &Value) -> CapabilityResult<Self> {
        if config.is_null() {
            return Ok(Self::default());
        }
        let config = serde_json::from_value(config.clone())
            .map_err(|e| CapabilityError::decode("identical config", e))?;
        Ok(Self::new(config))
    }
}

impl Aggregator for IdenticalAggregator {
    fn aggregate(
        &self,
        _previous: Option<&AggregationOutcome>,
        observations: &BTreeMap<OracleId, Vec<Value>>,
    ) -> CapabilityResult<AggregationOutcome> {
        let threshold = self
            .config
            .expected_observations
            .unwrap_or(observations.len() / 2 + 1);

        // Value has no Hash impl; its canonical JSON text stands in as the key.
        let mut counts: HashMap<String, (usize, &Vec<Value>)> = HashMap::new();
        for values in observations.values() {
            let key = serde_json::to_string(values)
                .map_err(|e| CapabilityError::Aggregation(e.to_string()))?;
            counts.entry(key).or_insert((0, values)).0 += 1;
        }

        let best = counts
            .into_values()
            .max_by_key(|(count, _)| *count)
            .filter(|(count, _)| *count >= threshold);

        match best {
            Some((_, values)) => Ok(AggregationOutcome {
                encodable_outcome: json!({ "observations": values }),
                metadata: Vec::new(),
                should_report: true,
            }),
            None => Err(CapabilityError::Aggregation(format!(
                "fewer than {} identical observations",
                threshold
            ))),
        }
    }
}
