//! Report encoders

use crate::domain::{CapabilityError, CapabilityResult};
use crate::ports::Encoder;
use serde_json::Value;
use std::sync::Arc;

pub const JSON_ENCODER: &str = "json";

/// Encodes the aggregated value as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, value: &Value) -> CapabilityResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CapabilityError::Encoding(e.to_string()))
    }
}

/// Build the encoder registered under `name`.
///
/// # Errors
/// - `Unsupported` for an unknown encoder name
pub fn new_encoder(name: &str, _config: &Value) -> CapabilityResult<Arc<dyn Encoder>> {
    match name {
        JSON_ENCODER => Ok(Arc::new(JsonEncoder)),
        other => Err(CapabilityError::unsupported("encoder", other)),
    }
}
