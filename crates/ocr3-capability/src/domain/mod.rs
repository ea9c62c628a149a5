//! Domain layer for the OCR3 capability
//!
//! - request: caller-facing entities and the stored `Request`
//! - promise: one-shot response delivery
//! - store: in-flight request store
//! - wire: round payloads exchanged with the consensus driver

mod config;
mod error;
mod promise;
mod request;
mod store;
mod wire;

pub use config::*;
pub use error::*;
pub use promise::*;
pub use request::*;
pub use store::*;
pub use wire::*;
