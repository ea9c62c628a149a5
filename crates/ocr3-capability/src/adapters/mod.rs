//! Adapters layer (Hexagonal Architecture)

pub mod aggregators;
mod capability_registry;
mod clock;
pub mod encoders;

pub use capability_registry::*;
pub use clock::*;
