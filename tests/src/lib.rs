//! # OCR3 Capability Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Simulated DON driving every node's plugin
//! └── integration/      # End-to-end flows across capability, plugin, transmitter
//!     ├── round_trip.rs
//!     ├── transmitter_flow.rs
//!     └── expiry.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ocr3-tests
//!
//! # By category
//! cargo test -p ocr3-tests integration::
//!
//! # Benchmarks
//! cargo bench -p ocr3-tests
//! ```

#![allow(dead_code)]

pub mod harness;
pub mod integration;
