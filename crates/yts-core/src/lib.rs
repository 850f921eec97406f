//! YouTube Success Intelligence Core Library
//!
//! This library provides the serving side of the channel intelligence system:
//! - Feature schema and dataset loading
//! - Prediction and clustering bundle adapters
//! - Drift baseline engine and artifact registry
//! - The intelligence service and its HTTP boundary
//! - Post-training registration pipeline and experiment tracking
//!
//! The binary entry point is in `main.rs`.

pub mod api;
pub mod dataset;
pub mod exit_codes;
pub mod features;
pub mod fsutil;
pub mod logging;
pub mod mlops;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod service;

pub use service::{IntelligenceService, ServiceHandle};
