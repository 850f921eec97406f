//! YouTube success intelligence common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - Run and channel identifiers
//! - The unified error taxonomy and its HTTP/exit mappings
//! - Output format specifications
//! - Artifact path, training and tracking configuration
//! - Content hashing for provenance records

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod output;

pub use config::{ArtifactPaths, TrackingConfig, TrainingConfig};
pub use error::{Error, Result};
pub use id::{ChannelId, RunId};
pub use output::OutputFormat;

/// Schema version stamped on every JSON document this workspace emits.
pub const SCHEMA_VERSION: &str = "1.0.0";
