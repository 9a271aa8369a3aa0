//! # cr-core
//!
//! Core types, traits, and error handling for coincrank.
//!
//! This crate provides:
//! - Common error types
//! - The [`RankingStatistic`] capability shared by every statistic variant
//! - Trigger batches and single-detector feature containers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::RankingStatistic;
pub use types::{PhaseTdRow, SingleFeature, TemplateIndex, TriggerBatch, fields};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
