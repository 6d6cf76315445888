//! annoclip-core: annotation-driven audio clip and image crop extraction

pub mod batch;
pub mod clipper;
pub mod config;
pub mod cropper;
pub mod dataset;
pub mod error;
pub mod naming;
pub mod report;

#[cfg(test)]
mod testing;

pub use batch::{BatchConfig, BatchEvent, Orchestrator, RunSummary};
pub use config::Config;
pub use error::{AnnoclipError, Result};
