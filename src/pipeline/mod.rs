//! Document build pipeline orchestration.
//!
//! - [`PipelineBuilder`]: fluent builder wiring tools, profile and paths
//! - [`DocumentPipeline`]: single-document builds, batch builds and cleanup
//! - [`OutputTransaction`]: staged outputs committed by atomic rename
//!
//! # Example
//!
//! ```ignore
//! use folio::{BuildJob, PipelineBuilder, PipelineConfig};
//!
//! let config = PipelineConfig::load("config", None)?;
//! let pipeline = PipelineBuilder::new().with_config(&config)?.build()?;
//! let summary = pipeline.build_all(vec![BuildJob::new("drafts/SOP-200.md")], 4);
//! assert!(summary.is_success());
//! ```

mod builder;
mod orchestrator;
mod transaction;
mod worker;

pub use builder::PipelineBuilder;
pub use orchestrator::{BatchSummary, BuildFailure, BuildJob, BuildResult, BuildStatus, DocumentPipeline};
pub use transaction::OutputTransaction;
pub use worker::BuiltDocument;
