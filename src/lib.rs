//! folio: Markdown documents with YAML front matter in, styled HTML and
//! paginated PDF out.
//!
//! A document's Markdown goes through an external AST tool (Pandoc JSON), is
//! parsed into the block model, has its wikilinks and images resolved, and
//! is rendered to HTML. A page engine then paginates the HTML using the
//! stylesheets of the active layout profile. Batch builds run documents in
//! parallel, skip unchanged ones and never let one failure stop the rest.

pub mod cache;
pub mod config;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod registry;
pub mod watch;

pub use cache::{hash_bytes, hash_file, CacheEntry, CacheError, DependencyTracker};
pub use config::{ConfigError, ConfigTree, PipelineConfig};
pub use error::PipelineError;
pub use metadata::{normalize, parse_front_matter, split_front_matter, MetadataValidator, RequiredFields};
pub use pipeline::{
    BatchSummary, BuildFailure, BuildJob, BuildResult, BuildStatus, BuiltDocument, DocumentPipeline,
    OutputTransaction, PipelineBuilder,
};
pub use registry::{DocumentRecord, DocumentRegistry, Family};
pub use watch::watch;

pub use folio_ast as ast;
pub use folio_layout as layout;
pub use folio_render_html as html;
pub use folio_style as style;
pub use folio_traits as traits;
pub use folio_types as types;
