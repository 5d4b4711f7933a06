// src/pipeline/worker.rs

use super::transaction::OutputTransaction;
use crate::cache::CacheEntry;
use crate::error::PipelineError;
use crate::metadata::{parse_front_matter, MetadataValidator};
use folio_ast::{parse_json, resolve_wikilinks, LinkRegistry};
use folio_render_core::{CssSource, PageRenderer};
use folio_render_html::HtmlRenderer;
use folio_resource::{rebase_images, AssetResolver};
use folio_traits::{ExternalTool, ToolInput};
use folio_types::Document;
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// What one successful document build produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltDocument {
    pub document_id: String,
    pub outputs: Vec<PathBuf>,
    /// Parse, link and asset warnings raised along the way.
    pub warnings: usize,
    /// Hashes of the source bytes this build read and of the shared
    /// dependencies at that moment. `None` when they could not be hashed.
    pub fingerprint: Option<CacheEntry>,
}

/// Everything a worker needs, shared read-only across the pool.
pub(crate) struct BuildContext {
    pub(crate) ast_tool: Arc<dyn ExternalTool>,
    pub(crate) ast_args: Vec<String>,
    /// Links stylesheets relative to `html_dir`.
    pub(crate) html: HtmlRenderer,
    /// Renders the copy handed to the page engine, which gets its
    /// stylesheets separately.
    pub(crate) page_html: HtmlRenderer,
    pub(crate) page_renderer: Option<Arc<dyn PageRenderer>>,
    pub(crate) stylesheets: Vec<CssSource>,
    pub(crate) links: LinkRegistry,
    pub(crate) assets: AssetResolver,
    pub(crate) validator: Arc<dyn MetadataValidator>,
    /// Files besides the source that every build depends on.
    pub(crate) dependencies: Vec<PathBuf>,
    /// Absolute.
    pub(crate) html_dir: PathBuf,
    pub(crate) pdf_dir: PathBuf,
}

impl BuildContext {
    /// `source` must be absolute; the tool runs in the source's directory.
    fn ast_args_for(&self, source: &Path) -> Vec<String> {
        let input = source.to_string_lossy();
        self.ast_args.iter().map(|arg| arg.replace("{input}", &input)).collect()
    }

    pub(crate) fn html_target(&self, id: &str) -> PathBuf {
        self.html_dir.join(format!("{}.html", id))
    }

    pub(crate) fn pdf_target(&self, id: &str) -> PathBuf {
        self.pdf_dir.join(format!("{}.pdf", id))
    }

    /// Runs the full chain for one source file. Outputs are committed only
    /// when every stage succeeded.
    pub(crate) fn build_document(&self, source: &Path) -> Result<BuiltDocument, PipelineError> {
        let total_start = Instant::now();

        let bytes = fs::read(source)?;
        let fingerprint = match CacheEntry::for_source_bytes(&bytes, &self.dependencies) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("{}; {} will not be cached", e, source.display());
                None
            }
        };
        let text = String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let (metadata, _body) = parse_front_matter(&text)?;
        self.validator.validate(&metadata)?;
        let document_id = metadata
            .document_id
            .clone()
            .ok_or_else(|| PipelineError::Validation("document_id is missing".to_string()))?;
        let label = format!("[BUILD {}]", document_id);
        info!("{} Started from {}", label, source.display());

        let ast_start = Instant::now();
        let absolute_source = path::absolute(source)?;
        let mut input = ToolInput::new(self.ast_args_for(&absolute_source));
        if let Some(dir) = absolute_source.parent() {
            input = input.with_working_dir(dir);
        }
        let tree = self.ast_tool.invoke(input)?.stdout_text();
        debug!("{} Syntax tree from {} in {:?}", label, self.ast_tool.name(), ast_start.elapsed());

        let outcome = parse_json(&tree)?;
        let mut warnings = outcome.warnings.len();
        let document = Document::new(metadata, outcome.blocks);
        let (document, link_warnings) = resolve_wikilinks(document, &self.links);
        let (document, missing_assets) = self.assets.resolve_document(document, source.parent());
        warnings += link_warnings.len() + missing_assets.len();
        if warnings > 0 {
            warn!("{} {} warning(s) while parsing", label, warnings);
        }

        // The engine renders from a scratch directory, so its copy keeps absolute image paths.
        let page_html = self.page_renderer.as_ref().map(|_| self.page_html.render(&document));
        let document = rebase_images(document, &self.html_dir);
        let html = self.html.render(&document);
        let mut transaction = OutputTransaction::new();
        transaction.stage_bytes(&self.html_target(&document_id), html.as_bytes())?;

        if let Some((renderer, page_html)) = self.page_renderer.as_ref().zip(page_html) {
            let render_start = Instant::now();
            let staged = transaction.stage_path(&self.pdf_target(&document_id))?;
            let artifact = renderer.render(&page_html, &self.stylesheets, &staged)?;
            debug!(
                "{} {} produced {} bytes in {:?}",
                label,
                renderer.name(),
                artifact.bytes,
                render_start.elapsed()
            );
        }

        let outputs = transaction.commit()?;
        info!(
            "{} Finished: {} block(s), {} output(s) in {:?}",
            label,
            document.blocks.len(),
            outputs.len(),
            total_start.elapsed()
        );
        Ok(BuiltDocument {
            document_id,
            outputs,
            warnings,
            fingerprint,
        })
    }
}
