// src/pipeline/builder.rs
use super::orchestrator::DocumentPipeline;
use super::worker::BuildContext;
use crate::config::{ConfigError, PipelineConfig};
use crate::error::PipelineError;
use crate::metadata::{MetadataValidator, RequiredFields};
use folio_ast::LinkRegistry;
use folio_process::ProcessTool;
use folio_render_core::{CssSource, PageRenderer};
use folio_render_html::HtmlRenderer;
use folio_render_paged::EnginePageRenderer;
use folio_resource::{relative_href, AssetResolver};
use folio_style::LayoutProfile;
use folio_traits::ExternalTool;
use std::path::{self, Path, PathBuf};
use std::sync::Arc;

/// A builder for creating a `DocumentPipeline`.
pub struct PipelineBuilder {
    ast_tool: Option<Arc<dyn ExternalTool>>,
    ast_args: Vec<String>,
    page_engine: Option<Arc<dyn ExternalTool>>,
    engine_args: Option<Vec<String>>,
    profile: Option<LayoutProfile>,
    profile_path: Option<PathBuf>,
    output_dir: PathBuf,
    cache_file: Option<PathBuf>,
    asset_roots: Vec<PathBuf>,
    links: LinkRegistry,
    validator: Arc<dyn MetadataValidator>,
    render_pages: bool,
    incremental: bool,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            ast_tool: None,
            ast_args: defaults.pipeline.ast_tool.args,
            page_engine: None,
            engine_args: None,
            profile: None,
            profile_path: None,
            output_dir: defaults.paths.output,
            cache_file: None,
            asset_roots: defaults.paths.asset_roots,
            links: LinkRegistry::new(),
            validator: Arc::new(RequiredFields::default()),
            render_pages: true,
            incremental: false,
        }
    }
}

impl PipelineBuilder {
    /// Creates a new `PipelineBuilder` with default settings.
    pub fn new() -> Self {
        Default::default()
    }

    /// Applies paths and subprocess settings from a loaded configuration.
    /// The configured programs become the AST tool and page engine.
    pub fn with_config(mut self, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let ast = &config.pipeline.ast_tool;
        let engine = &config.pipeline.page_engine;
        self.ast_tool = Some(Arc::new(ProcessTool::new(&ast.program, ast.timeout())));
        self.ast_args = ast.args.clone();
        self.page_engine = Some(Arc::new(ProcessTool::new(&engine.program, engine.timeout())));
        self.engine_args = Some(engine.args.clone());
        self.output_dir = config.paths.output.clone();
        self.cache_file = config.paths.cache_file.clone();
        self.asset_roots = config.paths.asset_roots.clone();
        if let Some(path) = &config.paths.layout_profile {
            self = self.with_layout_profile_file(path)?;
        }
        Ok(self)
    }

    /// The program that turns Markdown into a Pandoc JSON syntax tree.
    pub fn with_ast_tool(mut self, tool: Arc<dyn ExternalTool>) -> Self {
        self.ast_tool = Some(tool);
        self
    }

    /// Argument template for the AST tool; `{input}` is the source path.
    pub fn with_ast_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ast_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The program that paginates HTML into a PDF.
    pub fn with_page_engine(mut self, tool: Arc<dyn ExternalTool>) -> Self {
        self.page_engine = Some(tool);
        self
    }

    pub fn with_engine_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engine_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_layout_profile(mut self, profile: LayoutProfile) -> Self {
        self.profile = Some(profile);
        self.profile_path = None;
        self
    }

    /// Loads and validates a layout profile. The file itself becomes a
    /// build dependency.
    pub fn with_layout_profile_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        self.profile = Some(LayoutProfile::load(path)?);
        self.profile_path = Some(path.to_path_buf());
        Ok(self)
    }

    /// Root for `html/` and `pdf/` outputs.
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_cache_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    pub fn with_asset_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.asset_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// The wikilink snapshot every document in this pipeline resolves against.
    pub fn with_link_registry(mut self, links: LinkRegistry) -> Self {
        self.links = links;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn MetadataValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// When false, only HTML is produced and no page engine is needed.
    pub fn with_page_rendering(mut self, enabled: bool) -> Self {
        self.render_pages = enabled;
        self
    }

    /// Skip documents whose source and dependencies are unchanged since their last build.
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Consumes the builder and creates the `DocumentPipeline`.
    pub fn build(self) -> Result<DocumentPipeline, PipelineError> {
        let ast_tool = self.ast_tool.ok_or_else(|| {
            ConfigError::Invalid(
                "No AST tool has been configured. Use `with_ast_tool` or `with_config`.".to_string(),
            )
        })?;
        let profile = self.profile.unwrap_or_default();

        // Stylesheets and output directories are made absolute up front: the
        // HTML links to them from `html/` and the engine runs in a scratch dir.
        let html_dir = path::absolute(self.output_dir.join("html"))?;
        let pdf_dir = path::absolute(self.output_dir.join("pdf"))?;
        let sheets = profile
            .stylesheets()
            .into_iter()
            .map(path::absolute)
            .collect::<Result<Vec<PathBuf>, _>>()?;
        let mut dependencies: Vec<PathBuf> = self.profile_path.into_iter().collect();
        dependencies.extend(sheets.iter().cloned());

        let page_renderer: Option<Arc<dyn PageRenderer>> = if self.render_pages {
            let tool = self.page_engine.ok_or_else(|| {
                ConfigError::Invalid(
                    "No page engine has been configured. Use `with_page_engine` or disable page rendering."
                        .to_string(),
                )
            })?;
            let mut renderer = EnginePageRenderer::new(profile.rendering_engine, tool);
            if let Some(args) = self.engine_args {
                renderer = renderer.with_args(args);
            }
            log::info!("Page rendering with the {} engine.", profile.rendering_engine);
            Some(Arc::new(renderer))
        } else {
            log::info!("Page rendering disabled; producing HTML only.");
            None
        };

        let html = sheets.iter().fold(
            HtmlRenderer::new(profile.styles_map.clone()),
            |renderer, sheet| renderer.with_stylesheet(relative_href(sheet, &html_dir)),
        );

        let context = BuildContext {
            ast_tool,
            ast_args: self.ast_args,
            html,
            page_html: HtmlRenderer::new(profile.styles_map.clone()),
            page_renderer,
            stylesheets: sheets.into_iter().map(CssSource::File).collect(),
            links: self.links,
            assets: AssetResolver::new(self.asset_roots),
            validator: self.validator,
            dependencies,
            html_dir,
            pdf_dir,
        };
        let cache_path = self
            .cache_file
            .unwrap_or_else(|| self.output_dir.join(".build_cache.json"));

        Ok(DocumentPipeline::new(context, cache_path, self.incremental))
    }
}
