use folio_render_core::{concat_stylesheets, CssSource, PageArtifact, PageRenderer, RenderError};
use folio_style::RenderingEngine;
use folio_traits::{ExternalTool, ToolInput};
use log::{debug, info};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Argument template for the engine. `{input}`, `{output}` and `{stylesheet}`
/// are substituted per invocation.
pub const DEFAULT_ENGINE_ARGS: [&str; 4] = ["{input}", "{output}", "--stylesheet", "{stylesheet}"];

/// Writes the HTML and the combined stylesheet to a scratch directory, then
/// asks the engine to produce `output`.
#[derive(Debug, Clone)]
pub struct EnginePageRenderer {
    engine: RenderingEngine,
    tool: Arc<dyn ExternalTool>,
    args: Vec<String>,
}

impl EnginePageRenderer {
    pub fn new(engine: RenderingEngine, tool: Arc<dyn ExternalTool>) -> Self {
        Self {
            engine,
            tool,
            args: DEFAULT_ENGINE_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn expand_args(&self, input: &Path, output: &Path, stylesheet: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
                    .replace("{stylesheet}", &stylesheet.to_string_lossy())
            })
            .collect()
    }
}

impl PageRenderer for EnginePageRenderer {
    fn name(&self) -> &str {
        self.tool.name()
    }

    fn render(&self, html: &str, stylesheets: &[CssSource], output: &Path) -> Result<PageArtifact, RenderError> {
        if !self.engine.renders_html() {
            return Err(RenderError::Capability {
                engine: self.engine.to_string(),
                reason: "it lays out design files and cannot paginate HTML".to_string(),
            });
        }

        let start = Instant::now();
        let css = concat_stylesheets(stylesheets)?;
        let scratch = tempfile::Builder::new().prefix("folio-render-").tempdir()?;
        let input_path = scratch.path().join("document.html");
        let css_path = scratch.path().join("combined.css");
        fs::write(&input_path, html)?;
        fs::write(&css_path, css)?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        let args = self.expand_args(&input_path, output, &css_path);
        debug!("Invoking {} with {:?}", self.tool.name(), args);
        let result = self
            .tool
            .invoke(ToolInput::new(args).with_working_dir(scratch.path()))?;
        if !result.stderr.trim().is_empty() {
            debug!("{} stderr: {}", self.tool.name(), result.stderr.trim());
        }

        let artifact = PageArtifact::from_path(output)?;
        info!(
            "Rendered {} ({} bytes) in {:.2?}",
            artifact.path.display(),
            artifact.bytes,
            start.elapsed()
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_traits::{FnTool, ToolError, ToolOutput};
    use std::sync::Mutex;

    fn writing_tool(seen_css: Arc<Mutex<String>>) -> Arc<dyn ExternalTool> {
        Arc::new(FnTool::new("fake-engine", move |input: ToolInput| {
            let css_path = &input.args[3];
            *seen_css.lock().unwrap() = fs::read_to_string(css_path).unwrap();
            fs::write(&input.args[1], b"%PDF-1.7 fake").unwrap();
            Ok(ToolOutput::default())
        }))
    }

    #[test]
    fn test_renders_with_ordered_css() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(String::new()));
        let renderer = EnginePageRenderer::new(RenderingEngine::Weasyprint, writing_tool(seen.clone()));
        let output = dir.path().join("pdf/SOP-001.pdf");
        let artifact = renderer
            .render(
                "<html></html>",
                &[
                    CssSource::inline("layout", ".frame-title { top: 0.5in; }"),
                    CssSource::inline("theme", "body { font-size: 11pt; }"),
                ],
                &output,
            )
            .unwrap();
        assert_eq!(artifact.path, output);
        assert_eq!(artifact.bytes, 13);
        let css = seen.lock().unwrap().clone();
        assert!(css.find(".frame-title").unwrap() < css.find("body {").unwrap());
    }

    #[test]
    fn test_tool_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tool: Arc<dyn ExternalTool> = Arc::new(FnTool::new("fake-engine", |_input: ToolInput| {
            Err(ToolError::Failed {
                program: "fake-engine".into(),
                code: Some(1),
                stderr: "bad css".into(),
            })
        }));
        let renderer = EnginePageRenderer::new(RenderingEngine::Weasyprint, tool);
        let err = renderer.render("<html></html>", &[], &dir.path().join("x.pdf")).unwrap_err();
        assert!(matches!(err, RenderError::Tool(ToolError::Failed { .. })));
        assert!(err.to_string().contains("bad css"));
    }

    #[test]
    fn test_engine_without_html_support() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = EnginePageRenderer::new(
            RenderingEngine::Scribus,
            writing_tool(Arc::new(Mutex::new(String::new()))),
        );
        let err = renderer.render("<html></html>", &[], &dir.path().join("x.pdf")).unwrap_err();
        assert!(matches!(err, RenderError::Capability { ref engine, .. } if engine == "scribus"));
    }

    #[test]
    fn test_silent_engine_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let tool: Arc<dyn ExternalTool> =
            Arc::new(FnTool::new("noop", |_input: ToolInput| Ok(ToolOutput::default())));
        let renderer = EnginePageRenderer::new(RenderingEngine::Weasyprint, tool);
        let err = renderer.render("<html></html>", &[], &dir.path().join("x.pdf")).unwrap_err();
        assert!(matches!(err, RenderError::MissingOutput(_)));
    }

    #[test]
    fn test_custom_arg_template() {
        let renderer = EnginePageRenderer::new(
            RenderingEngine::Weasyprint,
            Arc::new(FnTool::new("x", |_i: ToolInput| Ok(ToolOutput::default()))),
        )
        .with_args(["-s", "{stylesheet}", "{input}", "-o", "{output}"]);
        let args = renderer.expand_args(Path::new("/t/in.html"), Path::new("/o/out.pdf"), Path::new("/t/c.css"));
        assert_eq!(args, vec!["-s", "/t/c.css", "/t/in.html", "-o", "/o/out.pdf"]);
    }
}
