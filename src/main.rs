use clap::{Parser, Subcommand};
use folio::layout::{build_layout_css, extract_layout_file, validate_css, CssOptions};
use folio::style::{LengthUnit, Margins, PageSize};
use folio::{
    BuildJob, DocumentPipeline, DocumentRegistry, Family, PipelineBuilder, PipelineConfig, PipelineError,
};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Build styled HTML and PDF documents from Markdown drafts.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about, long_about = None)]
struct Cli {
    /// Directory holding default.yaml, profiles/ and local.yaml.
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    /// Configuration profile merged over default.yaml.
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log at debug level (RUST_LOG still takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a single document.
    Build {
        file: PathBuf,
        /// Produce HTML only, skipping the page engine.
        #[arg(long, default_value_t = false)]
        html_only: bool,
    },
    /// Build every registered draft.
    BuildAll {
        /// Only documents of this family (SOP, STD, REF, APP).
        #[arg(long)]
        category: Option<Family>,
        /// Skip documents unchanged since their last build.
        #[arg(long, default_value_t = false)]
        incremental: bool,
        /// Worker threads; defaults to the configured value or the CPU count.
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long, default_value_t = false)]
        html_only: bool,
    },
    /// Remove generated outputs and the build cache.
    Clean,
    /// Rebuild a document whenever it or its stylesheets change.
    Watch {
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        html_only: bool,
    },
    /// List registered drafts and check their cross-references.
    Registry,
    /// Convert the frames of a Scribus SLA file into layout CSS.
    ExtractLayout {
        sla: PathBuf,
        #[arg(long, default_value = "letter")]
        page_size: PageSize,
        #[arg(long, default_value = "in")]
        unit: LengthUnit,
        /// Page margins as CSS shorthand, e.g. `0.5in` or `12mm 10mm`. Bare numbers are points.
        #[arg(long)]
        margin: Option<String>,
        /// Leave out `.style-*` rules for paragraph styles.
        #[arg(long, default_value_t = false)]
        no_styles: bool,
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn registry_for(config: &PipelineConfig) -> Result<DocumentRegistry, PipelineError> {
    if config.paths.drafts.is_dir() {
        DocumentRegistry::scan(&config.paths.drafts)
    } else {
        warn!("Drafts directory {} not found; wikilinks resolve against outputs only", config.paths.drafts.display());
        Ok(DocumentRegistry::default())
    }
}

fn pipeline_for(
    config: &PipelineConfig,
    registry: &DocumentRegistry,
    html_only: bool,
    incremental: bool,
) -> Result<DocumentPipeline, PipelineError> {
    let links = registry.link_registry_with_outputs(&config.paths.html_dir())?;
    PipelineBuilder::new()
        .with_config(config)?
        .with_link_registry(links)
        .with_page_rendering(!html_only)
        .with_incremental(incremental)
        .build()
}

fn build_one(config: &PipelineConfig, file: &Path, html_only: bool) -> Result<(), PipelineError> {
    let registry = registry_for(config)?;
    let pipeline = pipeline_for(config, &registry, html_only, false)?;
    let built = pipeline.build(file)?;
    for output in &built.outputs {
        println!("{}", output.display());
    }
    Ok(())
}

fn build_all(
    config: &PipelineConfig,
    category: Option<Family>,
    incremental: bool,
    workers: Option<usize>,
    html_only: bool,
) -> Result<bool, PipelineError> {
    let registry = DocumentRegistry::scan(&config.paths.drafts)?;
    for problem in registry.validate_cross_references() {
        warn!("{}", problem);
    }
    let jobs: Vec<BuildJob> = registry
        .records()
        .filter(|r| category.is_none_or(|family| r.family == family))
        .map(|r| BuildJob::new(&r.path).with_id(&r.id))
        .collect();
    if jobs.is_empty() {
        warn!("No documents to build");
        return Ok(true);
    }
    let pipeline = pipeline_for(config, &registry, html_only, incremental)?;
    let summary = pipeline.build_all(jobs, workers.unwrap_or_else(|| config.max_workers()));
    Ok(summary.is_success())
}

fn clean(config: &PipelineConfig) -> Result<(), PipelineError> {
    let pipeline = PipelineBuilder::new()
        .with_config(config)?
        .with_page_rendering(false)
        .build()?;
    let removed = pipeline.clean_outputs()?;
    info!("Removed {} item(s)", removed.len());
    Ok(())
}

fn list_registry(config: &PipelineConfig) -> Result<bool, PipelineError> {
    let registry = DocumentRegistry::scan(&config.paths.drafts)?;
    for record in registry.records() {
        println!(
            "{:<12} {:<8} {:<10} {}",
            record.id, record.family, record.status, record.title
        );
    }
    let problems = registry.validate_cross_references();
    for problem in &problems {
        println!("  ! {}", problem);
    }
    Ok(problems.is_empty())
}

fn extract_layout(
    sla: &Path,
    page_size: PageSize,
    unit: LengthUnit,
    margin: Option<&str>,
    include_styles: bool,
    output: Option<&Path>,
) -> Result<(), PipelineError> {
    let geometry = extract_layout_file(sla)?;
    let margins = match margin {
        Some(text) => Margins::parse_shorthand(text)
            .map_err(|e| PipelineError::Validation(format!("invalid margin '{}': {}", text, e)))?,
        None => Margins::default(),
    };
    let mut options = CssOptions::new(unit).with_margins(margins);
    options.include_styles = include_styles;
    let css = build_layout_css(&geometry, page_size, &options);
    validate_css(&css)?;
    info!(
        "Extracted {} frame(s) across {} page(s) from {}",
        geometry.frames.len(),
        geometry.pages.len(),
        sla.display()
    );
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, css)?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", css),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<bool, PipelineError> {
    let config = PipelineConfig::load(&cli.config_dir, cli.profile.as_deref())?;
    match cli.command {
        Command::Build { file, html_only } => build_one(&config, &file, html_only).map(|_| true),
        Command::BuildAll {
            category,
            incremental,
            workers,
            html_only,
        } => build_all(&config, category, incremental, workers, html_only),
        Command::Clean => clean(&config).map(|_| true),
        Command::Watch { file, html_only } => {
            let registry = registry_for(&config)?;
            let pipeline = pipeline_for(&config, &registry, html_only, false)?;
            folio::watch(&pipeline, &file, config.watch.debounce()).map(|_| true)
        }
        Command::Registry => list_registry(&config),
        Command::ExtractLayout {
            sla,
            page_size,
            unit,
            margin,
            no_styles,
            output,
        } => extract_layout(&sla, page_size, unit, margin.as_deref(), !no_styles, output.as_deref()).map(|_| true),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("[{}] {}", e.category(), e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
