use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use examscriber::config::{Config, ExportPipeline};
use examscriber::draw::PageAnnotations;
use examscriber::export::{self, document};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "examscriber")]
#[command(version, about = "Burn pen, highlighter and eraser annotations into exam papers")]
struct Cli {
    /// Read settings from this file instead of ~/.config/examscriber/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write annotations into a copy of a document
    Export {
        /// Source document
        #[arg(long, short = 'i', value_name = "PDF")]
        input: PathBuf,

        /// Annotations as JSON, keyed by 1-based page number
        #[arg(long, short = 'a', value_name = "JSON")]
        annotations: PathBuf,

        /// Where to write the annotated document
        #[arg(long, short = 'o', value_name = "PDF")]
        output: PathBuf,

        /// Override the configured export pipeline
        #[arg(long, value_enum)]
        pipeline: Option<ExportPipeline>,

        /// Override the configured raster scale (pixels per page unit)
        #[arg(long, value_name = "SCALE")]
        raster_scale: Option<f64>,
    },

    /// Print the size of every page as JSON
    Pages {
        #[arg(long, short = 'i', value_name = "PDF")]
        input: PathBuf,
    },

    /// Write a documented config file to the default location
    InitConfig,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Export {
            input,
            annotations,
            output,
            pipeline,
            raster_scale,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(pipeline) = pipeline {
                config.export.pipeline = pipeline;
            }
            if let Some(scale) = raster_scale {
                config.export.raster_scale = scale;
                config.validate_and_clamp();
            }
            run_export(&config, &input, &annotations, &output)?;
        }
        Command::Pages { input } => {
            let bytes = fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let pages = document::read_page_infos(&bytes)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            println!("{}", serde_json::to_string_pretty(&pages)?);
        }
        Command::InitConfig => {
            let path = Config::create_default_file()?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn run_export(
    config: &Config,
    input: &Path,
    annotations_path: &Path,
    output: &Path,
) -> Result<()> {
    let source =
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let annotation_json = fs::read_to_string(annotations_path)
        .with_context(|| format!("Failed to read {}", annotations_path.display()))?;
    let annotations: PageAnnotations = serde_json::from_str(&annotation_json).with_context(|| {
        format!(
            "Failed to parse annotations from {}",
            annotations_path.display()
        )
    })?;

    // The document itself is the source of page geometry.
    let pages = document::read_page_infos(&source)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let exporter = export::exporter_for(&config.export, runtime.handle());

    log::info!(
        "Exporting {} annotated pages with the {} pipeline",
        annotations.len(),
        config.export.pipeline.as_str()
    );
    let progress: export::ProgressCallback = Box::new(|value| {
        log::info!("Export progress: {:.0}%", value * 100.0);
    });
    let bytes = runtime
        .block_on(exporter.export(source, &pages, &annotations, Some(progress)))
        .context("Export failed")?;

    fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!("Wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}
