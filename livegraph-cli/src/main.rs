//! LiveGraph CLI entry point
//!
//! `analyze` runs every stage once, `watch` keeps a live pipeline on a file,
//! `export` writes rendered graphs and `sample` prints the default program.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use livegraph_core::{
    analyze_once, AnalysisReport, LayoutDirection, LiveGraphConfig, DEFAULT_SOURCE,
};
use livegraph_realtime::{FileEditor, LivePipeline, PipelineEvent};
use livegraph_utils::config::ConfigBuilder;
use livegraph_utils::logging::{basic_config, get_logger, LogLevel};
use livegraph_viz::graphviz::{file_stem, render_graphs_to_dir};
use livegraph_viz::{check_graphviz_installed, follow, LayoutOptions, OutputFormat, RenderFormat};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "livegraph")]
#[command(about = "Live property dependency graphs for observable class definitions")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Layout direction hint (UD, DU, LR, RL)
    #[arg(short = 'd', long, global = true)]
    direction: Option<LayoutDirection>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage once over a file and print the results
    Analyze {
        file: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Follow a file, printing the graphs every time they change
    Watch {
        file: PathBuf,

        #[arg(short = 'f', long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Write one rendered graph per property
    Export {
        file: PathBuf,

        #[arg(short = 'f', long, value_enum, default_value_t = ExportFormat::Dot)]
        format: ExportFormat,

        /// Output directory; text formats print to stdout without it
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Print the default sample program
    Sample,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GraphFormat {
    Dot,
    Vis,
    Text,
}

impl From<GraphFormat> for RenderFormat {
    fn from(format: GraphFormat) -> Self {
        match format {
            GraphFormat::Dot => RenderFormat::Dot,
            GraphFormat::Vis => RenderFormat::Vis,
            GraphFormat::Text => RenderFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportFormat {
    Dot,
    Vis,
    Text,
    Svg,
    Png,
    Pdf,
}

/// Where an export format comes from
enum ExportTarget {
    Rendered(RenderFormat),
    Graphviz(OutputFormat),
}

impl ExportFormat {
    fn target(self) -> ExportTarget {
        match self {
            Self::Dot => ExportTarget::Rendered(RenderFormat::Dot),
            Self::Vis => ExportTarget::Rendered(RenderFormat::Vis),
            Self::Text => ExportTarget::Rendered(RenderFormat::Text),
            Self::Svg => ExportTarget::Graphviz(OutputFormat::Svg),
            Self::Png => ExportTarget::Graphviz(OutputFormat::Png),
            Self::Pdf => ExportTarget::Graphviz(OutputFormat::Pdf),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    basic_config(Some(LogLevel::from_verbosity(cli.verbose)))?;

    let config = load_config(cli.config.as_deref(), cli.direction)?;

    match cli.command {
        Commands::Analyze { file, json } => analyze(&file, config, json).await,
        Commands::Watch { file, format } => watch(&file, config, format.into()).await,
        Commands::Export { file, format, output } => {
            export(&file, config, format, output.as_deref()).await
        }
        Commands::Sample => {
            println!("{}", DEFAULT_SOURCE);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>, direction: Option<LayoutDirection>) -> Result<LiveGraphConfig> {
    let mut builder = ConfigBuilder::<LiveGraphConfig>::new();
    if let Some(path) = path {
        builder = builder
            .load_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    }
    let mut config = builder.build()?;
    if let Some(direction) = direction {
        config.layout_direction = direction;
    }
    Ok(config)
}

fn read_source(path: &Path) -> Result<String> {
    if !livegraph_utils::is_source_file(path) {
        get_logger("livegraph.cli").warning(&format!(
            "{} does not look like a JavaScript module",
            path.display()
        ));
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

async fn run_once(path: &Path, config: LiveGraphConfig) -> Result<AnalysisReport> {
    let source = read_source(path)?;
    let resolver = config.resolver();
    let report = analyze_once(&source, &resolver, config).await;
    for skipped in &report.skipped {
        eprintln!("Skipped {} ({}): {}", skipped.stage, skipped.category, skipped.message);
    }
    Ok(report)
}

async fn analyze(path: &Path, config: LiveGraphConfig, json: bool) -> Result<()> {
    let layout = LayoutOptions::from(&config);
    let report = run_once(path, config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Property definitions:");
    println!("  {}", report.prop_definitions.as_deref().unwrap_or("-"));
    println!("Imports: {}", report.imports.as_ref().map(|i| i.join(", ")).unwrap_or_else(|| "-".to_string()));

    println!("Dependencies:");
    match &report.dependencies {
        Some(dependencies) => {
            for (property, reads) in dependencies.iter() {
                println!("  {}: [{}]", property, reads.join(", "));
            }
        }
        None => println!("  -"),
    }

    println!("Graphs:");
    let rendered = RenderFormat::Text.renderer().render_all(&report.graphs, &layout)?;
    print!("{}", rendered);
    Ok(())
}

async fn export(
    path: &Path,
    config: LiveGraphConfig,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let logger = get_logger("livegraph.cli");
    let layout = LayoutOptions::from(&config);
    let report = run_once(path, config).await?;
    if report.graphs.is_empty() {
        bail!("No graphs produced for {}", path.display());
    }

    match format.target() {
        ExportTarget::Rendered(render_format) => {
            let renderer = render_format.renderer();
            let Some(dir) = output else {
                println!("{}", renderer.render_all(&report.graphs, &layout)?);
                return Ok(());
            };
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            for graph in &report.graphs {
                let file = dir.join(format!("{}.{}", file_stem(&graph.root), render_format.extension()));
                std::fs::write(&file, renderer.render(graph, &layout)?)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                println!("{}", file.display());
            }
        }
        ExportTarget::Graphviz(image_format) => {
            let version = check_graphviz_installed()?;
            logger.info(&format!("Using {}", version));
            let dir = output.unwrap_or_else(|| Path::new("graphs"));
            for file in render_graphs_to_dir(&report.graphs, dir, &layout, image_format)? {
                println!("{}", file.display());
            }
        }
    }
    Ok(())
}

async fn watch(path: &Path, config: LiveGraphConfig, format: RenderFormat) -> Result<()> {
    let logger = get_logger("livegraph.cli");
    let layout = LayoutOptions::from(&config);
    let initial = read_source(path)?;

    let mut handle = LivePipeline::new(config).start(initial.clone());
    let (_file_editor, current) = FileEditor::attach(path, handle.editor.clone())?;
    if current != initial {
        handle.editor.change(current)?;
    }
    logger.info(&format!("Watching {} (Ctrl-C to stop)", path.display()));

    let renderer = format.renderer();
    let rendering = follow(&*renderer, layout, handle.graphs.clone(), |_, output| {
        println!("{}", output);
    });
    tokio::pin!(rendering);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            result = &mut rendering => {
                result?;
                break;
            }
            Some(event) = handle.events.recv() => match event {
                PipelineEvent::StageSkipped { stage, category, message, .. } => {
                    eprintln!("Skipped {} ({}): {}", stage, category, message);
                }
                PipelineEvent::SynthesisDiscarded { generation, .. } => {
                    logger.debug(&format!("Discarded stale synthesis #{}", generation));
                }
                PipelineEvent::SourceStabilized { .. } => logger.debug("Source stabilized"),
                _ => {}
            },
        }
    }

    handle.shutdown().await;
    Ok(())
}
