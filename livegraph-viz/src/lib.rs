//! LiveGraph Visualization - renderers for property dependency graphs
//!
//! A renderer receives one [`PropertyGraph`] at a time together with
//! [`LayoutOptions`] and produces text in its format: Graphviz DOT,
//! vis-network JSON or an indented tree. [`follow`] re-renders every time a
//! live pipeline publishes a new graph set.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod graph_dot;
pub mod graphviz;
pub mod text;
pub mod vis;

pub use graph_dot::DotExporter;
pub use graphviz::{check_graphviz_installed, render_dot_to_file, render_dot_to_string, LayoutEngine, OutputFormat};
pub use text::TextRenderer;
pub use vis::VisRenderer;

use anyhow::{bail, Result};
use livegraph_core::{LayoutDirection, LiveGraphConfig, PropertyGraph};
use livegraph_utils::logging::get_logger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// How a renderer should lay a graph out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub hierarchical: bool,
    pub direction: LayoutDirection,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            hierarchical: true,
            direction: LayoutDirection::Rl,
        }
    }
}

impl From<&LiveGraphConfig> for LayoutOptions {
    fn from(config: &LiveGraphConfig) -> Self {
        Self {
            hierarchical: true,
            direction: config.layout_direction,
        }
    }
}

/// Draws one property graph
pub trait GraphRenderer: Send + Sync {
    fn render(&self, graph: &PropertyGraph, layout: &LayoutOptions) -> Result<String>;

    /// Short format name used in logs and on the command line
    fn format_name(&self) -> &'static str;

    /// Render every graph of a set, separated by blank lines
    fn render_all(&self, graphs: &[PropertyGraph], layout: &LayoutOptions) -> Result<String> {
        let rendered = graphs
            .iter()
            .map(|graph| self.render(graph, layout))
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join("\n"))
    }
}

/// Text formats a graph can be rendered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    Dot,
    Vis,
    #[default]
    Text,
}

impl RenderFormat {
    pub fn renderer(self) -> Box<dyn GraphRenderer> {
        match self {
            Self::Dot => Box::new(DotExporter::new()),
            Self::Vis => Box::new(VisRenderer::new()),
            Self::Text => Box::new(TextRenderer::new()),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Vis => "json",
            Self::Text => "txt",
        }
    }
}

impl std::fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Dot => "dot",
            Self::Vis => "vis",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for RenderFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "vis" | "json" => Ok(Self::Vis),
            "text" | "txt" => Ok(Self::Text),
            _ => bail!("Unknown render format: {}. Supported: dot, vis, text", s),
        }
    }
}

/// Render each newly published graph set until the publisher goes away.
///
/// The set current at the time of the call is rendered first. `sink`
/// receives every graph with its rendering, in publication order.
pub async fn follow<F>(
    renderer: &dyn GraphRenderer,
    layout: LayoutOptions,
    mut graphs: watch::Receiver<Arc<Vec<PropertyGraph>>>,
    mut sink: F,
) -> Result<()>
where
    F: FnMut(&PropertyGraph, String),
{
    let logger = get_logger("livegraph.viz");
    loop {
        let current = Arc::clone(&graphs.borrow_and_update());
        logger.debug(&format!(
            "Rendering {} graphs as {}",
            current.len(),
            renderer.format_name()
        ));
        for graph in current.iter() {
            sink(graph, renderer.render(graph, &layout)?);
        }
        if graphs.changed().await.is_err() {
            return Ok(());
        }
    }
}
