//! Graphviz integration.
//!
//! Turns DOT text into SVG, PNG or PDF with the Graphviz command-line tools.
//! Nothing here is needed for DOT output itself; only rendered images
//! require Graphviz to be installed.

use anyhow::{bail, Context, Result};
use livegraph_core::PropertyGraph;
use livegraph_utils::logging::get_logger;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::graph_dot::DotExporter;
use crate::LayoutOptions;

/// Image format produced by Graphviz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Pdf,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            _ => bail!("Unknown output format: {}. Supported: svg, png, pdf", s),
        }
    }
}

/// Graphviz layout program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutEngine {
    /// Hierarchical layout
    Dot,
    /// Spring model layout
    Neato,
    /// Circular layout
    Circo,
}

impl LayoutEngine {
    /// The engine that honors `layout`
    pub fn for_layout(layout: &LayoutOptions) -> Self {
        if layout.hierarchical {
            Self::Dot
        } else {
            Self::Neato
        }
    }

    fn command(&self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Neato => "neato",
            Self::Circo => "circo",
        }
    }
}

impl std::fmt::Display for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}

impl std::str::FromStr for LayoutEngine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dot" => Ok(Self::Dot),
            "neato" => Ok(Self::Neato),
            "circo" => Ok(Self::Circo),
            _ => bail!("Unknown layout engine: {}. Supported: dot, neato, circo", s),
        }
    }
}

/// Version string of the installed Graphviz, or an install hint
pub fn check_graphviz_installed() -> Result<String> {
    match Command::new("dot").arg("-V").output() {
        Ok(output) if output.status.success() => {
            // dot prints its version on stderr
            let version = String::from_utf8_lossy(&output.stderr);
            Ok(version.trim().to_string())
        }
        Ok(_) => bail!("Graphviz 'dot' command failed"),
        Err(_) => bail!(
            "Graphviz not installed. Install with:\n  \
             Ubuntu/Debian: sudo apt install graphviz\n  \
             macOS: brew install graphviz\n  \
             Or download from: https://graphviz.org/download/"
        ),
    }
}

/// Write `dot_content` next to `output_path` and render it.
///
/// The DOT file keeps the `.dot` extension; the image gets the format's
/// extension. Returns the image path.
pub fn render_dot_to_file(
    dot_content: &str,
    output_path: &Path,
    format: OutputFormat,
    engine: LayoutEngine,
) -> Result<PathBuf> {
    let dot_file = output_path.with_extension("dot");
    std::fs::write(&dot_file, dot_content)
        .with_context(|| format!("Failed to write DOT file: {}", dot_file.display()))?;

    let output_file = output_path.with_extension(format.extension());
    let status = Command::new(engine.command())
        .arg(format!("-T{}", format.extension()))
        .arg(&dot_file)
        .arg("-o")
        .arg(&output_file)
        .status()
        .with_context(|| format!("Failed to execute Graphviz '{}' command", engine))?;

    if !status.success() {
        bail!("Graphviz rendering failed with non-zero exit code");
    }

    get_logger("livegraph.viz").info(&format!("Rendered {}", output_file.display()));
    Ok(output_file)
}

/// Render DOT content to an SVG string through the engine's stdin
pub fn render_dot_to_string(dot_content: &str, engine: LayoutEngine) -> Result<String> {
    let mut child = Command::new(engine.command())
        .arg("-Tsvg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn Graphviz '{}' process", engine))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(dot_content.as_bytes())
            .context("Failed to write DOT content to Graphviz stdin")?;
    }

    let result = child
        .wait_with_output()
        .context("Failed to wait for Graphviz process")?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        bail!("Graphviz rendering failed: {}", stderr);
    }

    String::from_utf8(result.stdout).context("Graphviz output is not valid UTF-8")
}

/// Render every property graph to `<dir>/<root>.<ext>`
pub fn render_graphs_to_dir(
    graphs: &[PropertyGraph],
    dir: &Path,
    layout: &LayoutOptions,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let exporter = DotExporter::new();
    let engine = LayoutEngine::for_layout(layout);

    graphs
        .iter()
        .map(|graph| {
            let dot = exporter.export(graph, layout);
            render_dot_to_file(&dot, &dir.join(file_stem(&graph.root)), format, engine)
        })
        .collect()
}

/// File-name-safe form of a property name
pub fn file_stem(property: &str) -> String {
    let stem: String = property
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livegraph_core::LayoutDirection;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("svg".parse::<OutputFormat>().unwrap(), OutputFormat::Svg);
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("pdf".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_layout_engine_for_layout() {
        let hierarchical = LayoutOptions::default();
        assert_eq!(LayoutEngine::for_layout(&hierarchical), LayoutEngine::Dot);

        let free = LayoutOptions {
            hierarchical: false,
            direction: LayoutDirection::Rl,
        };
        assert_eq!(LayoutEngine::for_layout(&free), LayoutEngine::Neato);
        assert_eq!(LayoutEngine::Neato.to_string(), "neato");
        assert!("sfdp".parse::<LayoutEngine>().is_err());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("fullName"), "fullName");
        assert_eq!(file_stem("a.b c"), "a_b_c");
        assert_eq!(file_stem(""), "_");
    }

    // Rendering itself needs Graphviz installed; the CLI tests cover DOT output.
}
