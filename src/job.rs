//! Diagram jobs: the table of pages to capture
//!
//! A job names one local HTML file, the viewport it should be rendered at and
//! a human-readable label. Each job yields exactly one `<stem>.png`.

use crate::{Error, Result, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path};

/// One configured unit of work producing one output image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramJob {
    /// Source file name, relative to the source directory. Identifies the job.
    #[serde(rename = "file")]
    pub source_file_name: String,
    #[serde(rename = "width")]
    pub viewport_width: u32,
    #[serde(rename = "height")]
    pub viewport_height: u32,
    pub description: String,
}

impl DiagramJob {
    pub fn new(
        source_file_name: impl Into<String>,
        viewport_width: u32,
        viewport_height: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            source_file_name: source_file_name.into(),
            viewport_width,
            viewport_height,
            description: description.into(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    /// Output file name: the source name with its extension replaced by `png`.
    pub fn output_file_name(&self) -> String {
        Path::new(&self.source_file_name)
            .with_extension("png")
            .to_string_lossy()
            .into_owned()
    }
}

/// The built-in diagram table.
pub fn default_jobs() -> Vec<DiagramJob> {
    vec![
        DiagramJob::new(
            "system-architecture.html",
            1400,
            1000,
            "PathFindR System Architecture",
        ),
        DiagramJob::new(
            "agent-systems.html",
            1400,
            1200,
            "Development vs Production Agent Systems",
        ),
        DiagramJob::new("rag-pipeline.html", 1600, 900, "RAG Document Processing Pipeline"),
        DiagramJob::new(
            "context-optimization.html",
            1600,
            800,
            "Context Optimization Comparison",
        ),
    ]
}

/// Load a job table from a JSON array such as
/// `[{"file": "a.html", "width": 800, "height": 600, "description": "A"}]`.
pub fn load_jobs(path: &Path) -> Result<Vec<DiagramJob>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("cannot read job table {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::ConfigError(format!("malformed job table {}: {}", path.display(), e)))
}

pub fn parse_jobs(raw: &str) -> Result<Vec<DiagramJob>> {
    serde_json::from_str(raw).map_err(|e| Error::ConfigError(format!("malformed job table: {}", e)))
}

/// Check the table invariants: non-empty, positive viewports, unique source
/// names and unique output names.
pub fn validate_jobs(jobs: &[DiagramJob]) -> Result<()> {
    if jobs.is_empty() {
        return Err(Error::ConfigError("job table is empty".into()));
    }

    let mut sources = HashSet::new();
    let mut outputs = HashSet::new();
    for job in jobs {
        let name = job.source_file_name.as_str();
        // Outputs are flattened into the output directory, so sources must be
        // plain file names.
        let mut components = Path::new(name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(Error::ConfigError(format!(
                "job `{}` must be a plain file name",
                name
            )));
        }
        if Path::new(name).file_stem().is_none() {
            return Err(Error::ConfigError(format!("job `{}` has no file stem", name)));
        }
        if job.viewport_width == 0 || job.viewport_height == 0 {
            return Err(Error::ConfigError(format!(
                "job `{}` has an empty viewport ({}x{})",
                name, job.viewport_width, job.viewport_height
            )));
        }
        if !sources.insert(name) {
            return Err(Error::ConfigError(format!("duplicate job `{}`", name)));
        }
        let output = job.output_file_name();
        if !outputs.insert(output.clone()) {
            return Err(Error::ConfigError(format!(
                "job `{}` would overwrite output `{}`",
                name, output
            )));
        }
    }
    Ok(())
}
