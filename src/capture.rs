//! Batch driver: turns each diagram job into one PNG
//!
//! Jobs run strictly in order against a single shared [`Session`]. A failing
//! job is logged and counted; it never stops the batch. Only problems that
//! make the whole run impossible (bad job table, unwritable output directory,
//! browser launch failure) are returned as errors.

use crate::async_api::Session;
use crate::job::{self, DiagramJob};
use crate::{CaptureConfig, Error, RenderSession, Result};
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

/// What happened to one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Saved { job: String, path: PathBuf },
    Failed { job: String, message: String },
}

/// Per-job outcomes of a finished batch, in job order
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub output_dir: PathBuf,
    pub outcomes: Vec<JobOutcome>,
}

impl BatchSummary {
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, JobOutcome::Saved { .. }))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn saved_paths(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.iter().filter_map(|o| match o {
            JobOutcome::Saved { path, .. } => Some(path.as_path()),
            JobOutcome::Failed { .. } => None,
        })
    }
}

/// Run every job in `jobs` through a session built by `launch`.
///
/// Progress and the final summary are written to `out`.
pub async fn run_batch<S, F, W>(
    jobs: &[DiagramJob],
    config: &CaptureConfig,
    launch: F,
    out: &mut W,
) -> Result<BatchSummary>
where
    S: RenderSession + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
    W: Write,
{
    job::validate_jobs(jobs)?;

    writeln!(out, "Starting diagram image generation...\n")?;

    let output_dir = config.resolved_output_dir();
    if !output_dir.is_dir() {
        tokio::fs::create_dir_all(&output_dir).await?;
        writeln!(out, "Created output directory {}", output_dir.display())?;
    }

    let session = Session::launch(launch).await?;
    info!("Render session launched for {} jobs", jobs.len());

    let mut outcomes = Vec::with_capacity(jobs.len());
    for job in jobs {
        writeln!(out, "Capturing {}...", job.description)?;
        match capture_job(&session, job, config, &output_dir).await {
            Ok(path) => {
                debug!("Saved {} -> {}", job.source_file_name, path.display());
                writeln!(out, "   Saved: {}", display_path(&path, &config.source_dir))?;
                outcomes.push(JobOutcome::Saved {
                    job: job.source_file_name.clone(),
                    path,
                });
            }
            Err(e) => {
                warn!("Capture of {} failed: {}", job.source_file_name, e);
                writeln!(out, "   Error capturing {}: {}", job.source_file_name, e)?;
                outcomes.push(JobOutcome::Failed {
                    job: job.source_file_name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    if let Err(e) = session.close().await {
        warn!("Failed to close render session: {}", e);
    }

    let summary = BatchSummary { output_dir, outcomes };
    write_summary(out, &summary)?;
    Ok(summary)
}

/// Capture a single job and return the path of the written PNG.
pub async fn capture_job(
    session: &Session,
    job: &DiagramJob,
    config: &CaptureConfig,
    output_dir: &Path,
) -> Result<PathBuf> {
    let source = config.source_dir.join(&job.source_file_name);
    let source = match tokio::fs::canonicalize(&source).await {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::SourceMissing(source));
        }
        Err(e) => return Err(e.into()),
    };
    let url = url::Url::from_file_path(&source)
        .map_err(|_| Error::LoadError(format!("cannot build file URL for {}", source.display())))?;

    let viewport = job.viewport();
    session.set_viewport(viewport).await?;
    session.goto(url.as_str()).await?;

    let settle = config.settle_delay();
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }

    session
        .wait_for_selector(&config.ready_selector, config.render_timeout())
        .await?;

    let png = session.screenshot(viewport).await?;
    let path = output_dir.join(job.output_file_name());
    write_atomically(&path, &png).await?;
    Ok(path)
}

/// Write through a sibling `.part` file so a failed write never leaves a
/// truncated image behind.
async fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let written = match tokio::fs::write(&part, data).await {
        Ok(()) => tokio::fs::rename(&part, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(Error::CaptureError(format!(
            "failed to write {}: {}",
            path.display(),
            e
        )));
    }
    Ok(())
}

fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Print the closing summary block.
pub fn write_summary<W: Write>(out: &mut W, summary: &BatchSummary) -> std::io::Result<()> {
    writeln!(out, "\nSummary:")?;
    writeln!(out, "   Successfully generated: {} images", summary.success_count())?;
    writeln!(out, "   Errors: {}", summary.error_count())?;

    if summary.success_count() > 0 {
        writeln!(out, "\nImages saved to: {}", summary.output_dir.display())?;
        writeln!(out, "\nNext steps:")?;
        writeln!(out, "   1. Review generated images for quality")?;
        writeln!(out, "   2. Update presentation to use static images")?;
        writeln!(out, "   3. Test mobile compatibility")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(outcomes: Vec<JobOutcome>) -> BatchSummary {
        BatchSummary {
            output_dir: PathBuf::from("images"),
            outcomes,
        }
    }

    #[test]
    fn counts_follow_outcomes() {
        let s = summary(vec![
            JobOutcome::Saved {
                job: "a.html".into(),
                path: PathBuf::from("images/a.png"),
            },
            JobOutcome::Failed {
                job: "b.html".into(),
                message: "boom".into(),
            },
        ]);
        assert_eq!(s.success_count(), 1);
        assert_eq!(s.error_count(), 1);
        assert_eq!(s.saved_paths().collect::<Vec<_>>(), vec![Path::new("images/a.png")]);
    }

    #[test]
    fn summary_omits_next_steps_without_images() {
        let mut buf = Vec::new();
        write_summary(
            &mut buf,
            &summary(vec![JobOutcome::Failed {
                job: "a.html".into(),
                message: "missing".into(),
            }]),
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Successfully generated: 0 images"));
        assert!(text.contains("Errors: 1"));
        assert!(!text.contains("Next steps"));
    }

    #[test]
    fn display_path_is_relative_to_base() {
        let p = Path::new("/srv/d/images/a.png");
        assert_eq!(display_path(p, Path::new("/srv/d")), "images/a.png");
        assert_eq!(display_path(p, Path::new("/elsewhere")), "/srv/d/images/a.png");
    }

    #[tokio::test]
    async fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"old").unwrap();

        write_atomically(&path, b"new").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert!(!dir.path().join("a.png.part").exists());
    }
}
