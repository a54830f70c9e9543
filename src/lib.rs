//! diagshot
//!
//! Captures fixed-size PNG screenshots of local HTML pages that render
//! diagrams client-side (Mermaid and friends) using a headless browser.
//!
//! # Features
//!
//! - **CDP Backend** (default): Uses Chrome DevTools Protocol via headless Chrome
//! - **Pluggable sessions**: the batch driver talks to a `RenderSession`, so
//!   other backends (or test fakes) can stand in for Chrome
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cdp")]
//! # async fn capture_all() -> Result<(), Box<dyn std::error::Error>> {
//! use diagshot::{capture, cdp::CdpSession, job, CaptureConfig};
//!
//! let jobs = job::default_jobs();
//! let config = CaptureConfig::default();
//! let launch = config.launch.clone().sized_for(&jobs);
//!
//! let summary = capture::run_batch(
//!     &jobs,
//!     &config,
//!     move || CdpSession::launch(&launch),
//!     &mut std::io::stdout(),
//! )
//! .await?;
//! println!("{} captured, {} failed", summary.success_count(), summary.error_count());
//! # Ok(())
//! # }
//! # fn main() {}
//! ```

use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod job;
pub use job::DiagramJob;

pub mod capture;
pub use capture::{BatchSummary, JobOutcome};

// Async-friendly session API (worker-thread backed)
pub mod async_api;
pub use async_api::Session;

#[cfg(feature = "cdp")]
pub mod cdp;

/// Selector that matches once Mermaid has replaced its source with an SVG.
pub const DEFAULT_READY_SELECTOR: &str = ".mermaid svg";

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// How the browser process is started
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Run without a visible window
    pub headless: bool,
    /// Chrome/Chromium binary; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Initial window size
    pub window: Viewport,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            window: Viewport::default(),
        }
    }
}

impl LaunchSettings {
    /// Grow the initial window to fit the largest job viewport.
    pub fn sized_for(mut self, jobs: &[DiagramJob]) -> Self {
        for job in jobs {
            self.window.width = self.window.width.max(job.viewport_width);
            self.window.height = self.window.height.max(job.viewport_height);
        }
        self
    }
}

/// Configuration for a capture batch
///
/// The defaults reproduce the stock behavior: diagrams are read from the
/// current directory, images land in `images/` next to them, and a page counts
/// as rendered once `.mermaid svg` appears within ten seconds.
///
/// # Examples
///
/// ```
/// let cfg = diagshot::CaptureConfig::default();
/// assert_eq!(cfg.ready_selector, ".mermaid svg");
/// assert_eq!(cfg.output_dir, std::path::PathBuf::from("images"));
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Directory the job file names are resolved against
    pub source_dir: PathBuf,
    /// Where PNGs are written; relative paths resolve against `source_dir`
    pub output_dir: PathBuf,
    /// CSS selector whose presence marks the diagram as rendered
    pub ready_selector: String,
    /// Upper bound on the wait for `ready_selector`, in milliseconds
    pub render_timeout_ms: u64,
    /// Extra delay after load before polling for the selector, in milliseconds
    pub settle_ms: u64,
    pub launch: LaunchSettings,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("images"),
            ready_selector: DEFAULT_READY_SELECTOR.to_string(),
            render_timeout_ms: 10_000,
            settle_ms: 2_000,
            launch: LaunchSettings::default(),
        }
    }
}

impl CaptureConfig {
    /// Output directory with relative paths anchored at the source directory.
    pub fn resolved_output_dir(&self) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            self.source_dir.join(&self.output_dir)
        }
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Core trait for rendering backends
///
/// A session owns one browser page that is reused for every job. All calls
/// block until the browser has answered; `Session` wraps an implementation in
/// a worker thread to offer the same operations asynchronously.
pub trait RenderSession {
    /// Resize the page viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Navigate to a URL and wait for the page load to finish
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait until `selector` matches an element, failing with
    /// `Error::RenderTimeout` once `timeout` has elapsed
    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Capture a PNG of the rectangle `(0, 0, clip.width, clip.height)`
    fn capture_png(&mut self, clip: Viewport) -> Result<Vec<u8>>;

    /// Close the session and terminate the browser
    fn close(self) -> Result<()>
    where
        Self: Sized;
}
