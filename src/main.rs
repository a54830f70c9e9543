use anyhow::{Context, Result};
use clap::Parser;
use diagshot::cdp::CdpSession;
use diagshot::{capture, job, CaptureConfig, LaunchSettings, DEFAULT_READY_SELECTOR};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Capture PNG screenshots of locally rendered diagram pages
#[derive(Parser, Debug)]
#[command(name = "diagshot", version, about, long_about = None)]
struct Cli {
    /// Directory containing the diagram HTML files
    #[arg(long, env = "DIAGSHOT_DIR", default_value = ".")]
    dir: PathBuf,

    /// Output directory (relative paths resolve against --dir)
    #[arg(short, long, env = "DIAGSHOT_OUTPUT", default_value = "images")]
    output: PathBuf,

    /// JSON job table to use instead of the built-in one
    #[arg(long, env = "DIAGSHOT_JOBS")]
    jobs: Option<PathBuf>,

    /// Selector that marks a diagram as rendered
    #[arg(long, env = "DIAGSHOT_SELECTOR", default_value = DEFAULT_READY_SELECTOR)]
    selector: String,

    /// Render-wait timeout in milliseconds
    #[arg(long, env = "DIAGSHOT_TIMEOUT_MS", default_value_t = 10_000)]
    timeout_ms: u64,

    /// Extra delay after page load, in milliseconds
    #[arg(long, env = "DIAGSHOT_SETTLE_MS", default_value_t = 2_000)]
    settle_ms: u64,

    /// Chrome/Chromium binary to launch
    #[arg(long, env = "DIAGSHOT_CHROME")]
    chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Exit with status 2 when any diagram fails
    #[arg(long, env = "DIAGSHOT_STRICT")]
    strict: bool,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<bool> {
    let jobs = match &cli.jobs {
        Some(path) => job::load_jobs(path)?,
        None => job::default_jobs(),
    };

    let config = CaptureConfig {
        source_dir: cli.dir,
        output_dir: cli.output,
        ready_selector: cli.selector,
        render_timeout_ms: cli.timeout_ms,
        settle_ms: cli.settle_ms,
        launch: LaunchSettings {
            headless: !cli.headful,
            chrome_path: cli.chrome,
            ..Default::default()
        }
        .sized_for(&jobs),
    };

    let launch = config.launch.clone();
    let summary = capture::run_batch(
        &jobs,
        &config,
        move || CdpSession::launch(&launch),
        &mut std::io::stdout(),
    )
    .await
    .context("Diagram capture aborted")?;

    Ok(summary.error_count() == 0)
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    let strict = cli.strict;

    match run(cli).await {
        Ok(all_ok) => {
            if strict && !all_ok {
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("diagshot: {:#}", e);
            std::process::exit(1);
        }
    }
}
