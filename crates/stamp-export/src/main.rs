//! Stamp Export CLI
//!
//! Renders canvas data (inline JSON or a JSON file) to a PNG file.

use clap::Parser;
use stamp_core::viewer::DEFAULT_SETTLE_DELAY;
use stamp_export::{DEFAULT_READY_TIMEOUT, ExportOptions, parse_scale_factor, run};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "stamp-export", about = "Render stamp canvas data to a PNG file")]
struct Cli {
    /// Output file path for the generated image
    #[arg(short, long)]
    output: PathBuf,

    /// Canvas JSON string or path to a JSON file containing canvas data
    #[arg(short, long)]
    input: String,

    /// Reuse the render bundle from a previous run
    #[arg(short, long)]
    skip_build: bool,

    /// Show more logs
    #[arg(short, long)]
    debug: bool,

    /// Accepted for compatibility; rendering does not use a browser
    #[arg(short, long)]
    browser: bool,

    /// Allow file:// image sources outside the bundle and files directories
    #[arg(short = 'N', long)]
    no_sandbox: bool,

    /// Output pixels per canvas unit
    #[arg(short = 'S', long, default_value = "2", value_parser = scale_factor)]
    scale_factor: f64,

    /// Keep the render bundle used by the process
    #[arg(short, long)]
    no_cleanup: bool,

    /// Directory resolving stored image references
    #[arg(long, env = "STAMP_FILES_DIR")]
    files_dir: Option<PathBuf>,

    /// Where the render bundle is staged
    #[arg(long, env = "STAMP_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// How long to wait for every image to load
    #[arg(long, default_value_t = DEFAULT_READY_TIMEOUT.as_millis() as u64)]
    ready_timeout_ms: u64,

    /// Extra wait after the last image loaded
    #[arg(long, default_value_t = DEFAULT_SETTLE_DELAY.as_millis() as u64)]
    settle_ms: u64,
}

fn scale_factor(raw: &str) -> Result<f64, String> {
    parse_scale_factor(raw).map_err(|e| e.to_string())
}

impl Cli {
    fn into_options(self) -> ExportOptions {
        let mut options = ExportOptions::new(self.output, self.input)
            .with_scale_factor(self.scale_factor)
            .with_settle_delay(Duration::from_millis(self.settle_ms));
        if let Some(work_dir) = self.work_dir {
            options = options.with_work_dir(work_dir);
        }
        options.skip_build = self.skip_build;
        options.debug = self.debug;
        options.browser = self.browser;
        options.sandbox = !self.no_sandbox;
        options.cleanup = !self.no_cleanup;
        options.files_dir = self.files_dir;
        options.ready_timeout = Duration::from_millis(self.ready_timeout_ms);
        options
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let options = cli.into_options();
    if options.debug {
        log::debug!("Export options: {:?}", options);
    }
    let code = run(&options).await;
    std::process::exit(code);
}
