use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use psnr_compare::{
    config::Config,
    evaluation::Evaluator,
    report::{ReportFormat, ReportWriter},
    video::DecoderKind,
    QualityError,
};

#[derive(Parser)]
#[command(
    name = "psnr-compare",
    version,
    about = "Compare compressed videos against their references with per-frame PSNR",
    long_about = "psnr-compare decodes each reference/compressed pair from the configuration in lock-step, computes PSNR for every aligned frame and writes a report with min, max and median PSNR and the share of frames below each pair's threshold."
)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Directory reports are written to (overrides report.folder)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Report format, may be repeated (overrides report.formats)
    #[arg(short, long = "format")]
    formats: Vec<ReportFormat>,

    /// Number of pairs evaluated concurrently (overrides processing.workers)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Decoder backend: auto, ffmpeg or image-sequence (overrides processing.decoder)
    #[arg(short, long)]
    decoder: Option<DecoderKind>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.report.folder = Some(dir.clone());
        }
        if !self.formats.is_empty() {
            config.report.formats = self.formats.clone();
        }
        if let Some(jobs) = self.jobs {
            config.processing.workers = jobs;
        }
        if let Some(decoder) = self.decoder {
            config.processing.decoder = decoder;
        }
    }
}

fn friendly(e: QualityError) -> anyhow::Error {
    anyhow!(e.user_message())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting psnr-compare v{}", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from {:?}", cli.config);

    let mut config = Config::from_file(&cli.config).map_err(friendly)?;
    cli.apply_overrides(&mut config);

    if let Some(folder) = &config.report.folder {
        if !folder.is_dir() {
            warn!("Report folder {:?} does not exist, using the working directory", folder);
        }
    }

    let evaluator = Evaluator::from_config(config);
    let report = evaluator.run().map_err(friendly)?;

    let writer = ReportWriter::from_config(&evaluator.config().report, &report.generated_at).map_err(friendly)?;
    for path in writer.write(&report).map_err(friendly)? {
        info!("Report saved to: {:?}", path);
    }

    let skipped = report.skipped().count();
    if skipped > 0 {
        warn!("{} of {} video pairs were skipped", skipped, report.total_videos);
    }
    Ok(())
}
