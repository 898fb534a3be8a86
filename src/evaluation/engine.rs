use std::sync::Arc;

use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::{Config, VideoPairConfig},
    error::{QualityError, Result},
    metrics::{measure_pair, Comparison, MetricsSummary, PsnrSequence},
    video::{ShortRead, SourceOpener},
};

/// Runs every configured video pair and collects the results
///
/// Pairs are independent: each one opens its own decoders, so they are
/// spread over a dedicated rayon pool sized by `processing.workers`. Results
/// keep the configuration order regardless of completion order.
pub struct Evaluator {
    config: Config,
    opener: Arc<dyn SourceOpener>,
}

impl Evaluator {
    /// Create an evaluator with an explicit decoder backend
    pub fn new(config: Config, opener: Arc<dyn SourceOpener>) -> Self {
        Self { config, opener }
    }

    /// Create an evaluator using the decoder named in the configuration
    pub fn from_config(config: Config) -> Self {
        let opener = config.processing.decoder.opener(config.processing.ffmpeg_opener());
        Self::new(config, opener)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluate all pairs
    ///
    /// Pair-scoped failures (unopenable sources, mismatched geometry, nothing
    /// decoded) are logged and recorded as skipped; any other error aborts
    /// the run.
    pub fn run(&self) -> Result<EvaluationReport> {
        self.config.validate()?;

        let workers = self.config.processing.workers.min(self.config.videos.len()).max(1);
        info!(
            "Evaluating {} video pairs with {} workers ({} decoder)",
            self.config.videos.len(),
            workers,
            self.opener.name()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("psnr-worker-{}", i))
            .build()
            .map_err(|e| QualityError::generic(format!("Failed to start worker pool: {}", e)))?;

        let results: Vec<Result<PairOutcome>> = pool.install(|| {
            self.config
                .videos
                .par_iter()
                .enumerate()
                .map(|(index, video)| self.evaluate_entry(index, video))
                .collect()
        });
        let outcomes = results.into_iter().collect::<Result<Vec<_>>>()?;

        let report = EvaluationReport {
            generated_at: Local::now(),
            total_videos: self.config.videos.len(),
            outcomes,
        };

        info!(
            "Evaluation complete: {} evaluated, {} skipped",
            report.evaluated().count(),
            report.skipped().count()
        );
        Ok(report)
    }

    fn evaluate_entry(&self, index: usize, video: &VideoPairConfig) -> Result<PairOutcome> {
        info!("videos: {} {}", video.reference_video, video.compressed_video);

        match evaluate_pair(self.opener.as_ref(), index, video) {
            Ok(report) => Ok(PairOutcome::Evaluated(report)),
            Err(e) if e.is_pair_scoped() => {
                warn!(
                    reference = %video.reference_video,
                    compressed = %video.compressed_video,
                    error = %e,
                    "videos {} and {} were skipped",
                    video.reference_video,
                    video.compressed_video
                );
                Ok(PairOutcome::Skipped(SkippedPair {
                    index,
                    reference: video.reference_video.clone(),
                    compressed: video.compressed_video.clone(),
                    reason: e.to_string(),
                }))
            }
            Err(e) => Err(e),
        }
    }
}

/// Measure one pair and summarise it against its threshold
pub fn evaluate_pair(opener: &dyn SourceOpener, index: usize, video: &VideoPairConfig) -> Result<PairReport> {
    let measurement = measure_pair(opener, &video.reference_video, &video.compressed_video)?;
    let summary = MetricsSummary::new(&measurement.sequence)?;
    let below = summary.filter_by(Comparison::Below, video.threshold);

    debug!(
        reference = %video.reference_video,
        min = summary.min(),
        max = summary.max(),
        median = summary.median(),
        below = below.count,
        "pair summary"
    );

    Ok(PairReport {
        index,
        reference: video.reference_video.clone(),
        compressed: video.compressed_video.clone(),
        threshold: video.threshold,
        reference_frames: measurement.reported_frames.reference,
        compressed_frames: measurement.reported_frames.compressed,
        processed_frames: measurement.sequence.len(),
        max_psnr: summary.max(),
        min_psnr: summary.min(),
        median_psnr: summary.median(),
        frames_below_threshold: below.count,
        ratio_below_threshold: below.ratio,
        short_read: measurement.short_read,
        frames: measurement.sequence,
    })
}

/// Results for one successfully compared pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    /// Position in the configuration
    pub index: usize,
    pub reference: String,
    pub compressed: String,
    /// dB
    pub threshold: f64,
    /// Reported by the reference container
    pub reference_frames: u64,
    /// Reported by the compressed container
    pub compressed_frames: u64,
    /// Aligned frames actually compared
    pub processed_frames: usize,
    pub max_psnr: f64,
    pub min_psnr: f64,
    pub median_psnr: f64,
    pub frames_below_threshold: usize,
    /// Percentage of processed frames strictly below `threshold`
    pub ratio_below_threshold: f64,
    pub short_read: Option<ShortRead>,
    pub frames: PsnrSequence,
}

/// A pair that could not be evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub index: usize,
    pub reference: String,
    pub compressed: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairOutcome {
    Evaluated(PairReport),
    Skipped(SkippedPair),
}

/// Everything a report is rendered from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Local>,
    pub total_videos: usize,
    pub outcomes: Vec<PairOutcome>,
}

impl EvaluationReport {
    pub fn evaluated(&self) -> impl Iterator<Item = &PairReport> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PairOutcome::Evaluated(report) => Some(report),
            PairOutcome::Skipped(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedPair> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PairOutcome::Skipped(skipped) => Some(skipped),
            PairOutcome::Evaluated(_) => None,
        })
    }
}
