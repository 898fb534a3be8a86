//! # Metrics Module
//!
//! Per-frame PSNR and the statistics reported for each video pair.
//!
//! - [`psnr`] - the PSNR kernel over two equally shaped pixel buffers
//! - [`reducer`] - streams a [`FrameSourcePair`](crate::video::FrameSourcePair)
//!   through the kernel into a [`PsnrSequence`]
//! - [`summary`] - min/max/median and generic threshold filters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use psnr_compare::metrics::{measure_pair, Comparison, MetricsSummary};
//! use psnr_compare::video::FfmpegOpener;
//!
//! # fn main() -> psnr_compare::Result<()> {
//! let measurement = measure_pair(&FfmpegOpener::default(), "reference.mov", "compressed.mp4")?;
//! let summary = MetricsSummary::new(&measurement.sequence)?;
//!
//! println!("median PSNR: {:.3} dB", summary.median());
//! let poor = summary.filter_by(Comparison::Below, 30.0);
//! println!("{}% of frames below 30 dB", poor.ratio);
//! # Ok(())
//! # }
//! ```

pub mod psnr;
pub mod reducer;
pub mod summary;

pub use psnr::{psnr, psnr_with_peak, round3, MAX_8BIT, NEGLIGIBLE_SSE};
pub use reducer::{compute_psnr_sequence, measure_pair, PairMeasurement, PsnrSample, PsnrSequence, PsnrStream};
pub use summary::{Comparison, FilteredSamples, MetricsSummary, SummaryStats};
