//! # psnr-compare
//!
//! Frame-by-frame PSNR comparison of compressed videos against their
//! references, with per-pair min/max/median statistics and the share of
//! frames falling below a quality threshold.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use psnr_compare::{config::Config, evaluation::Evaluator, report::ReportWriter};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::from_file("compare.toml")?;
//! let evaluator = Evaluator::from_config(config);
//!
//! let report = evaluator.run()?;
//! let writer = ReportWriter::from_config(&evaluator.config().report, &report.generated_at)?;
//! for path in writer.write(&report)? {
//!     println!("{}", path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - decoder backends and lock-step frame pairing
//! - [`metrics`] - the PSNR kernel, per-frame sequences and statistics
//! - [`evaluation`] - runs every configured pair and collects results
//! - [`report`] - HTML and JSON output
//! - [`config`] - configuration management
//!
//! ## Custom decoders
//!
//! Any frame source can take part by implementing
//! [`VideoSource`](video::VideoSource) and handing out instances from a
//! [`SourceOpener`](video::SourceOpener):
//!
//! ```rust,no_run
//! use psnr_compare::video::{Frame, VideoSource};
//! use psnr_compare::Result;
//!
//! struct Flat(u64);
//!
//! impl VideoSource for Flat {
//!     fn identifier(&self) -> &str {
//!         "flat"
//!     }
//!
//!     fn dimensions(&self) -> (u32, u32) {
//!         (320, 240)
//!     }
//!
//!     fn reported_frame_count(&self) -> u64 {
//!         10
//!     }
//!
//!     fn read_frame(&mut self) -> Result<Option<Frame>> {
//!         self.0 += 1;
//!         Ok((self.0 <= 10).then(|| Frame::new_black(320, 240)))
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod metrics;
pub mod report;
pub mod video;

pub use config::Config;
pub use error::{QualityError, Result};
pub use evaluation::{EvaluationReport, Evaluator};
pub use report::{ReportFormat, ReportWriter};
