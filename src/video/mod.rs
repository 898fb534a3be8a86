//! # Video Sources Module
//!
//! Decoder abstraction and the synchronized reference/compressed pair adapter.
//!
//! Concrete backends:
//!
//! - [`FfmpegOpener`] - any container ffmpeg understands, streamed as raw RGB
//! - [`ImageSequenceOpener`] - a directory of numbered stills
//! - [`MemoryOpener`] - frames already held in memory
//! - [`AutoOpener`] - directories as stills, everything else through ffmpeg

pub mod ffmpeg;
pub mod image_sequence;
pub mod memory;
pub mod opener;
pub mod pair;
pub mod source;
pub mod types;

pub use ffmpeg::{FfmpegOpener, FfmpegSource, ProbeInfo};
pub use image_sequence::{ImageSequenceOpener, ImageSequenceSource};
pub use memory::{MemoryOpener, MemorySource};
pub use opener::{AutoOpener, DecoderKind};
pub use pair::{FramePair, FrameSourcePair, NextFrame, ShortRead};
pub use source::{SourceOpener, VideoSource};
pub use types::{Frame, FrameCounts, StreamSide};
