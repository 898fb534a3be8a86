use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::video::source::{SourceOpener, VideoSource};
use crate::video::types::{Frame, FrameCounts, StreamSide};

/// Reference and compressed frames taken from the same position in each stream
#[derive(Debug, Clone)]
pub struct FramePair {
    pub index: u64,
    pub reference: Frame,
    pub compressed: Frame,
}

/// Outcome of one lock-step read
#[derive(Debug, Clone)]
pub enum NextFrame {
    Pair(FramePair),
    /// At least one decoder could not produce a frame
    EndOfStream,
}

/// Where and why the pair stopped producing frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortRead {
    /// Position of the read that came up short
    pub frame_index: u64,
    /// Sources that did not deliver a frame at `frame_index`
    pub exhausted: Vec<StreamSide>,
    /// True when some exhausted source ended before its reported frame count
    pub premature: bool,
}

/// Two independently decoded streams read in lock-step
///
/// Construction validates that both sources share the same frame geometry
/// before a single frame is decoded. Both decoders are released on every
/// exit path: failed construction, explicit [`FrameSourcePair::close`], or drop.
pub struct FrameSourcePair {
    reference: Box<dyn VideoSource>,
    compressed: Box<dyn VideoSource>,
    geometry: (u32, u32),
    counts: FrameCounts,
    position: u64,
    short_read: Option<ShortRead>,
    finished: bool,
}

impl std::fmt::Debug for FrameSourcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSourcePair")
            .field("reference", &self.reference.identifier())
            .field("compressed", &self.compressed.identifier())
            .field("geometry", &self.geometry)
            .field("position", &self.position)
            .field("finished", &self.finished)
            .finish()
    }
}

impl FrameSourcePair {
    /// Open both identifiers through `opener` and validate them as a pair
    pub fn open(opener: &dyn SourceOpener, reference: &str, compressed: &str) -> Result<Self> {
        let reference = opener.open(reference)?;
        // If this fails, `reference` is dropped here and releases its decoder.
        let compressed = opener.open(compressed)?;
        Self::from_sources(reference, compressed)
    }

    /// Pair two already-open sources
    ///
    /// Fails with `VideoError::DimensionMismatch` when the reported frame
    /// sizes differ; both sources are closed before the error is returned.
    pub fn from_sources(
        mut reference: Box<dyn VideoSource>,
        mut compressed: Box<dyn VideoSource>,
    ) -> Result<Self> {
        let reference_size = reference.dimensions();
        let compressed_size = compressed.dimensions();

        if reference_size != compressed_size {
            let err = VideoError::DimensionMismatch {
                reference: reference.identifier().to_string(),
                compressed: compressed.identifier().to_string(),
                reference_size,
                compressed_size,
            };
            close_quietly(reference.as_mut());
            close_quietly(compressed.as_mut());
            return Err(err.into());
        }

        let counts = FrameCounts {
            reference: reference.reported_frame_count(),
            compressed: compressed.reported_frame_count(),
        };

        debug!(
            reference = reference.identifier(),
            compressed = compressed.identifier(),
            width = reference_size.0,
            height = reference_size.1,
            reference_frames = counts.reference,
            compressed_frames = counts.compressed,
            "opened source pair"
        );

        Ok(Self {
            reference,
            compressed,
            geometry: reference_size,
            counts,
            position: 0,
            short_read: None,
            finished: false,
        })
    }

    /// Frame counts reported by the two containers
    pub fn reported_frame_counts(&self) -> FrameCounts {
        self.counts
    }

    /// Shared frame size `(width, height)`
    pub fn geometry(&self) -> (u32, u32) {
        self.geometry
    }

    pub fn reference_id(&self) -> &str {
        self.reference.identifier()
    }

    pub fn compressed_id(&self) -> &str {
        self.compressed.identifier()
    }

    /// Why the pair stopped, once it has
    pub fn short_read(&self) -> Option<&ShortRead> {
        self.short_read.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance both decoders by exactly one frame
    ///
    /// Once either side fails to deliver, the pair is finished and every
    /// further call returns [`NextFrame::EndOfStream`] without touching the
    /// decoders. A delivered frame whose size differs from the validated
    /// geometry is an error.
    pub fn next_pair(&mut self) -> Result<NextFrame> {
        if self.finished {
            return Ok(NextFrame::EndOfStream);
        }

        let index = self.position;
        let reference = read_side(self.reference.as_mut(), index);
        let compressed = read_side(self.compressed.as_mut(), index);

        match (reference, compressed) {
            (Some(reference), Some(compressed)) => {
                self.check_geometry(&reference, StreamSide::Reference, index)?;
                self.check_geometry(&compressed, StreamSide::Compressed, index)?;
                self.position += 1;
                Ok(NextFrame::Pair(FramePair { index, reference, compressed }))
            }
            (reference, compressed) => {
                let mut exhausted = Vec::with_capacity(2);
                if reference.is_none() {
                    exhausted.push(StreamSide::Reference);
                }
                if compressed.is_none() {
                    exhausted.push(StreamSide::Compressed);
                }
                self.record_short_read(index, exhausted);
                Ok(NextFrame::EndOfStream)
            }
        }
    }

    fn check_geometry(&mut self, frame: &Frame, side: StreamSide, index: u64) -> Result<()> {
        if frame.dimensions() == self.geometry {
            return Ok(());
        }
        self.finished = true;
        let path = match side {
            StreamSide::Reference => self.reference.identifier(),
            StreamSide::Compressed => self.compressed.identifier(),
        };
        Err(VideoError::FrameGeometryChanged {
            path: path.to_string(),
            frame_index: index,
            expected: self.geometry,
            actual: frame.dimensions(),
        }
        .into())
    }

    fn record_short_read(&mut self, index: u64, exhausted: Vec<StreamSide>) {
        let mut premature = false;
        for side in &exhausted {
            let (source, reported) = match side {
                StreamSide::Reference => (self.reference.identifier(), self.counts.reference),
                StreamSide::Compressed => (self.compressed.identifier(), self.counts.compressed),
            };
            if index < reported {
                premature = true;
                warn!(
                    pair = %format!("{} vs {}", self.reference.identifier(), self.compressed.identifier()),
                    source,
                    frame_index = index,
                    reported_frames = reported,
                    "{} frame #{} is missing; PSNR was calculated up to this frame",
                    source,
                    index
                );
            } else {
                debug!(source, frame_index = index, "{} stream ended", side);
            }
        }

        self.finished = true;
        self.short_read = Some(ShortRead { frame_index: index, exhausted, premature });
    }

    /// Release both decoders
    pub fn close(mut self) -> Result<()> {
        let reference = self.reference.close();
        let compressed = self.compressed.close();
        reference.and(compressed)
    }
}

impl Drop for FrameSourcePair {
    fn drop(&mut self) {
        close_quietly(self.reference.as_mut());
        close_quietly(self.compressed.as_mut());
    }
}

/// Read one frame, folding decode failures into end of stream
fn read_side(source: &mut dyn VideoSource, index: u64) -> Option<Frame> {
    match source.read_frame() {
        Ok(frame) => frame,
        Err(e) => {
            warn!(source = source.identifier(), frame_index = index, "undecodable frame: {}", e);
            None
        }
    }
}

fn close_quietly(source: &mut dyn VideoSource) {
    if let Err(e) = source.close() {
        warn!("Failed to close {}: {}", source.identifier(), e);
    }
}
