use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MetricsError, Result};
use crate::metrics::psnr::{psnr, round3};
use crate::video::pair::{FrameSourcePair, NextFrame, ShortRead};
use crate::video::source::SourceOpener;
use crate::video::types::FrameCounts;

/// PSNR of one aligned frame pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsnrSample {
    pub frame_index: u64,
    /// dB rounded to 3 decimals; `0.0` for identical frames
    pub value: f64,
}

/// Per-frame PSNR values of one video pair, in frame order
///
/// Indices are assigned on push, so they always run `0, 1, 2, ...` without
/// gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PsnrSequence {
    samples: Vec<PsnrSample>,
}

impl PsnrSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence from bare values, indexing them from 0
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut sequence = Self::new();
        for value in values {
            sequence.push(value);
        }
        sequence
    }

    /// Append the next frame's value, returning its index
    pub fn push(&mut self, value: f64) -> u64 {
        let frame_index = self.samples.len() as u64;
        self.samples.push(PsnrSample { frame_index, value });
        frame_index
    }

    /// Append a sample that already carries its frame index
    ///
    /// Fails with `MetricsError::NonContiguousFrame` unless the index is the
    /// next one in the sequence, so a sequence always starts at frame 0.
    pub fn push_sample(&mut self, sample: PsnrSample) -> Result<()> {
        let expected = self.samples.len() as u64;
        if sample.frame_index != expected {
            return Err(MetricsError::NonContiguousFrame {
                expected,
                found: sample.frame_index,
            }
            .into());
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn samples(&self) -> &[PsnrSample] {
        &self.samples
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PsnrSample> {
        self.samples.iter()
    }
}


/// Lazy, forward-only PSNR over a [`FrameSourcePair`]
///
/// Yields one rounded sample per aligned frame pair and stops at the first
/// end-of-stream from either side. A pair-fatal error is yielded once, after
/// which the stream is exhausted.
pub struct PsnrStream<'a> {
    pair: &'a mut FrameSourcePair,
    done: bool,
}

impl<'a> PsnrStream<'a> {
    pub fn new(pair: &'a mut FrameSourcePair) -> Self {
        Self { pair, done: false }
    }
}

impl Iterator for PsnrStream<'_> {
    type Item = Result<PsnrSample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let step = self.pair.next_pair().and_then(|next| match next {
            NextFrame::Pair(frames) => {
                let value = psnr(&frames.reference, &frames.compressed)?;
                Ok(Some(PsnrSample { frame_index: frames.index, value: round3(value) }))
            }
            NextFrame::EndOfStream => Ok(None),
        });

        match step {
            Ok(Some(sample)) => Some(Ok(sample)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Everything measured for one reference/compressed pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairMeasurement {
    /// Frame counts reported by the containers, for display only
    pub reported_frames: FrameCounts,
    pub sequence: PsnrSequence,
    pub short_read: Option<ShortRead>,
}

/// Drive a pair to the end of its shorter stream
///
/// The pair must not have been read from yet; samples keep the frame index
/// the pair assigned, and a sequence that would not start at frame 0 fails
/// with `MetricsError::NonContiguousFrame`.
pub fn compute_psnr_sequence(pair: &mut FrameSourcePair) -> Result<PairMeasurement> {
    let reported_frames = pair.reported_frame_counts();
    let mut sequence = PsnrSequence::new();
    for sample in PsnrStream::new(pair) {
        sequence.push_sample(sample?)?;
    }

    debug!(
        reference = pair.reference_id(),
        compressed = pair.compressed_id(),
        frames = sequence.len(),
        "psnr sequence complete"
    );

    Ok(PairMeasurement {
        reported_frames,
        sequence,
        short_read: pair.short_read().cloned(),
    })
}

/// Open, measure and release one pair of videos
pub fn measure_pair(opener: &dyn SourceOpener, reference: &str, compressed: &str) -> Result<PairMeasurement> {
    let mut pair = FrameSourcePair::open(opener, reference, compressed)?;
    let measurement = compute_psnr_sequence(&mut pair);
    if let Err(e) = pair.close() {
        warn!(reference, compressed, "failed to release decoders: {}", e);
    }

    let measurement = measurement?;
    info!(
        "Compared {} frames of {} ({} reported) against {} ({} reported)",
        measurement.sequence.len(),
        reference,
        measurement.reported_frames.reference,
        compressed,
        measurement.reported_frames.compressed
    );
    Ok(measurement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QualityError, VideoError};
    use crate::video::memory::{MemoryOpener, MemorySource};
    use crate::video::types::{Frame, StreamSide};

    /// Frames whose first pixel steps by `step` per frame
    fn ramp(count: usize, step: u8) -> Vec<Frame> {
        (0..count)
            .map(|i| {
                let mut frame = Frame::new_black(4, 4);
                frame.set_pixel(0, 0, [(i as u8).wrapping_mul(step), 0, 0]);
                frame
            })
            .collect()
    }

    #[test]
    fn test_sequence_length_bounded_by_shorter_stream() {
        let opener = MemoryOpener::new()
            .with_source(MemorySource::new("ref", ramp(10, 0)))
            .with_source(MemorySource::new("cmp", ramp(7, 0)));

        let measurement = measure_pair(&opener, "ref", "cmp").unwrap();
        assert_eq!(measurement.reported_frames, FrameCounts { reference: 10, compressed: 7 });
        assert_eq!(measurement.sequence.len(), 7);

        let indices: Vec<u64> = measurement.sequence.iter().map(|s| s.frame_index).collect();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
        assert!(measurement.sequence.values().all(|v| v == 0.0));

        let short = measurement.short_read.unwrap();
        assert_eq!(short.exhausted, vec![StreamSide::Compressed]);
        assert!(!short.premature);
    }

    #[test]
    fn test_values_are_rounded_to_three_decimals() {
        let opener = MemoryOpener::new()
            .with_source(MemorySource::new("ref", ramp(3, 0)))
            .with_source(MemorySource::new("cmp", ramp(3, 10)));

        let measurement = measure_pair(&opener, "ref", "cmp").unwrap();
        let values: Vec<f64> = measurement.sequence.values().collect();
        assert_eq!(values[0], 0.0);
        for value in &values[1..] {
            assert_eq!(*value, round3(*value));
            assert!(*value > 0.0);
        }
        // Larger error, lower PSNR
        assert!(values[1] > values[2]);
    }

    #[test]
    fn test_empty_stream_is_not_an_error() {
        let opener = MemoryOpener::new()
            .with_source(MemorySource::new("ref", Vec::new()).with_dimensions(4, 4))
            .with_source(MemorySource::new("cmp", ramp(3, 1)));

        let measurement = measure_pair(&opener, "ref", "cmp").unwrap();
        assert!(measurement.sequence.is_empty());
        assert_eq!(measurement.short_read.unwrap().frame_index, 0);
    }

    #[test]
    fn test_stream_is_lazy_and_single_pass() {
        let reference = MemorySource::new("ref", ramp(5, 0));
        let compressed = MemorySource::new("cmp", ramp(5, 3));
        let mut pair = FrameSourcePair::from_sources(Box::new(reference), Box::new(compressed)).unwrap();

        let first_two: Vec<_> = PsnrStream::new(&mut pair).take(2).collect::<Result<_>>().unwrap();
        assert_eq!(first_two.len(), 2);
        assert!(!pair.is_finished());

        // Resuming continues where the previous stream stopped
        let rest: Vec<PsnrSample> = PsnrStream::new(&mut pair).collect::<Result<_>>().unwrap();
        assert_eq!(rest.iter().map(|s| s.frame_index).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert!(pair.is_finished());
        assert_eq!(PsnrStream::new(&mut pair).count(), 0);
    }

    #[test]
    fn test_geometry_change_fails_the_pair() {
        let mut bad = ramp(2, 1);
        bad.push(Frame::new_black(2, 2));
        let opener = MemoryOpener::new()
            .with_source(MemorySource::new("ref", ramp(3, 0)))
            .with_source(MemorySource::new("cmp", bad));

        let err = measure_pair(&opener, "ref", "cmp").unwrap_err();
        assert!(matches!(err, QualityError::Video(VideoError::FrameGeometryChanged { .. })));
        assert!(err.is_pair_scoped());
    }

    #[test]
    fn test_partly_read_pair_is_not_relabelled() {
        let reference = MemorySource::new("ref", ramp(5, 0));
        let compressed = MemorySource::new("cmp", ramp(5, 3));
        let mut pair = FrameSourcePair::from_sources(Box::new(reference), Box::new(compressed)).unwrap();

        let skipped: Vec<PsnrSample> = PsnrStream::new(&mut pair).take(2).collect::<Result<_>>().unwrap();
        assert_eq!(skipped.len(), 2);

        let err = compute_psnr_sequence(&mut pair).unwrap_err();
        assert!(matches!(
            err,
            QualityError::Metrics(MetricsError::NonContiguousFrame { expected: 0, found: 2 })
        ));
    }

    #[test]
    fn test_push_sample_requires_next_index() {
        let mut sequence = PsnrSequence::new();
        sequence.push_sample(PsnrSample { frame_index: 0, value: 35.5 }).unwrap();
        assert!(sequence.push_sample(PsnrSample { frame_index: 2, value: 36.0 }).is_err());
        sequence.push_sample(PsnrSample { frame_index: 1, value: 36.0 }).unwrap();
        assert_eq!(sequence.iter().map(|s| s.frame_index).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_sequence_push_assigns_indices() {
        let mut sequence = PsnrSequence::new();
        assert_eq!(sequence.push(30.0), 0);
        assert_eq!(sequence.push(31.0), 1);
        assert_eq!(sequence.samples()[1], PsnrSample { frame_index: 1, value: 31.0 });
    }
}
