use crate::error::Result;
use crate::video::types::Frame;

/// A decodable video stream
///
/// Implementations wrap a concrete decoder (an ffmpeg child process, a
/// directory of stills, frames already held in memory) behind the small
/// capability set the comparison pipeline needs.
pub trait VideoSource: Send {
    /// Identifier the source was opened with, used in diagnostics
    fn identifier(&self) -> &str;

    /// Frame size as `(width, height)` reported by the container
    fn dimensions(&self) -> (u32, u32);

    /// Frame count reported by the container
    ///
    /// Advisory only. Never use it as a loop bound.
    fn reported_frame_count(&self) -> u64;

    /// Decode the next frame
    ///
    /// Returns `Ok(None)` at end of stream. An `Err` means the frame at the
    /// current position could not be decoded.
    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying decoder
    ///
    /// Must be idempotent; implementations also call it from `Drop`.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens video sources by identifier
pub trait SourceOpener: Send + Sync {
    /// Open a source, failing with `VideoError::SourceUnavailable` when it
    /// cannot be opened
    fn open(&self, identifier: &str) -> Result<Box<dyn VideoSource>>;

    /// Short name of the decoder backend, for logging
    fn name(&self) -> &str;
}

impl<T: SourceOpener + ?Sized> SourceOpener for std::sync::Arc<T> {
    fn open(&self, identifier: &str) -> Result<Box<dyn VideoSource>> {
        (**self).open(identifier)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
