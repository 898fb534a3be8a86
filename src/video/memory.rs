use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Result, VideoError};
use crate::video::source::{SourceOpener, VideoSource};
use crate::video::types::Frame;

/// A video source backed by frames already held in memory
///
/// The reported frame count is independent of the frames actually supplied,
/// which makes it easy to model containers whose metadata is wrong.
#[derive(Debug, Clone)]
pub struct MemorySource {
    identifier: String,
    dimensions: (u32, u32),
    reported_frames: u64,
    frames: VecDeque<Frame>,
    failing_from: Option<usize>,
    delivered: usize,
    closed: bool,
    close_counter: Arc<AtomicUsize>,
}

impl MemorySource {
    /// Create a source whose geometry is taken from the first frame
    ///
    /// An empty frame list yields a 0x0 source; use [`MemorySource::with_dimensions`]
    /// to model an empty stream with real geometry.
    pub fn new<S: Into<String>>(identifier: S, frames: Vec<Frame>) -> Self {
        let dimensions = frames.first().map(Frame::dimensions).unwrap_or((0, 0));
        let reported_frames = frames.len() as u64;
        Self {
            identifier: identifier.into(),
            dimensions,
            reported_frames,
            frames: frames.into(),
            failing_from: None,
            delivered: 0,
            closed: false,
            close_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Override the geometry reported by the container
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = (width, height);
        self
    }

    /// Override the frame count reported by the container
    pub fn with_reported_frame_count(mut self, count: u64) -> Self {
        self.reported_frames = count;
        self
    }

    /// Make every read from frame `index` onwards fail to decode
    pub fn failing_from(mut self, index: usize) -> Self {
        self.failing_from = Some(index);
        self
    }

    /// Share a counter that is bumped every time this source is released
    pub fn with_close_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.close_counter = counter;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl VideoSource for MemorySource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn reported_frame_count(&self) -> u64 {
        self.reported_frames
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.closed {
            return Ok(None);
        }
        if self.failing_from.is_some_and(|index| self.delivered >= index) {
            return Err(VideoError::DecodingFailed {
                path: self.identifier.clone(),
                reason: format!("frame #{} is corrupt", self.delivered),
            }
            .into());
        }

        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.delivered += 1;
        }
        Ok(frame)
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.frames.clear();
            self.close_counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Opens [`MemorySource`]s registered under an identifier
///
/// Every `open` hands out a fresh copy of the registered source, so the same
/// identifier can take part in several pairs.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    sources: HashMap<String, MemorySource>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own identifier
    pub fn insert(&mut self, mut source: MemorySource) {
        // Templates are never read; marking them closed keeps their Drop from
        // touching a shared close counter.
        source.closed = true;
        self.sources.insert(source.identifier.clone(), source);
    }

    /// Builder-style variant of [`MemoryOpener::insert`]
    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.insert(source);
        self
    }
}

impl SourceOpener for MemoryOpener {
    fn open(&self, identifier: &str) -> Result<Box<dyn VideoSource>> {
        let template = self.sources.get(identifier).ok_or_else(|| VideoError::SourceUnavailable {
            path: identifier.to_string(),
            reason: "no such in-memory source".to_string(),
        })?;

        let mut source = template.clone();
        source.closed = false;
        source.delivered = 0;
        Ok(Box::new(source))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
