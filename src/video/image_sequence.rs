use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, VideoError};
use crate::video::source::{SourceOpener, VideoSource};
use crate::video::types::Frame;

/// A directory of numbered stills treated as a video
///
/// Files are played back in file-name order, so zero-padded names
/// (`frame_0001.png`, `frame_0002.png`, ...) give the expected sequence.
pub struct ImageSequenceSource {
    identifier: String,
    dimensions: (u32, u32),
    files: Vec<PathBuf>,
    position: usize,
    closed: bool,
}

impl ImageSequenceSource {
    /// Scan `directory` for supported still images
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        let identifier = directory.display().to_string();

        if !directory.is_dir() {
            return Err(VideoError::SourceUnavailable {
                path: identifier,
                reason: "not a directory".to_string(),
            }
            .into());
        }

        let unreadable = |e: std::io::Error| VideoError::SourceUnavailable {
            path: identifier.clone(),
            reason: e.to_string(),
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(directory).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if path.is_file() && !is_hidden_file(&path) && is_image_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        let first = files.first().ok_or_else(|| VideoError::SourceUnavailable {
            path: identifier.clone(),
            reason: "no supported image files".to_string(),
        })?;

        // Only the header is read here; pixels are decoded lazily.
        let dimensions = image::image_dimensions(first).map_err(|e| VideoError::SourceUnavailable {
            path: identifier.clone(),
            reason: format!("{}: {}", first.display(), e),
        })?;

        debug!("Image sequence {}: {} files, {}x{}", identifier, files.len(), dimensions.0, dimensions.1);

        Ok(Self {
            identifier,
            dimensions,
            files,
            position: 0,
            closed: false,
        })
    }
}

impl VideoSource for ImageSequenceSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn reported_frame_count(&self) -> u64 {
        self.files.len() as u64
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.closed {
            return Ok(None);
        }
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;

        let image = image::open(path).map_err(|e| VideoError::DecodingFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Some(Frame::new(image.to_rgb8())))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Opens directories of stills as [`ImageSequenceSource`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSequenceOpener;

impl SourceOpener for ImageSequenceOpener {
    fn open(&self, identifier: &str) -> Result<Box<dyn VideoSource>> {
        Ok(Box::new(ImageSequenceSource::open(identifier)?))
    }

    fn name(&self) -> &str {
        "image_sequence"
    }
}

fn is_image_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if matches!(
            ext.to_lowercase().as_str(),
            "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff" | "webp"
        )
    )
}

fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
