use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::video::ffmpeg::FfmpegOpener;
use crate::video::image_sequence::ImageSequenceOpener;
use crate::video::source::{SourceOpener, VideoSource};

/// Which decoder backend opens video identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderKind {
    /// Directories as image sequences, everything else through ffmpeg
    #[default]
    Auto,
    Ffmpeg,
    ImageSequence,
}

impl DecoderKind {
    /// Build the opener for this backend
    pub fn opener(self, ffmpeg: FfmpegOpener) -> Arc<dyn SourceOpener> {
        match self {
            Self::Auto => Arc::new(AutoOpener::new(ffmpeg)),
            Self::Ffmpeg => Arc::new(ffmpeg),
            Self::ImageSequence => Arc::new(ImageSequenceOpener),
        }
    }
}

impl std::str::FromStr for DecoderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(Self::Auto),
            "ffmpeg" => Ok(Self::Ffmpeg),
            "image_sequence" => Ok(Self::ImageSequence),
            other => Err(format!("unknown decoder '{}' (expected auto, ffmpeg or image-sequence)", other)),
        }
    }
}

/// Picks a backend per identifier: directories are image sequences
#[derive(Debug, Clone, Default)]
pub struct AutoOpener {
    ffmpeg: FfmpegOpener,
    stills: ImageSequenceOpener,
}

impl AutoOpener {
    pub fn new(ffmpeg: FfmpegOpener) -> Self {
        Self { ffmpeg, stills: ImageSequenceOpener }
    }
}

impl SourceOpener for AutoOpener {
    fn open(&self, identifier: &str) -> Result<Box<dyn VideoSource>> {
        if Path::new(identifier).is_dir() {
            self.stills.open(identifier)
        } else {
            self.ffmpeg.open(identifier)
        }
    }

    fn name(&self) -> &str {
        "auto"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::types::Frame;
    use tempfile::tempdir;

    #[test]
    fn test_decoder_kind_parsing() {
        assert_eq!("auto".parse::<DecoderKind>().unwrap(), DecoderKind::Auto);
        assert_eq!("image-sequence".parse::<DecoderKind>().unwrap(), DecoderKind::ImageSequence);
        assert_eq!("FFMPEG".parse::<DecoderKind>().unwrap(), DecoderKind::Ffmpeg);
        assert!("gstreamer".parse::<DecoderKind>().is_err());
    }

    #[test]
    fn test_auto_opener_routes_directories_to_stills() {
        let dir = tempdir().unwrap();
        Frame::new_black(3, 3).save_png(dir.path().join("0001.png")).unwrap();

        let opener = DecoderKind::Auto.opener(FfmpegOpener::default());
        let source = opener.open(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(source.dimensions(), (3, 3));
        assert_eq!(opener.name(), "auto");
    }
}
