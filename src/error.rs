use thiserror::Error;

/// Main error type for the psnr-compare library
#[derive(Error, Debug)]
pub enum QualityError {
    #[error("Video source error: {0}")]
    Video(#[from] VideoError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised while opening or reading video sources
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Could not open {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[error("Different size of videos: {reference} is {}x{}, {compressed} is {}x{}",
        .reference_size.0, .reference_size.1, .compressed_size.0, .compressed_size.1)]
    DimensionMismatch {
        reference: String,
        compressed: String,
        reference_size: (u32, u32),
        compressed_size: (u32, u32),
    },

    #[error("Failed to decode frame from {path}: {reason}")]
    DecodingFailed { path: String, reason: String },

    #[error("{path} frame #{frame_index} is {}x{}, expected {}x{}",
        .actual.0, .actual.1, .expected.0, .expected.1)]
    FrameGeometryChanged {
        path: String,
        frame_index: u64,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Errors raised by the PSNR kernel and the metrics aggregator
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("No frames were compared, summary statistics are undefined")]
    EmptySequence,

    #[error("Pixel buffers differ in size: {reference} vs {compressed} components")]
    ShapeMismatch { reference: usize, compressed: usize },

    #[error("PSNR samples out of order: expected frame #{expected}, got #{found}")]
    NonContiguousFrame { expected: u64, found: u64 },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Unsupported configuration format: {path} (expected .toml or .json)")]
    UnsupportedFormat { path: String },
}

/// Report output errors
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

/// Convenience type alias for Results using QualityError
pub type Result<T> = std::result::Result<T, QualityError>;

impl QualityError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error only invalidates the current video pair
    ///
    /// Pair-scoped failures are logged and skipped by the evaluator; anything
    /// else aborts the whole run.
    pub fn is_pair_scoped(&self) -> bool {
        matches!(
            self,
            Self::Video(VideoError::SourceUnavailable { .. })
                | Self::Video(VideoError::DimensionMismatch { .. })
                | Self::Video(VideoError::FrameGeometryChanged { .. })
                | Self::Metrics(MetricsError::EmptySequence)
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::SourceUnavailable { path, .. }) => {
                format!("Could not open video '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Video(VideoError::DimensionMismatch { reference, compressed, .. }) => {
                format!("Videos '{}' and '{}' have different frame sizes and cannot be compared.", reference, compressed)
            }
            Self::Metrics(MetricsError::EmptySequence) => {
                "No frames could be compared for this pair.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
