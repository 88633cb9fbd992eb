//! Error types for sacmerge.

use std::path::PathBuf;

/// Result type alias for sacmerge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for sacmerge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Filename grammar and accepted-value sets do not agree.
    #[error("invalid filename grammar: {message}")]
    Grammar {
        /// Description of the mismatch.
        message: String,
    },

    /// Calendar date does not exist.
    #[error("invalid date: year {year}, month {month}, day {day}")]
    InvalidDate {
        /// Year.
        year: i32,
        /// Month (1-12).
        month: u32,
        /// Day of month.
        day: u32,
    },

    /// Segments to merge have different sampling rates.
    #[error("sampling rate mismatch: expected {expected} Hz, found {found} Hz")]
    SamplingRateMismatch {
        /// Rate of the first segment.
        expected: f64,
        /// Offending rate.
        found: f64,
    },

    /// Segments to merge belong to different channels.
    #[error("channel mismatch: expected {expected}, found {found}")]
    ChannelMismatch {
        /// Channel of the first segment.
        expected: String,
        /// Offending channel.
        found: String,
    },

    /// Segment still carries missing samples that were never filled.
    #[error("segment has {missing} unmaterialized missing sample(s) and no fill value is configured")]
    UnmaterializedMask {
        /// Number of missing samples.
        missing: usize,
    },

    /// Requested decimation rate cannot be reached from the source rate.
    #[error("invalid target sampling rate {requested} Hz for source rate {source_rate} Hz")]
    InvalidRate {
        /// Requested rate.
        requested: f64,
        /// Rate of the source segment.
        source_rate: f64,
    },

    /// Spectrogram frame length does not fit the record.
    #[error("invalid spectrogram frame: {message}")]
    SpectrogramFrame {
        /// Description of the problem.
        message: String,
    },

    /// Failed to encode a spectrogram.
    #[error("failed to serialize spectrogram")]
    SpectrogramSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write a spectrogram file.
    #[error("failed to write spectrogram '{path}'")]
    SpectrogramWrite {
        /// Path to the output file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Merge was called without any segment.
    #[error("no segments to merge")]
    EmptyMerge,

    /// A single batch unit failed.
    #[error("{source}")]
    Unit {
        /// Source file that triggered the failure.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<Self>,
    },

    /// Required input directory is absent.
    #[error("input directory does not exist: {path}")]
    InputDirNotFound {
        /// Missing directory.
        path: PathBuf,
    },

    /// No segment file matched the filename filter.
    #[error("no segment files matched in '{path}'")]
    NoMatchingSegments {
        /// Directory that was searched.
        path: PathBuf,
    },

    /// Failed to read a segment file.
    #[error("failed to read segment file '{path}'")]
    SegmentRead {
        /// Path to the segment file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Segment file is malformed.
    #[error("malformed segment file '{path}': {message}")]
    SegmentFormat {
        /// Path to the segment file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Failed to write a segment file.
    #[error("failed to write segment file '{path}'")]
    SegmentWrite {
        /// Path to the segment file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write WAV file.
    #[error("failed to write WAV file '{path}'")]
    WavWrite {
        /// Path to the WAV file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: hound::Error,
    },

    /// Format cannot be used for this operation.
    #[error("unsupported segment format for '{path}': {reason}")]
    UnsupportedFormat {
        /// Path involved.
        path: PathBuf,
        /// Why the format is unsupported.
        reason: String,
    },

    /// Failed to reserve an output file name.
    #[error("failed to reserve output file '{path}'")]
    OutputReserve {
        /// Path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreateFailed {
        /// Path to the output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to open the error log.
    #[error("failed to open error log '{path}'")]
    ErrorLogOpen {
        /// Path to the error log.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize header metadata.
    #[error("failed to serialize metadata")]
    MetadataSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Wrap an error as a unit failure attributed to `path`.
    pub fn in_unit(self, path: impl Into<PathBuf>) -> Self {
        match self {
            unit @ Self::Unit { .. } => unit,
            other => Self::Unit {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}
