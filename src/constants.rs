//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "sacmerge";

/// Relative tolerance when comparing sampling rates of segments.
pub const RATE_TOLERANCE: f64 = 1e-9;

/// Configuration file names.
pub mod config {
    /// File name inside the platform configuration directory.
    pub const FILE_NAME: &str = "config.toml";

    /// File name looked up in the working directory, next to the data.
    pub const LOCAL_FILE_NAME: &str = "sacmerge.toml";
}

/// Default filename pattern settings.
pub mod pattern {
    /// Default field delimiter in segment filenames.
    pub const DEFAULT_DELIMITER: &str = ".";

    /// Default grammar for merge inputs: station, ignored, ignored, year token,
    /// solar day, extension.
    pub const DEFAULT_MERGE_GRAMMAR: &str = "s.x.x.s.i.x";

    /// Default grammar for decimate inputs: station, network, ignored, year
    /// token, solar day, extension.
    pub const DEFAULT_DECIMATE_GRAMMAR: &str = "s.s.x.s.i.x";

    /// Default extension of segment files in input directories.
    pub const DEFAULT_EXTENSION: &str = "sac";

    /// Grammar token: value must be a member of the accepted set.
    pub const LITERAL: &str = "s";

    /// Grammar token: value is ignored.
    pub const IGNORED: &str = "x";

    /// Grammar token: value is an integer key.
    pub const INTEGER: &str = "i";

    /// Separator between the channel part and the year in a year token.
    pub const YEAR_TOKEN_SEPARATOR: char = '_';
}

/// Output naming constants.
pub mod output {
    /// Prefix of merged output filenames.
    pub const MERGED_PREFIX: &str = "m_";

    /// Prefix of single-directory merge output filenames.
    pub const SINGLE_MERGE_PREFIX: &str = "merged_";

    /// Prefix of error log filenames.
    pub const ERROR_LOG_PREFIX: &str = "_errlog_";

    /// Timestamp format embedded in generated filenames.
    pub const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M";
}

/// Decimation filter constants.
pub mod decimate {
    /// FIR taps per unit of decimation factor (filter order is `TAPS_PER_FACTOR * q`).
    pub const TAPS_PER_FACTOR: usize = 20;

    /// Default target sampling rate in Hz.
    pub const DEFAULT_FS_NEW: f64 = 1.0;
}

/// Spectrogram defaults.
pub mod spectrogram {
    /// Frame length: one hour.
    pub const DEFAULT_FRAME_SECONDS: f64 = 3600.0;

    /// Extension of spectrogram files.
    pub const OUTPUT_EXTENSION: &str = "json";
}

/// SAC binary layout constants.
pub mod sac {
    /// Total header size in bytes.
    pub const HEADER_BYTES: usize = 632;

    /// Number of 4-byte float header words.
    pub const FLOAT_WORDS: usize = 70;

    /// Number of 4-byte integer/logical header words.
    pub const INT_WORDS: usize = 40;

    /// Byte offset of the first string field.
    pub const STRING_OFFSET: usize = 440;

    /// Header version written and expected.
    pub const HEADER_VERSION: i32 = 6;

    /// Undefined float value.
    pub const UNDEFINED_FLOAT: f32 = -12345.0;

    /// Undefined integer value.
    pub const UNDEFINED_INT: i32 = -12345;

    /// Undefined string value.
    pub const UNDEFINED_STRING: &str = "-12345";

    /// `iftype` value for evenly sampled time series.
    pub const IFTYPE_TIME: i32 = 1;
}
