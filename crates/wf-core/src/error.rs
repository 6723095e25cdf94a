//! Error types for the wf-core crate.
//!
//! - [`ConfigError`] covers loading and validating [`Config`](crate::Config).
//! - [`CountError`] covers failures while tokenizing a single file.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use wf_core::ConfigError;
///
/// let error = ConfigError::invalid_option("workers", "must be at least 1");
/// assert!(error.to_string().contains("workers"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while counting the words of one file.
///
/// Every variant is recoverable from the caller's point of view: the file
/// contributes nothing and processing moves on to the next path.
#[derive(Debug, thiserror::Error)]
pub enum CountError {
    /// The file could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        /// The file that could not be opened.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file's metadata could not be read.
    #[error("failed to stat {path}: {source}")]
    Stat {
        /// The file whose metadata could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The path exists but is not a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(Utf8PathBuf),

    /// The file could not be mapped into memory.
    #[error("failed to map {path}: {source}")]
    Map {
        /// The file that could not be mapped.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CountError {
    /// Creates a new [`CountError::Open`] error.
    #[inline]
    pub fn open(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`CountError::Stat`] error.
    #[inline]
    pub fn stat(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`CountError::Map`] error.
    #[inline]
    pub fn map(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Map {
            path: path.into(),
            source,
        }
    }

    /// Returns the file path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::Open { path, .. } | Self::Stat { path, .. } | Self::Map { path, .. } => path,
            Self::NotAFile(path) => path,
        }
    }
}
