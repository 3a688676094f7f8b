//! Error types for configuration resolution

use std::path::PathBuf;
use thiserror::Error;

/// Deferred resolution failure attached to a plugin or parser reference.
///
/// These are stored on the reference when it is created and raised only if
/// the reference is actually used during extraction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Failed to load plugin '{long_name}' declared in '{importer}': {detail}")]
    PluginMissing {
        long_name: String,
        importer: String,
        detail: String,
    },

    #[error("Failed to load parser '{name}' declared in '{importer}': {detail}")]
    ParserMissing {
        name: String,
        importer: String,
        detail: String,
    },
}

/// Main error type for configuration resolution
#[derive(Debug, Error)]
pub enum LintrcError {
    /// A config file exists but could not be opened or parsed
    #[error("Cannot read config file '{path}': {detail}")]
    CannotReadConfig { path: PathBuf, detail: String },

    /// A config file does not exist (recoverable during cascading discovery)
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    /// Schema violation in config data
    #[error("Invalid config in '{path}': {detail}")]
    InvalidConfig { path: PathBuf, detail: String },

    /// An `extends` reference could not be located or loaded
    #[error("Failed to extend from '{name}' in '{importer}': {detail}")]
    ExtendConfigMissing {
        name: String,
        importer: String,
        detail: String,
    },

    /// Plugin names must not contain whitespace
    #[error("Whitespace found in plugin name '{name}'")]
    WhitespaceInPluginName { name: String },

    /// A deferred plugin/parser failure, raised at use time
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Two elements contributed different definitions for the same plugin id
    #[error("Plugin '{id}' was conflicted between '{first}' and '{second}'")]
    PluginConflict {
        id: String,
        first: String,
        second: String,
    },

    /// The merged `processor` names a processor no resolved plugin provides
    #[error("Processor '{name}' was not found")]
    ProcessorNotFound { name: String },

    /// The merged `processor` string is not of the form `<plugin>/<processor>`
    #[error("Invalid processor name '{raw}' (expected '<plugin>/<processor>')")]
    InvalidProcessorName { raw: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Read,
    NotFound,
    Schema,
    Extend,
    Reference,
    Conflict,
    Processor,
    Io,
}

impl LintrcError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LintrcError::CannotReadConfig { .. } => ErrorKind::Read,
            LintrcError::NotFound { .. } => ErrorKind::NotFound,
            LintrcError::InvalidConfig { .. } => ErrorKind::Schema,
            LintrcError::ExtendConfigMissing { .. } => ErrorKind::Extend,
            LintrcError::WhitespaceInPluginName { .. } => ErrorKind::Schema,
            LintrcError::Reference(_) => ErrorKind::Reference,
            LintrcError::PluginConflict { .. } => ErrorKind::Conflict,
            LintrcError::ProcessorNotFound { .. } => ErrorKind::Processor,
            LintrcError::InvalidProcessorName { .. } => ErrorKind::Processor,
            LintrcError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Whether this error means "the file does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(self, LintrcError::NotFound { .. })
    }

    /// Whether this error is a filesystem permission failure
    ///
    /// The ancestor walk recovers from these by stopping as if it had
    /// reached the filesystem root.
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            LintrcError::Io { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied
        )
    }

    /// Create a read error with path context
    pub fn cannot_read(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::CannotReadConfig {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create a schema violation error with path context
    pub fn invalid_config(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create an extend failure with origin context
    pub fn extend_missing(
        name: impl Into<String>,
        importer: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::ExtendConfigMissing {
            name: name.into(),
            importer: importer.into(),
            detail: detail.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
