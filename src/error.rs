//! Error handling for the picam_status crate.
//!
//! Errors come in three tiers. [`ProbeError`] covers a single telemetry fact
//! and is always recovered into a warning by the collectors. [`ConfigError`]
//! covers the camera configuration document and fails the whole load or save.
//! Caller input problems never reach either type; they are reported as
//! [`crate::camera::UpdateStatus`] codes before the document is touched.

/// A specialized `Result` type for service-level operations.
pub type Result<T> = std::result::Result<T, SystemError>;

/// A specialized `Result` type for probe primitives and parsers.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Failure of one probe primitive or of parsing its output.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Reading a pseudo-file or regular file failed
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The command could not be started
    #[error("run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully
    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: String },

    /// The command or file produced nothing usable
    #[error("empty {0}")]
    Empty(&'static str),

    /// Output did not have the expected shape
    #[error("unexpected output: {0:?}")]
    UnexpectedOutput(String),

    /// A numeric field could not be parsed
    #[error("parse {what}: {message}")]
    Parse { what: &'static str, message: String },

    /// The two samples of a rate computation are inconsistent
    #[error("invalid {0} sample")]
    InvalidSample(&'static str),

    /// Transport-level HTTP failure (connect, timeout, body decode)
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The API answered 404 for the requested resource
    #[error("{0} not found")]
    NotFound(String),

    /// The API answered with a non-2xx status other than 404
    #[error("unexpected status {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    /// Interface lookup failed
    #[error("interface lookup: {0}")]
    Interfaces(String),

    /// The request deadline expired while the probe was in flight
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl ProbeError {
    /// Create a parse error for the named quantity.
    pub fn parse(what: &'static str, message: impl ToString) -> Self {
        Self::Parse {
            what,
            message: message.to_string(),
        }
    }

    /// Create an io error for the given path.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Failure to load, edit or persist the camera configuration document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O operation on the document failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid YAML
    #[error("parse document: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// The document root is not a mapping
    #[error("invalid yaml root")]
    InvalidRoot,

    /// There is no `paths` mapping at the root
    #[error("paths section not found")]
    PathsNotFound,

    /// There is no mapping for the configured path name
    #[error("path {0:?} not found")]
    PathNotFound(String),

    /// A recognized key holds a value of the wrong type
    #[error("invalid value for {key}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
    },

    /// The key positions of the path entry could not be determined
    #[error("locate keys: {0}")]
    Locate(String),

    /// The path entry is laid out in a way that cannot be edited line by line
    #[error("unsupported layout: {0}")]
    Layout(String),

    /// Serializing an edited value failed
    #[error("serialize value: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// The edited document could not be parsed back
    #[error("validation failed: {0}")]
    Validation(#[source] serde_yaml::Error),

    /// Swapping the new document into place failed
    #[error("replace {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The main error type for service bootstrap and HTTP serving.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SystemError {
    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
