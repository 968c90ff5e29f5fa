//! Error types for Skeletar

use thiserror::Error;

/// Main error type for Skeletar
#[derive(Error, Debug)]
pub enum SkeletarError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },

    #[error("Unknown joint name: {0}")]
    UnknownJoint(String),
}

/// Joint conversion errors
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Topology cycle through joint: {0}")]
    TopologyCycle(&'static str),

    #[error("Joint not rooted at base: {0}")]
    TopologyOrphan(&'static str),

    #[error("Constraint capacity exceeded ({0} max)")]
    TooManyConstraints(usize),

    #[error("Constraint index out of range: {0}")]
    ConstraintIndex(usize),
}

/// Skeleton receiver errors
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Receiver socket error: {0}")]
    Receiver(String),

    #[error("Frame parse error: {0}")]
    Parse(String),
}

/// Output-related errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Server startup failed: {0}")]
    Startup(String),
}

/// Result type alias for Skeletar operations
pub type Result<T> = std::result::Result<T, SkeletarError>;
