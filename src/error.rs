//! Error types for detection and link simulation

use std::io;
use thiserror::Error;

/// Result type for detector operations
pub type DetectResult<T> = Result<T, DetectError>;

/// Result type for the simulation harness and CLI
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised before a detection call does any numeric work
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    /// Received vector length does not match the channel row count
    #[error("Shape mismatch: channel has {rows} rows, received vector has {len} entries")]
    ShapeMismatch { rows: usize, len: usize },

    /// Channel matrix has no observation or no transmit dimension
    #[error("Channel matrix is empty")]
    EmptyChannel,

    /// Detector parameter outside its domain
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Errors from the link simulation harness and the command line front-end
#[derive(Error, Debug)]
pub enum SimError {
    /// A receiver failed on a channel realization
    #[error("Detection failed: {0}")]
    Detect(#[from] DetectError),

    /// Reading or writing a file failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON input or unserializable report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sweep configuration is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Symbol count does not fill whole channel uses
    #[error("Cannot split {symbols} symbols into channel uses of {nb_tx} antennas")]
    RaggedBlock { symbols: usize, nb_tx: usize },
}
