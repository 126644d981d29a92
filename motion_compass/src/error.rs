//! Error types shared by the classifier, the capture loop and config loading.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompassError>;

#[derive(Debug, Error)]
pub enum CompassError {
    #[error("Capture device {index} unavailable: {reason}")]
    DeviceUnavailable { index: u32, reason: String },

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Frame size mismatch: previous {previous:?}, current {current:?}")]
    FrameMismatch {
        previous: (u32, u32),
        current: (u32, u32),
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture worker panicked")]
    WorkerPanicked,
}

impl CompassError {
    pub fn device_unavailable(index: u32, reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            index,
            reason: reason.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
