use thiserror::Error;

/// Everything that can go wrong while simulating the bar.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The hidden surface does not exist, or capturing it was refused.
    /// Fatal at startup.
    #[error("Touch Bar capture unavailable: {0}")]
    CaptureUnavailable(String),
    /// The process may not post synthetic input.  Capture keeps running.
    #[error("synthetic input injection denied")]
    InjectionDenied,
    /// The capture stream went away mid-run (reconfiguration, sleep).
    #[error("capture stream interrupted: {0}")]
    StreamInterrupted(String),
    /// The logger could not be configured.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
