//! Error types for widget synchronization.

use attsync_dom::DomError;

/// Network-level failure of a background call or channel submission.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed")]
    Http(#[from] ureq::Error),

    /// HTTP response error (server returned error status).
    #[error("HTTP error: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// The blocking request task panicked or was cancelled.
    #[error("request task failed: {0}")]
    Task(String),
}

/// Failure to refresh one widget instance.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Render request failed.
    #[error("render request failed")]
    Transport(#[from] TransportError),

    /// Response did not contain a widget fragment.
    #[error("render response contains no attachment table container")]
    MissingFragment,

    /// Response or fragment could not be parsed.
    #[error("render response could not be parsed")]
    Dom(#[from] DomError),

    /// Widget left the document before its markup could be replaced.
    #[error("widget is no longer in the document")]
    Detached,
}

/// Error while wiring up widgets or forms.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Required element missing from the markup.
    #[error("upload form is missing {0}")]
    MissingElement(&'static str),
}

/// Why a user action (delete or upload) did not complete.
///
/// Handled where it is detected and rendered inline next to the widget or
/// form it came from.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Network failure or HTTP error status.
    #[error("transport failed")]
    Transport(#[from] TransportError),

    /// Server reported an error inside an otherwise successful response.
    #[error("server reported an error: {0}")]
    Application(String),

    /// User declined the confirmation.
    #[error("cancelled by user")]
    UserCancelled,
}
