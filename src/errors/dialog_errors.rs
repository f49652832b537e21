//! Dialog demultiplexing error types

use thiserror::Error;

/// Result type used throughout dum-core
pub type DialogResult<T> = Result<T, DialogError>;

/// Errors surfaced by the dialog/usage demultiplexing layer
#[derive(Debug, Error)]
pub enum DialogError {
    /// A message lacks a header needed to compute an identity key
    /// (Call-ID, From-tag, To-tag or CSeq)
    #[error("Malformed message: {message}")]
    MalformedMessage { message: String },

    /// No dialog set matches the message and one cannot be created for it
    #[error("No matching dialog set: {message}")]
    NoMatchingDialogSet { message: String },
}

impl DialogError {
    /// Protocol-shape error: a correlation header is missing or unusable
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage { message: message.into() }
    }

    /// Routing error: the message matched no dialog set
    pub fn no_matching_set(message: impl Into<String>) -> Self {
        Self::NoMatchingDialogSet { message: message.into() }
    }
}
