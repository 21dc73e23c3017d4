use thiserror::Error;

use crate::models::Field;

pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Problems caught before anything touches the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill out the {} field", .0.label())]
    MissingField(Field),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please upload your resume")]
    MissingResume,

    #[error("Job ID is missing")]
    MissingJobId,

    #[error("File size should be less than 5MB")]
    FileTooLarge { size: u64 },

    #[error("Please upload only PDF, JPG, or PNG files")]
    UnsupportedFileType { content_type: String },

    #[error("Could not read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// What the transport reports when no HTTP response came back.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no response from server: {0}")]
    NoResponse(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("could not build request: {0}")]
    Construction(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Outcome of a failed submission attempt. `Display` is the text shown to the
/// user.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("{}", NETWORK_MESSAGE)]
    NoResponse(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{}", UNEXPECTED_MESSAGE)]
    Construction(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("a submission is already in progress")]
    InFlight,
}

impl SubmitError {
    /// The notice to show, if any. A second submit while one is in flight is
    /// silently ignored, like clicking a disabled button.
    pub fn user_message(&self) -> Option<String> {
        match self {
            SubmitError::InFlight => None,
            other => Some(other.to_string()),
        }
    }
}

impl From<TransportError> for SubmitError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NoResponse(source) => SubmitError::NoResponse(source),
            TransportError::Construction(source) => SubmitError::Construction(source),
        }
    }
}
