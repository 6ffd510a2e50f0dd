use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum KrishiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Location unavailable: {0}")]
    LocationDenied(String),

    #[error("Superseded by a newer submission")]
    Superseded,

    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KrishiError {
    /// Message suitable for inline display next to the control that failed.
    pub fn user_message(&self) -> String {
        match self {
            KrishiError::Validation(v) => v.to_string(),
            KrishiError::Api(ApiError::Backend { detail, .. }) => detail.clone(),
            KrishiError::Api(ApiError::Http(_)) => "Cannot connect to backend".to_string(),
            KrishiError::Api(e) => e.to_string(),
            KrishiError::LocationDenied(_) => "Failed to retrieve location".to_string(),
            other => other.to_string(),
        }
    }
}

/// User-input errors. Always raised before any request leaves the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please choose an image to upload")]
    MissingImage,

    #[error("{0} is not an image file")]
    NotAnImage(String),

    #[error("No text has been extracted yet")]
    EmptyText,

    #[error("Fetch weather information before requesting a recommendation")]
    MissingEnrichment,

    #[error("Weather lookup still in progress")]
    EnrichmentPending,

    #[error("No valid text extracted from form")]
    ErrorMarkerInText,

    #[error("Please enter or select a deadline")]
    MissingDeadline,

    #[error("Invalid deadline date: {0}")]
    InvalidDeadline(String),

    #[error("Enter a place name to search")]
    BlankLocation,

    #[error("A username is required")]
    MissingUsername,

    #[error("Username and password are required")]
    EmptyCredentials,

    #[error("Passwords do not match")]
    PasswordMismatch,
}
