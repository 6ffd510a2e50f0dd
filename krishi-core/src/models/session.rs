use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identity established at login and handed to every workflow explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    username: String,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Result<Self, ValidationError> {
        let username = username.into().trim().to_string();
        if username.is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        Ok(Self { username })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}
