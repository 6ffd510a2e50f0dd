//! Login and registration flows.

use krishi_core::api::Registration;
use krishi_core::models::{Language, Session};
use krishi_core::{KrishiBackend, KrishiError, ValidationError};

/// Check credentials and return the session every later workflow is built on.
pub async fn login(
    backend: &dyn KrishiBackend,
    username: &str,
    password: &str,
) -> Result<Session, KrishiError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ValidationError::EmptyCredentials.into());
    }

    match backend.login(username, password).await {
        Ok(session) => {
            tracing::info!(username = session.username(), "Logged in");
            Ok(session)
        }
        Err(e) => {
            tracing::warn!(username = %username, error = %e, "Login failed");
            Err(e.into())
        }
    }
}

pub async fn register(
    backend: &dyn KrishiBackend,
    username: &str,
    password: &str,
    confirm_password: &str,
    preferred_language: Language,
) -> Result<(), KrishiError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ValidationError::EmptyCredentials.into());
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch.into());
    }

    let registration = Registration {
        username: username.to_string(),
        password: password.to_string(),
        preferred_language,
    };
    backend.register(&registration).await?;
    tracing::info!(username = %username, language = %preferred_language, "Registered");
    Ok(())
}
