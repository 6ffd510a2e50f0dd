//! Extraction stage: uploads one image and returns the OCR text.

use krishi_core::models::{ExtractedDocument, Session, UploadedImage};
use krishi_core::{KrishiBackend, KrishiError};

/// Upload `image` on behalf of `session`. No retry; a failure is returned
/// for the caller to surface.
pub async fn extract(
    backend: &dyn KrishiBackend,
    session: &Session,
    image: &UploadedImage,
) -> Result<ExtractedDocument, KrishiError> {
    tracing::info!(
        username = session.username(),
        file = %image.file_name,
        bytes = image.bytes.len(),
        backend = backend.name(),
        "Extraction started"
    );

    match backend.upload_document(session.username(), image).await {
        Ok(doc) => {
            tracing::info!(
                username = session.username(),
                chars = doc.text.chars().count(),
                "Extraction finished"
            );
            Ok(doc)
        }
        Err(e) => {
            tracing::error!(username = session.username(), error = %e, "Extraction failed");
            Err(e.into())
        }
    }
}
