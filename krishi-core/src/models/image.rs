use bytes::Bytes;
use std::path::Path;

use crate::error::{KrishiError, ValidationError};

/// A photographed document picked by the user, held in memory for one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadedImage {
    /// Build from raw bytes, guessing the MIME type from the file extension.
    pub fn from_bytes(
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Result<Self, ValidationError> {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        Self::with_mime(file_name, mime_type, bytes)
    }

    pub fn with_mime(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Result<Self, ValidationError> {
        let file_name = file_name.into();
        let mime_type = mime_type.into();
        if !mime_type.starts_with("image/") {
            return Err(ValidationError::NotAnImage(file_name));
        }
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ValidationError::MissingImage);
        }
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self, KrishiError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(file_name, bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_guessed_from_extension() {
        let image = UploadedImage::from_bytes("soil.JPG", vec![0xFF, 0xD8]).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.file_name, "soil.JPG");
    }

    #[test]
    fn test_pdf_is_not_an_image() {
        let err = UploadedImage::from_bytes("form.pdf", vec![1, 2, 3]).unwrap_err();
        assert_eq!(err, ValidationError::NotAnImage("form.pdf".to_string()));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(UploadedImage::from_bytes("scan", vec![1]).is_err());
    }

    #[test]
    fn test_empty_file_rejected() {
        let err = UploadedImage::from_bytes("soil.png", Vec::<u8>::new()).unwrap_err();
        assert_eq!(err, ValidationError::MissingImage);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_io_error() {
        let result = UploadedImage::open("/nonexistent/krishi/soil.png").await;
        assert!(matches!(result, Err(KrishiError::Io(_))));
    }
}
