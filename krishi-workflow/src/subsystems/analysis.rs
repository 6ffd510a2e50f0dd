//! Analysis stage: sends extracted text to the workflow's analysis endpoint.
//!
//! Preconditions are checked here, before any request is built:
//! - every workflow needs non-empty text
//! - the crop advisor also needs a settled weather context; a lookup still
//!   in flight blocks analysis even when an older snapshot is held
//! - the subsidy tracker refuses text carrying the extraction error marker

use krishi_core::api::CropAdviceRequest;
use krishi_core::models::{AnalysisResult, Language, Session, WeatherSnapshot};
use krishi_core::{KrishiBackend, KrishiError, ValidationError};

use crate::controller::WorkflowKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preconditions {
    pub requires_enrichment: bool,
    pub rejects_error_marker: bool,
}

pub fn check_preconditions(
    preconditions: Preconditions,
    text: &str,
    enrichment: Option<&WeatherSnapshot>,
    enrichment_pending: bool,
    error_marker: &str,
) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if preconditions.rejects_error_marker && !error_marker.is_empty() && text.contains(error_marker)
    {
        return Err(ValidationError::ErrorMarkerInText);
    }
    if preconditions.requires_enrichment {
        if enrichment_pending {
            return Err(ValidationError::EnrichmentPending);
        }
        if enrichment.is_none() {
            return Err(ValidationError::MissingEnrichment);
        }
    }
    Ok(())
}

/// Snapshot of everything one analysis call depends on, taken when the
/// call is submitted.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub text: String,
    pub enrichment: Option<WeatherSnapshot>,
    pub language: Language,
}

pub async fn run(
    backend: &dyn KrishiBackend,
    kind: WorkflowKind,
    session: &Session,
    input: &AnalysisInput,
    default_location: &str,
) -> Result<AnalysisResult, KrishiError> {
    tracing::info!(
        workflow = kind.name(),
        username = session.username(),
        language = %input.language,
        "Analysis started"
    );

    let result = match kind {
        WorkflowKind::CropAdvisory => {
            let weather = input
                .enrichment
                .as_ref()
                .ok_or(ValidationError::MissingEnrichment)?;
            let location = if weather.location_label.trim().is_empty() {
                default_location
            } else {
                weather.location_label.as_str()
            };
            let request = CropAdviceRequest {
                soil_report: &input.text,
                language: input.language,
                username: session.username(),
                location,
                weather,
            };
            backend
                .crop_advice(&request)
                .await
                .map(AnalysisResult::Recommendation)
        }
        WorkflowKind::DocumentSummary => backend
            .summarize(&input.text, input.language)
            .await
            .map(AnalysisResult::Summary),
        WorkflowKind::Subsidy => backend
            .analyze_subsidy(&input.text, input.language)
            .await
            .map(AnalysisResult::Subsidy),
    };

    match result {
        Ok(r) => {
            tracing::info!(workflow = kind.name(), "Analysis finished");
            Ok(r)
        }
        Err(e) => {
            tracing::error!(workflow = kind.name(), error = %e, "Analysis failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CROP: Preconditions = Preconditions {
        requires_enrichment: true,
        rejects_error_marker: false,
    };
    const SUBSIDY: Preconditions = Preconditions {
        requires_enrichment: false,
        rejects_error_marker: true,
    };

    #[test]
    fn test_blank_text_always_rejected() {
        let weather = WeatherSnapshot::unknown("Sirsi");
        assert_eq!(
            check_preconditions(CROP, " \n", Some(&weather), false, "Error"),
            Err(ValidationError::EmptyText)
        );
        assert_eq!(
            check_preconditions(SUBSIDY, "", None, false, "Error"),
            Err(ValidationError::EmptyText)
        );
    }

    #[test]
    fn test_crop_needs_weather() {
        assert_eq!(
            check_preconditions(CROP, "N:40", None, false, "Error"),
            Err(ValidationError::MissingEnrichment)
        );
        let weather = WeatherSnapshot::unknown("Sirsi");
        assert_eq!(check_preconditions(CROP, "N:40", Some(&weather), false, "Error"), Ok(()));
    }

    #[test]
    fn test_crop_blocked_while_weather_pending() {
        let weather = WeatherSnapshot::unknown("Sirsi");
        assert_eq!(
            check_preconditions(CROP, "N:40", Some(&weather), true, "Error"),
            Err(ValidationError::EnrichmentPending)
        );
        assert_eq!(
            check_preconditions(CROP, "N:40", None, true, "Error"),
            Err(ValidationError::EnrichmentPending)
        );
        assert_eq!(check_preconditions(SUBSIDY, "Scheme: PM-KISAN", None, true, "Error"), Ok(()));
    }

    #[test]
    fn test_subsidy_rejects_error_marker() {
        assert_eq!(
            check_preconditions(SUBSIDY, "Error extracting text", None, false, "Error"),
            Err(ValidationError::ErrorMarkerInText)
        );
        assert_eq!(check_preconditions(SUBSIDY, "Scheme: PM-KISAN", None, false, "Error"), Ok(()));
    }

    #[test]
    fn test_error_marker_ignored_where_not_required() {
        let weather = WeatherSnapshot::unknown("Sirsi");
        assert_eq!(
            check_preconditions(CROP, "Error bars: 2%", Some(&weather), false, "Error"),
            Ok(())
        );
    }
}
