//! Render-ready snapshot of one workflow instance.
//!
//! Nothing here talks to the backend. A view is rebuilt from controller
//! state on demand, so whatever the CLI (or any other front end) shows is
//! always derived from the gate, never tracked separately.

use krishi_core::config::WorkflowConfig;
use krishi_core::models::{AnalysisResult, Language, WeatherSnapshot};
use krishi_core::ValidationError;
use serde::Serialize;

use crate::controller::{WorkflowKind, WorkflowState};
use crate::gating::{EnrichmentStage, Stage};
use crate::subsystems::analysis;

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowView {
    pub kind: WorkflowKind,
    pub stage: Stage,
    pub enrichment: EnrichmentStage,
    pub language: Language,
    pub in_progress: bool,
    pub can_extract: bool,
    pub can_analyze: bool,
    /// Why analysis would be rejected right now, if it would be.
    pub blocked_reason: Option<String>,
    pub progress_label: Option<&'static str>,
    pub extracted_text: Option<String>,
    pub weather: Option<WeatherSnapshot>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub enrichment_error: Option<String>,
    /// Last client-side validation message.
    pub notice: Option<String>,
}

impl WorkflowView {
    pub(crate) fn build(
        kind: WorkflowKind,
        state: &WorkflowState,
        settings: &WorkflowConfig,
    ) -> Self {
        let gate = &state.gate;
        let text = state.extracted.as_ref().map(|d| d.text.as_str());

        let blocked = if !gate.text_ready() {
            Some(ValidationError::EmptyText.to_string())
        } else {
            analysis::check_preconditions(
                kind.preconditions(),
                text.unwrap_or_default(),
                state.enrichment.as_ref(),
                gate.enrichment() == EnrichmentStage::Pending,
                &settings.error_marker,
            )
            .err()
            .map(|e| e.to_string())
        };

        Self {
            kind,
            stage: gate.stage(),
            enrichment: gate.enrichment(),
            language: state.language,
            in_progress: gate.in_progress(),
            can_extract: gate.can_extract() && gate.stage() != Stage::Extracting,
            can_analyze: gate.can_analyze()
                && gate.stage() != Stage::Analyzing
                && blocked.is_none(),
            blocked_reason: blocked,
            progress_label: progress_label(kind, gate.stage(), gate.enrichment()),
            extracted_text: text.map(str::to_string),
            weather: state.enrichment.clone(),
            result: state.result.clone(),
            error: state.error.clone(),
            enrichment_error: state.enrichment_error.clone(),
            notice: state.notice.clone(),
        }
    }

    pub fn has_result(&self) -> bool {
        self.stage == Stage::ResultReady && self.result.is_some()
    }
}

/// Busy label for the call currently outstanding; the main line wins over
/// a pending weather lookup.
pub fn progress_label(
    kind: WorkflowKind,
    stage: Stage,
    enrichment: EnrichmentStage,
) -> Option<&'static str> {
    match (kind, stage) {
        (WorkflowKind::CropAdvisory, Stage::Extracting) => Some("Reading soil report..."),
        (WorkflowKind::CropAdvisory, Stage::Analyzing) => Some("Generating crop advice..."),
        (WorkflowKind::DocumentSummary, Stage::Extracting) => Some("Processing document..."),
        (WorkflowKind::DocumentSummary, Stage::Analyzing) => {
            Some("Extracting text and generating summary...")
        }
        (WorkflowKind::Subsidy, Stage::Extracting) => Some("Extracting text..."),
        (WorkflowKind::Subsidy, Stage::Analyzing) => Some("Analyzing details..."),
        _ if enrichment == EnrichmentStage::Pending => Some("Fetching weather..."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_label_per_kind() {
        assert_eq!(
            progress_label(WorkflowKind::CropAdvisory, Stage::Extracting, EnrichmentStage::Absent),
            Some("Reading soil report...")
        );
        assert_eq!(
            progress_label(WorkflowKind::Subsidy, Stage::Analyzing, EnrichmentStage::Absent),
            Some("Analyzing details...")
        );
        assert_eq!(
            progress_label(WorkflowKind::DocumentSummary, Stage::TextReady, EnrichmentStage::Absent),
            None
        );
    }

    #[test]
    fn test_weather_label_only_when_main_line_idle() {
        assert_eq!(
            progress_label(WorkflowKind::CropAdvisory, Stage::TextReady, EnrichmentStage::Pending),
            Some("Fetching weather...")
        );
        assert_eq!(
            progress_label(WorkflowKind::CropAdvisory, Stage::Extracting, EnrichmentStage::Pending),
            Some("Reading soil report...")
        );
    }
}
