//! Workflow controller, one instance per screen visit.
//!
//! The same controller drives the crop advisor, the document interpreter and
//! the subsidy tracker; `WorkflowKind` picks the analysis endpoint, the
//! precondition set and the result shape.
//!
//! Every submission takes a fresh generation number and cancels the token of
//! the submission it replaces. A response is only written to state if its
//! generation is still current, so a slow reply for an old image can never
//! overwrite results for a newer one. Extraction/analysis and enrichment
//! have separate generations because they run side by side.

use krishi_core::config::WorkflowConfig;
use krishi_core::models::{
    AnalysisResult, ExtractedDocument, Language, Session, SubsidyDetails, UploadedImage,
    WeatherSnapshot,
};
use krishi_core::{KrishiBackend, KrishiError, ValidationError};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::gating::{EnrichmentStage, Gate};
use crate::presentation::WorkflowView;
use crate::subsystems::analysis::{self, AnalysisInput, Preconditions};
use crate::subsystems::enrichment::{self, FixedLocation, Locate};
use crate::subsystems::extraction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    CropAdvisory,
    DocumentSummary,
    Subsidy,
}

impl WorkflowKind {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowKind::CropAdvisory => "crop_advisory",
            WorkflowKind::DocumentSummary => "document_summary",
            WorkflowKind::Subsidy => "subsidy",
        }
    }

    pub fn preconditions(&self) -> Preconditions {
        match self {
            WorkflowKind::CropAdvisory => Preconditions {
                requires_enrichment: true,
                rejects_error_marker: false,
            },
            WorkflowKind::DocumentSummary => Preconditions {
                requires_enrichment: false,
                rejects_error_marker: false,
            },
            WorkflowKind::Subsidy => Preconditions {
                requires_enrichment: false,
                rejects_error_marker: true,
            },
        }
    }

    /// The subsidy tracker always analyzes in English.
    pub fn offers_language_choice(&self) -> bool {
        !matches!(self, WorkflowKind::Subsidy)
    }

    pub fn uses_enrichment(&self) -> bool {
        self.preconditions().requires_enrichment
    }
}

/// One in-flight lane: a generation counter plus the token of its latest
/// submission.
#[derive(Debug, Default)]
struct Lane {
    generation: u64,
    token: CancellationToken,
}

impl Lane {
    fn supersede(&mut self) -> (u64, CancellationToken) {
        self.token.cancel();
        self.generation += 1;
        self.token = CancellationToken::new();
        (self.generation, self.token.clone())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

#[derive(Debug)]
pub(crate) struct WorkflowState {
    pub(crate) gate: Gate,
    pub(crate) image: Option<UploadedImage>,
    pub(crate) extracted: Option<ExtractedDocument>,
    pub(crate) enrichment: Option<WeatherSnapshot>,
    pub(crate) result: Option<AnalysisResult>,
    pub(crate) error: Option<String>,
    pub(crate) enrichment_error: Option<String>,
    pub(crate) notice: Option<String>,
    pub(crate) language: Language,
    pipeline: Lane,
    enrichment_lane: Lane,
}

pub struct WorkflowController {
    kind: WorkflowKind,
    session: Session,
    backend: Arc<dyn KrishiBackend>,
    locator: Arc<dyn Locate>,
    settings: WorkflowConfig,
    state: Mutex<WorkflowState>,
}

impl WorkflowController {
    pub fn new(
        kind: WorkflowKind,
        session: Session,
        backend: Arc<dyn KrishiBackend>,
        settings: WorkflowConfig,
    ) -> Self {
        let language = if kind.offers_language_choice() {
            settings.default_language
        } else {
            Language::English
        };

        Self {
            kind,
            session,
            backend,
            locator: Arc::new(FixedLocation(None)),
            settings,
            state: Mutex::new(WorkflowState {
                gate: Gate::new(),
                image: None,
                extracted: None,
                enrichment: None,
                result: None,
                error: None,
                enrichment_error: None,
                notice: None,
                language,
                pipeline: Lane::default(),
                enrichment_lane: Lane::default(),
            }),
        }
    }

    /// Replace the device position source (none by default).
    pub fn with_locator(mut self, locator: Arc<dyn Locate>) -> Self {
        self.locator = locator;
        self
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn set_language(&self, language: Language) {
        if !self.kind.offers_language_choice() {
            tracing::debug!(workflow = self.kind.name(), "Language choice not offered, keeping english");
            return;
        }
        self.state.lock().await.language = language;
    }

    /// Select a new image. Clears extracted text, the result, and any error,
    /// and supersedes whatever extraction or analysis is in flight.
    pub async fn select_image(&self, image: UploadedImage) {
        let mut state = self.state.lock().await;
        let (generation, _) = state.pipeline.supersede();
        tracing::debug!(
            workflow = self.kind.name(),
            generation,
            file = %image.file_name,
            "Image selected"
        );
        state.image = Some(image);
        state.extracted = None;
        state.result = None;
        state.error = None;
        state.notice = None;
        state.gate.select_image();
    }

    pub async fn extract(&self) -> Result<ExtractedDocument, KrishiError> {
        let (image, generation, token) = {
            let mut state = self.state.lock().await;
            let image = match state.image.clone() {
                Some(image) => image,
                None => return Err(Self::reject(&mut state, ValidationError::MissingImage)),
            };
            state.gate.begin_extraction()?;
            let (generation, token) = state.pipeline.supersede();
            state.extracted = None;
            state.result = None;
            state.error = None;
            state.notice = None;
            (image, generation, token)
        };

        let outcome = Self::guarded(
            &token,
            extraction::extract(self.backend.as_ref(), &self.session, &image),
        )
        .await?;

        let mut state = self.state.lock().await;
        if !state.pipeline.is_current(generation) {
            tracing::debug!(workflow = self.kind.name(), generation, "Discarding stale extraction");
            return Err(KrishiError::Superseded);
        }
        match outcome {
            Ok(doc) => {
                state.extracted = Some(doc.clone());
                state.gate.finish_extraction(true);
                Ok(doc)
            }
            Err(e) => {
                state.error = Some(e.user_message());
                state.gate.finish_extraction(false);
                Err(e)
            }
        }
    }

    pub async fn locate_by_device(&self) -> Result<WeatherSnapshot, KrishiError> {
        let backend = self.backend.clone();
        let locator = self.locator.clone();
        self.enrich(async move {
            enrichment::locate_by_device(backend.as_ref(), locator.as_ref()).await
        })
        .await
    }

    /// Blank names are rejected without a request.
    pub async fn locate_by_name(&self, place: &str) -> Result<WeatherSnapshot, KrishiError> {
        if place.trim().is_empty() {
            let mut state = self.state.lock().await;
            return Err(Self::reject(&mut state, ValidationError::BlankLocation));
        }
        let backend = self.backend.clone();
        let place = place.to_string();
        self.enrich(async move { enrichment::locate_by_name(backend.as_ref(), &place).await })
            .await
    }

    async fn enrich<F>(&self, lookup: F) -> Result<WeatherSnapshot, KrishiError>
    where
        F: Future<Output = Result<WeatherSnapshot, KrishiError>>,
    {
        let (generation, token) = {
            let mut state = self.state.lock().await;
            state.gate.begin_enrichment();
            state.enrichment_error = None;
            state.enrichment_lane.supersede()
        };

        let outcome = Self::guarded(&token, lookup).await?;

        let mut state = self.state.lock().await;
        if !state.enrichment_lane.is_current(generation) {
            tracing::debug!(workflow = self.kind.name(), generation, "Discarding stale weather");
            return Err(KrishiError::Superseded);
        }
        match outcome {
            Ok(weather) => {
                state.enrichment = Some(weather.clone());
                state.gate.finish_enrichment(true);
                Ok(weather)
            }
            Err(e) => {
                // An earlier snapshot stays usable after a failed refresh.
                state.enrichment_error = Some(e.user_message());
                let present = state.enrichment.is_some();
                state.gate.finish_enrichment(present);
                Err(e)
            }
        }
    }

    pub async fn analyze(&self) -> Result<AnalysisResult, KrishiError> {
        let (input, generation, token) = {
            let mut state = self.state.lock().await;
            let text = state
                .extracted
                .as_ref()
                .map(|d| d.text.clone())
                .unwrap_or_default();
            if let Err(v) = analysis::check_preconditions(
                self.kind.preconditions(),
                &text,
                state.enrichment.as_ref(),
                state.gate.enrichment() == EnrichmentStage::Pending,
                &self.settings.error_marker,
            ) {
                tracing::info!(workflow = self.kind.name(), reason = %v, "Analysis rejected before request");
                return Err(Self::reject(&mut state, v));
            }
            state.gate.begin_analysis()?;
            let (generation, token) = state.pipeline.supersede();
            state.result = None;
            state.error = None;
            state.notice = None;
            let input = AnalysisInput {
                text,
                enrichment: state.enrichment.clone(),
                language: state.language,
            };
            (input, generation, token)
        };

        let outcome = Self::guarded(
            &token,
            analysis::run(
                self.backend.as_ref(),
                self.kind,
                &self.session,
                &input,
                &self.settings.default_location_label,
            ),
        )
        .await?;

        let mut state = self.state.lock().await;
        if !state.pipeline.is_current(generation) {
            tracing::debug!(workflow = self.kind.name(), generation, "Discarding stale analysis");
            return Err(KrishiError::Superseded);
        }
        match outcome {
            Ok(result) => {
                state.result = Some(result.clone());
                state.gate.finish_analysis(true);
                Ok(result)
            }
            Err(e) => {
                state.result = None;
                state.error = Some(e.user_message());
                state.gate.finish_analysis(false);
                Err(e)
            }
        }
    }

    /// Extract, then analyze straight away if extraction succeeded.
    pub async fn interpret(&self) -> Result<AnalysisResult, KrishiError> {
        self.extract().await?;
        self.analyze().await
    }

    /// Latest subsidy details, if this is a subsidy workflow with a result.
    pub async fn subsidy_details(&self) -> Option<SubsidyDetails> {
        let state = self.state.lock().await;
        state.result.as_ref().and_then(|r| r.subsidy()).cloned()
    }

    pub async fn view(&self) -> WorkflowView {
        let state = self.state.lock().await;
        WorkflowView::build(self.kind, &state, &self.settings)
    }

    fn reject(state: &mut WorkflowState, error: ValidationError) -> KrishiError {
        state.notice = Some(error.to_string());
        error.into()
    }

    /// Run `call` unless `token` is cancelled first; cancellation drops the
    /// in-flight request.
    async fn guarded<T, F>(token: &CancellationToken, call: F) -> Result<T, KrishiError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            _ = token.cancelled() => Err(KrishiError::Superseded),
            out = call => Ok(out),
        }
    }
}
