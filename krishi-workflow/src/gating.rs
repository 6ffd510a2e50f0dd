//! Presentation gating for one workflow instance.
//!
//! The main line runs `Idle → ImageSelected → Extracting → TextReady →
//! Analyzing → ResultReady`, with `Error` reachable from both call stages.
//! Enrichment is tracked on its own axis so a weather lookup can start or
//! finish at any point relative to extraction. Only call completions and
//! explicit user actions move the gate.

use krishi_core::KrishiError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    ImageSelected,
    Extracting,
    TextReady,
    Analyzing,
    ResultReady,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::ImageSelected => "image selected",
            Stage::Extracting => "extracting",
            Stage::TextReady => "text ready",
            Stage::Analyzing => "analyzing",
            Stage::ResultReady => "result ready",
            Stage::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStage {
    Absent,
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Gate {
    stage: Stage,
    enrichment: EnrichmentStage,
    text_ready: bool,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            enrichment: EnrichmentStage::Absent,
            text_ready: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn enrichment(&self) -> EnrichmentStage {
        self.enrichment
    }

    /// Extracted text is present and belongs to the current image.
    pub fn text_ready(&self) -> bool {
        self.text_ready
    }

    pub fn in_progress(&self) -> bool {
        matches!(self.stage, Stage::Extracting | Stage::Analyzing)
            || self.enrichment == EnrichmentStage::Pending
    }

    pub fn can_extract(&self) -> bool {
        self.stage != Stage::Idle
    }

    /// Main-line check only. Workflow-specific preconditions live in
    /// `subsystems::analysis`.
    pub fn can_analyze(&self) -> bool {
        self.text_ready && self.stage != Stage::Extracting
    }

    /// Allowed from every stage. Any in-flight call is superseded.
    pub fn select_image(&mut self) {
        self.stage = Stage::ImageSelected;
        self.text_ready = false;
    }

    pub fn begin_extraction(&mut self) -> Result<(), KrishiError> {
        if !self.can_extract() {
            return Err(self.invalid("extract text"));
        }
        self.stage = Stage::Extracting;
        self.text_ready = false;
        Ok(())
    }

    pub fn finish_extraction(&mut self, succeeded: bool) {
        if succeeded {
            self.stage = Stage::TextReady;
            self.text_ready = true;
        } else {
            self.stage = Stage::Error;
            self.text_ready = false;
        }
    }

    pub fn begin_analysis(&mut self) -> Result<(), KrishiError> {
        if !self.can_analyze() {
            return Err(self.invalid("analyze"));
        }
        self.stage = Stage::Analyzing;
        Ok(())
    }

    /// Text survives a failed analysis so the user can retry it directly.
    pub fn finish_analysis(&mut self, succeeded: bool) {
        self.stage = if succeeded {
            Stage::ResultReady
        } else {
            Stage::Error
        };
    }

    pub fn begin_enrichment(&mut self) {
        self.enrichment = EnrichmentStage::Pending;
    }

    /// `context_present` is whether an enrichment context is held after the
    /// call, including one kept from an earlier successful lookup.
    pub fn finish_enrichment(&mut self, context_present: bool) {
        self.enrichment = if context_present {
            EnrichmentStage::Ready
        } else {
            EnrichmentStage::Failed
        };
    }

    fn invalid(&self, action: &str) -> KrishiError {
        KrishiError::InvalidTransition {
            from: self.stage.to_string(),
            action: action.to_string(),
        }
    }
}
