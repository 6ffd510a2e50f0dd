use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Text produced by the extraction endpoint for one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub document_id: Option<String>,
}

/// Fields the subsidy analyzer pulls out of a scanned form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubsidyDetails {
    pub subsidy_name: Option<String>,
    pub eligibility_summary: String,
    pub required_documents: Vec<String>,
    pub deadline: Option<NaiveDate>,
}

impl SubsidyDetails {
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.subsidy_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnalysisResult {
    Recommendation(String),
    Summary(String),
    Subsidy(SubsidyDetails),
}

impl AnalysisResult {
    pub fn subsidy(&self) -> Option<&SubsidyDetails> {
        match self {
            AnalysisResult::Subsidy(details) => Some(details),
            _ => None,
        }
    }

    /// Free-text body for the recommendation and summary variants.
    pub fn text(&self) -> Option<&str> {
        match self {
            AnalysisResult::Recommendation(t) | AnalysisResult::Summary(t) => Some(t),
            AnalysisResult::Subsidy(_) => None,
        }
    }
}
