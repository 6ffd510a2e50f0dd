use serde::{Deserialize, Serialize};

use super::deadline::DeadlineRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Everything the backend has stored for one farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub username: String,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub recommendations: Vec<RecommendationRecord>,
    #[serde(default)]
    pub deadlines: Vec<DeadlineRecord>,
}
