pub mod api;
pub mod config;
pub mod error;
pub mod models;

pub use api::{ApiError, HttpBackend, KrishiBackend};
pub use config::KrishiConfig;
pub use error::{KrishiError, ValidationError};
pub use models::{
    AnalysisResult, DashboardSummary, DeadlineRecord, ExtractedDocument, Language, NewDeadline,
    Session, SubsidyDetails, UploadedImage, WeatherSnapshot,
};
