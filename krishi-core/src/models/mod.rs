pub mod analysis;
pub mod dashboard;
pub mod deadline;
pub mod image;
pub mod language;
pub mod session;
pub mod weather;

pub use analysis::{AnalysisResult, ExtractedDocument, SubsidyDetails};
pub use dashboard::{DashboardSummary, DocumentRecord, RecommendationRecord};
pub use deadline::{parse_deadline_input, DeadlineRecord, NewDeadline};
pub use image::UploadedImage;
pub use language::Language;
pub use session::Session;
pub use weather::{Coordinates, WeatherSnapshot};
