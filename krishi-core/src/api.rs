//! KrishiMitra backend client
//!
//! Provides a `KrishiBackend` trait covering every endpoint the workflows call,
//! and `HttpBackend`, the reqwest implementation used in production:
//! - **Extraction**: multipart image upload, returns OCR text
//! - **Weather**: coordinate and place-name lookups (lenient parsing)
//! - **Analysis**: crop advice, document summary, subsidy field extraction
//! - **Deadlines**: save, list, delete by id
//! - **Auth**: login, register
//!
//! Nothing here retries. A failed call is reported once and the caller decides.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::BackendConfig;
use crate::models::{
    Coordinates, DashboardSummary, DeadlineRecord, ExtractedDocument, Language, NewDeadline,
    Session, SubsidyDetails, UploadedImage, WeatherSnapshot,
};

const LOGIN_OK_MESSAGE: &str = "Login successful";

// ============================================================================
// KrishiBackend trait
// ============================================================================

/// Abstraction over the remote KrishiMitra service.
#[async_trait]
pub trait KrishiBackend: Send + Sync {
    /// Upload an image for OCR. The username is attached as a query parameter.
    async fn upload_document(
        &self,
        username: &str,
        image: &UploadedImage,
    ) -> Result<ExtractedDocument, ApiError>;

    async fn weather_by_coordinates(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherSnapshot, ApiError>;

    async fn weather_by_name(&self, place: &str) -> Result<WeatherSnapshot, ApiError>;

    /// Returns the free-text recommendation.
    async fn crop_advice(&self, request: &CropAdviceRequest<'_>) -> Result<String, ApiError>;

    async fn summarize(&self, text: &str, language: Language) -> Result<String, ApiError>;

    async fn analyze_subsidy(
        &self,
        text: &str,
        language: Language,
    ) -> Result<SubsidyDetails, ApiError>;

    async fn save_deadline(&self, deadline: &NewDeadline) -> Result<(), ApiError>;

    async fn list_deadlines(&self, username: &str) -> Result<Vec<DeadlineRecord>, ApiError>;

    async fn delete_deadline(&self, id: &str) -> Result<(), ApiError>;

    async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError>;

    async fn register(&self, registration: &Registration) -> Result<(), ApiError>;

    async fn dashboard(&self, username: &str) -> Result<DashboardSummary, ApiError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error ({status}): {detail}")]
    Backend { status: u16, detail: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid backend URL: {0}")]
    InvalidBaseUrl(String),
}

// ============================================================================
// Request types
// ============================================================================

/// Body of `POST /crop-advisor`.
#[derive(Debug, Serialize)]
pub struct CropAdviceRequest<'a> {
    pub soil_report: &'a str,
    pub language: Language,
    pub username: &'a str,
    pub location: &'a str,
    pub weather: &'a WeatherSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub preferred_language: Language,
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
    language: Language,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    extracted_text: Option<String>,
    document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    recommendation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubsidyResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    subsidy_name: Option<String>,
    #[serde(default)]
    eligibility: Value,
    #[serde(default)]
    required_documents: Value,
    #[serde(default)]
    deadline: Value,
}

#[derive(Debug, Deserialize)]
struct DeadlinesResponse {
    #[serde(default)]
    deadlines: Vec<DeadlineRecord>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    message: String,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

// ============================================================================
// HttpBackend
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: parse_base_url(&config.base_url)?,
        })
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Self, ApiError> {
        Ok(Self {
            client: Client::new(),
            base_url: parse_base_url(base_url.as_ref())?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_weather(&self, query: &[(&str, String)], label: String) -> Result<WeatherSnapshot, ApiError> {
        let url = self.endpoint(&["weather"])?;
        let response = check_status(self.client.get(url).query(query).send().await?).await?;
        let body = response.text().await?;

        let value = match serde_json::from_str::<Value>(&body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Weather body is not JSON, treating all readings as unknown");
                Value::Null
            }
        };
        Ok(WeatherSnapshot::from_weather_body(&value, label))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim()).map_err(|_| ApiError::InvalidBaseUrl(raw.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(url)
}

/// Turn a non-2xx response into `ApiError::Backend`, preferring the
/// server's `detail` message.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|d| match d {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| generic_failure(status));

    tracing::error!(status = status.as_u16(), detail = %detail, "Backend request failed");

    Err(ApiError::Backend {
        status: status.as_u16(),
        detail,
    })
}

fn generic_failure(status: StatusCode) -> String {
    format!("Request failed with status {}", status.as_u16())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

fn required(field: Option<String>, name: &str) -> Result<String, ApiError> {
    field.ok_or_else(|| ApiError::MalformedResponse(format!("missing field `{}`", name)))
}

/// Flatten a string-or-list field into lines, dropping blanks.
fn lines_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn subsidy_from_wire(wire: SubsidyResponse) -> SubsidyDetails {
    let deadline = match &wire.deadline {
        Value::String(s) if !s.trim().is_empty() => {
            match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::warn!(deadline = %s, error = %e, "Ignoring unparseable subsidy deadline");
                    None
                }
            }
        }
        _ => None,
    };

    SubsidyDetails {
        subsidy_name: wire.subsidy_name.filter(|n| !n.trim().is_empty()),
        eligibility_summary: lines_of(&wire.eligibility).join("; "),
        required_documents: lines_of(&wire.required_documents),
        deadline,
    }
}

#[async_trait]
impl KrishiBackend for HttpBackend {
    async fn upload_document(
        &self,
        username: &str,
        image: &UploadedImage,
    ) -> Result<ExtractedDocument, ApiError> {
        let url = self.endpoint(&["upload"])?;
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)?;
        let form = Form::new().part("file", part);

        tracing::debug!(username = %username, file = %image.file_name, "Uploading document for extraction");

        let response = self
            .client
            .post(url)
            .query(&[("username", username)])
            .multipart(form)
            .send()
            .await?;
        let wire: UploadResponse = read_json(check_status(response).await?).await?;

        Ok(ExtractedDocument {
            text: required(wire.extracted_text, "extracted_text")?,
            document_id: wire.document_id,
        })
    }

    async fn weather_by_coordinates(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherSnapshot, ApiError> {
        let query = [
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
        ];
        self.fetch_weather(&query, coordinates.label()).await
    }

    async fn weather_by_name(&self, place: &str) -> Result<WeatherSnapshot, ApiError> {
        let place = place.trim();
        self.fetch_weather(&[("q", place.to_string())], place.to_string())
            .await
    }

    async fn crop_advice(&self, request: &CropAdviceRequest<'_>) -> Result<String, ApiError> {
        let url = self.endpoint(&["crop-advisor"])?;
        let response = self.client.post(url).json(request).send().await?;
        let wire: RecommendationResponse = read_json(check_status(response).await?).await?;
        required(wire.recommendation, "recommendation")
    }

    async fn summarize(&self, text: &str, language: Language) -> Result<String, ApiError> {
        let url = self.endpoint(&["summarize"])?;
        let response = self
            .client
            .post(url)
            .json(&TextRequest { text, language })
            .send()
            .await?;
        let wire: SummaryResponse = read_json(check_status(response).await?).await?;
        required(wire.summary, "summary")
    }

    async fn analyze_subsidy(
        &self,
        text: &str,
        language: Language,
    ) -> Result<SubsidyDetails, ApiError> {
        let url = self.endpoint(&["subsidy", "analyze"])?;
        let response = self
            .client
            .post(url)
            .json(&TextRequest { text, language })
            .send()
            .await?;
        let status = response.status();
        let wire: SubsidyResponse = read_json(check_status(response).await?).await?;

        // The analyzer reports some failures with a 2xx status and an `error` field.
        if let Some(detail) = wire.error.clone() {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(subsidy_from_wire(wire))
    }

    async fn save_deadline(&self, deadline: &NewDeadline) -> Result<(), ApiError> {
        let url = self.endpoint(&["subsidy", "save-deadline"])?;
        let response = self.client.post(url).json(deadline).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_deadlines(&self, username: &str) -> Result<Vec<DeadlineRecord>, ApiError> {
        let url = self.endpoint(&["subsidy", "deadlines", username])?;
        let response = self.client.get(url).send().await?;
        let wire: DeadlinesResponse = read_json(check_status(response).await?).await?;
        Ok(wire.deadlines)
    }

    async fn delete_deadline(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["subsidy", "delete", id])?;
        let response = self.client.delete(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let url = self.endpoint(&["login"])?;
        let response = self
            .client
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let status = response.status();
        let wire: LoginResponse = read_json(check_status(response).await?).await?;

        if wire.message != LOGIN_OK_MESSAGE {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail: "Invalid login details".to_string(),
            });
        }

        let name = wire.username.unwrap_or_else(|| username.to_string());
        Session::new(name).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let url = self.endpoint(&["register"])?;
        let response = self.client.post(url).json(registration).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn dashboard(&self, username: &str) -> Result<DashboardSummary, ApiError> {
        let url = self.endpoint(&["dashboard", username])?;
        let response = self.client.get(url).send().await?;
        read_json(check_status(response).await?).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::with_base_url(server.uri()).expect("Failed to create backend")
    }

    fn soil_image() -> UploadedImage {
        UploadedImage::from_bytes("soil.png", vec![0x89, 0x50, 0x4E, 0x47]).unwrap()
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            HttpBackend::with_base_url("not a url"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_segments() {
        let backend = HttpBackend::with_base_url("http://farm.example/api/").unwrap();
        let url = backend.endpoint(&["subsidy", "deadlines", "ravi kumar"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://farm.example/api/subsidy/deadlines/ravi%20kumar"
        );
    }

    #[test]
    fn test_config_timeout_is_optional() {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_seconds: Some(5),
        };
        assert!(HttpBackend::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_with_username() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(query_param("username", "ramesh"))
            .and(body_string_contains("filename=\"soil.png\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "document_id": "doc-1",
                "extracted_text": "N:40 P:30 K:20"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let doc = backend(&server)
            .await
            .upload_document("ramesh", &soil_image())
            .await
            .unwrap();
        assert_eq!(doc.text, "N:40 P:30 K:20");
        assert_eq!(doc.document_id.as_deref(), Some("doc-1"));
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "detail": "OCR failure: cannot identify image file" })),
            )
            .mount(&server)
            .await;

        let err = backend(&server)
            .await
            .upload_document("ramesh", &soil_image())
            .await
            .unwrap_err();
        match err {
            ApiError::Backend { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "OCR failure: cannot identify image file");
            }
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_without_text_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "document_id": "x" })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .await
            .upload_document("ramesh", &soil_image())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_non_json_error_body_gets_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = backend(&server).await.list_deadlines("ramesh").await.unwrap_err();
        match err {
            ApiError::Backend { status, detail } => {
                assert_eq!(status, 502);
                assert_eq!(detail, "Request failed with status 502");
            }
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_weather_by_name_queries_place() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Sirsi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "main": { "temp": 28, "humidity": 60 },
                "wind": { "speed": 3.2 },
                "weather": [{ "description": "clear sky" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let w = backend(&server).await.weather_by_name(" Sirsi ").await.unwrap();
        assert_eq!(w.temperature, Some(28.0));
        assert_eq!(w.condition.as_deref(), Some("clear sky"));
        assert_eq!(w.location_label, "Sirsi");
    }

    #[tokio::test]
    async fn test_weather_by_coordinates_labels_with_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "14.62"))
            .and(query_param("lon", "74.84"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "main": { "temp": 24.5 }
            })))
            .mount(&server)
            .await;

        let w = backend(&server)
            .await
            .weather_by_coordinates(Coordinates::new(14.62, 74.84))
            .await
            .unwrap();
        assert_eq!(w.temperature, Some(24.5));
        assert_eq!(w.humidity, None);
        assert_eq!(w.location_label, "14.62, 74.84");
    }

    #[tokio::test]
    async fn test_weather_non_json_body_degrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let w = backend(&server).await.weather_by_name("Sirsi").await.unwrap();
        assert_eq!(w, WeatherSnapshot::unknown("Sirsi"));
    }

    #[tokio::test]
    async fn test_summarize_sends_language_tag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize"))
            .and(body_json(json!({ "text": "Form 12", "language": "kannada" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "summary": "ಸಾರಾಂಶ" })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = backend(&server)
            .await
            .summarize("Form 12", Language::Kannada)
            .await
            .unwrap();
        assert_eq!(summary, "ಸಾರಾಂಶ");
    }

    #[tokio::test]
    async fn test_subsidy_accepts_lists_and_iso_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subsidy/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subsidy_name": "PM-KISAN",
                "eligibility": ["Small farmer", "Owns land"],
                "required_documents": ["Aadhaar", "Land record"],
                "deadline": "2024-05-31"
            })))
            .mount(&server)
            .await;

        let details = backend(&server)
            .await
            .analyze_subsidy("form text", Language::English)
            .await
            .unwrap();
        assert_eq!(details.subsidy_name.as_deref(), Some("PM-KISAN"));
        assert_eq!(details.eligibility_summary, "Small farmer; Owns land");
        assert_eq!(details.required_documents, vec!["Aadhaar", "Land record"]);
        assert_eq!(details.deadline, NaiveDate::from_ymd_opt(2024, 5, 31));
    }

    #[tokio::test]
    async fn test_subsidy_accepts_strings_and_blank_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subsidy_name": "Not found",
                "eligibility": "",
                "required_documents": "Aadhaar card",
                "deadline": ""
            })))
            .mount(&server)
            .await;

        let details = backend(&server)
            .await
            .analyze_subsidy("form text", Language::English)
            .await
            .unwrap();
        assert_eq!(details.eligibility_summary, "");
        assert_eq!(details.required_documents, vec!["Aadhaar card"]);
        assert_eq!(details.deadline, None);
    }

    #[tokio::test]
    async fn test_subsidy_error_field_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "No text received" })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .await
            .analyze_subsidy(" ", Language::English)
            .await
            .unwrap_err();
        match err {
            ApiError::Backend { detail, .. } => assert_eq!(detail, "No text received"),
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_deadlines_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subsidy/deadlines/ramesh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deadlines": [] })))
            .mount(&server)
            .await;

        let list = backend(&server).await.list_deadlines("ramesh").await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_delete_uses_id_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/subsidy/delete/65f1c0ffee"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Deadline deleted" })))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server).await.delete_deadline("65f1c0ffee").await.unwrap();
    }

    #[tokio::test]
    async fn test_login_success_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({ "username": "ramesh", "password": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Login successful",
                "username": "ramesh"
            })))
            .mount(&server)
            .await;

        let session = backend(&server).await.login("ramesh", "secret").await.unwrap();
        assert_eq!(session.username(), "ramesh");
    }

    #[tokio::test]
    async fn test_login_rejected_with_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid username or password" })),
            )
            .mount(&server)
            .await;

        let err = backend(&server).await.login("ramesh", "wrong").await.unwrap_err();
        match err {
            ApiError::Backend { status, detail } => {
                assert_eq!(status, 401);
                assert_eq!(detail, "Invalid username or password");
            }
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_unexpected_message_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Maybe" })))
            .mount(&server)
            .await;

        let err = backend(&server).await.login("ramesh", "secret").await.unwrap_err();
        assert!(matches!(err, ApiError::Backend { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_register_sends_preferred_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .and(body_json(json!({
                "username": "ramesh",
                "password": "secret",
                "preferred_language": "kannada"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "User registered" })))
            .expect(1)
            .mount(&server)
            .await;

        let registration = Registration {
            username: "ramesh".to_string(),
            password: "secret".to_string(),
            preferred_language: Language::Kannada,
        };
        backend(&server).await.register(&registration).await.unwrap();
    }

    #[tokio::test]
    async fn test_dashboard_parses_collections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dashboard/ramesh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "ramesh",
                "documents": [{ "_id": "d1", "filename": "soil.png", "extracted_text": "N:40", "summary": null }],
                "recommendations": [],
                "deadlines": [{ "_id": "k1", "username": "ramesh", "subsidy_name": "PM-KISAN", "deadline": "2024-05-31" }]
            })))
            .mount(&server)
            .await;

        let dash = backend(&server).await.dashboard("ramesh").await.unwrap();
        assert_eq!(dash.documents.len(), 1);
        assert_eq!(dash.documents[0].filename.as_deref(), Some("soil.png"));
        assert_eq!(dash.deadlines[0].subsidy_name, "PM-KISAN");
    }
}
