use crate::config::ApiConfig;
use crate::gemini::GeminiClient;
use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Json, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use smartbin::{
    advice::format_advice,
    classify::{
        downscale, validate_image_data, Assistant, ClassifyError, Classifier, DownscaleOptions,
        FallbackClassifier, ImageInput,
    },
    history::{ClassificationRecord, HistoryStore, JsonFileStore},
    SmartBinError,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub assistant: Arc<dyn Assistant>,
    pub history: Arc<dyn HistoryStore>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        assistant: Arc<dyn Assistant>,
        history: Arc<dyn HistoryStore>,
        config: ApiConfig,
    ) -> Self {
        Self {
            classifier,
            assistant,
            history,
            config: Arc::new(config),
        }
    }

    /// Wire up the Gemini backends and the on-disk history from configuration
    pub fn from_config(config: ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let candidates: Vec<Arc<dyn Classifier>> = config
            .gemini_models
            .iter()
            .map(|model| {
                Arc::new(GeminiClient::with_client(
                    http.clone(),
                    config.gemini_endpoint.clone(),
                    config.gemini_api_key.clone(),
                    model.clone(),
                )) as Arc<dyn Classifier>
            })
            .collect();
        let classifier: Arc<dyn Classifier> = if candidates.len() == 1 {
            Arc::clone(&candidates[0])
        } else {
            Arc::new(FallbackClassifier::new(candidates))
        };

        let assistant = Arc::new(GeminiClient::with_client(
            http,
            config.gemini_endpoint.clone(),
            config.gemini_api_key.clone(),
            config.ask_model.clone(),
        ));

        let history_path = config.history_path();
        let history = JsonFileStore::open(&history_path)
            .with_context(|| format!("Failed to open history at {}", history_path.display()))?
            .with_max_records(config.history_limit);

        info!(
            classifier = classifier.name(),
            ask_model = %config.ask_model,
            history = %history_path.display(),
            "application state ready"
        );
        Ok(Self::new(classifier, assistant, Arc::new(history), config))
    }
}

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// Human-readable error message describing what went wrong
    pub error: String,
    /// Upstream detail, when there is any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Response for a successful classification
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub success: bool,
    pub record: ClassificationRecord,
    /// Advice rendered from the record's text
    pub html: String,
}

/// A single stored record with its rendered advice
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub record: ClassificationRecord,
    pub html: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Return only this many records, newest first
    pub limit: Option<usize>,
}

/// Request payload for the question endpoint; either field is accepted
#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
    pub input: Option<String>,
}

impl AskRequest {
    /// The first non-blank of `question` and `input`
    pub fn prompt(&self) -> Option<&str> {
        [self.question.as_deref(), self.input.as_deref()]
            .into_iter()
            .flatten()
            .find(|p| !p.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub html: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormatResponse {
    pub html: String,
}

/// Application-specific error types for the API
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No file uploaded (field name = image)")]
    NoFile,

    #[error("{0}")]
    BadRequest(String),

    #[error("Uploaded file too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Failed to read upload: {message}")]
    Upload { status: StatusCode, message: String },

    #[error("Missing GEMINI_API_KEY in environment")]
    MissingApiKey,

    #[error("Classifier not configured: {0}")]
    NotConfigured(String),

    #[error("Classification request failed")]
    Classification(ClassifyError),

    #[error("No question provided")]
    NoQuestion,

    #[error("AI request failed")]
    Ask(ClassifyError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("History error: {0}")]
    History(#[from] SmartBinError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Map a classifier failure during `/api/classify`
    pub fn from_classify(err: ClassifyError) -> Self {
        match err {
            ClassifyError::MissingCredentials(_) => AppError::MissingApiKey,
            ClassifyError::NotConfigured(msg) => AppError::NotConfigured(msg),
            ClassifyError::InvalidImageData(msg) => AppError::BadRequest(msg),
            other => AppError::Classification(other),
        }
    }

    /// Map an assistant failure during `/api/ask`
    pub fn from_ask(err: ClassifyError) -> Self {
        match err {
            ClassifyError::MissingCredentials(_) => AppError::MissingApiKey,
            other => AppError::Ask(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoFile | AppError::BadRequest(_) | AppError::NoQuestion => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upload { status, .. } => *status,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Classification(_) | AppError::Ask(_) => StatusCode::BAD_GATEWAY,
            AppError::MissingApiKey
            | AppError::NotConfigured(_)
            | AppError::History(_)
            | AppError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::Classification(e) => Some(e.to_string()),
            _ => None,
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, details = ?details, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let error_response = ErrorResponse {
            success: false,
            error: self.to_string(),
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

/// Run image or file work on the blocking pool
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await?)
}

/// Build the application router with all routes configured
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    let static_dir = state.config.static_dir.clone();

    let mut router = Router::new()
        .route("/api/classify", post(classify))
        .route("/api/history", get(history))
        .route("/api/history/{id}", get(history_record))
        .route("/api/ask", post(ask))
        .route("/api/format", post(format))
        .route("/api/health", get(health_check));

    if static_dir.is_dir() {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Classify an uploaded photo, store the result and return rendered advice
pub async fn classify(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            let filename = field.file_name().map(String::from);
            let declared_type = field.content_type().map(String::from);
            let data = field.bytes().await?;
            upload = Some((filename, declared_type, data));
            break;
        }
    }

    let (filename, declared_type, data) = upload.ok_or(AppError::NoFile)?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(data.len()));
    }

    let format = validate_image_data(&data).map_err(AppError::from_classify)?;
    info!(
        file = filename.as_deref().unwrap_or("-"),
        declared_type = declared_type.as_deref().unwrap_or("-"),
        detected_type = format.mime_type(),
        bytes = data.len(),
        "classify request"
    );

    let mut image = ImageInput::new(data.to_vec(), format.mime_type());
    if let Some(name) = &filename {
        image = image.with_filename(name.clone());
    }
    if state.config.downscale_images {
        image = run_blocking(move || downscale(image, &DownscaleOptions::default())).await?;
    }

    let classification = state
        .classifier
        .classify(&image)
        .await
        .map_err(AppError::from_classify)?;

    let original_name = filename
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("upload.{}", format.extension()));
    let record = ClassificationRecord::new(original_name, &classification);

    let history = Arc::clone(&state.history);
    let stored = record.clone();
    let persisted = run_blocking(move || history.append(stored))
        .await
        .and_then(|result| result.map_err(AppError::from));
    if let Err(e) = persisted {
        error!(error = %e, id = %record.id, "failed to persist classification");
    }

    let html = format_advice(record.advice_text());
    info!(id = %record.id, model = %record.used_model, "classification stored");

    let response = ClassifyResponse {
        success: true,
        record,
        html,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Full history, or the most recent `limit` records
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, AppError> {
    let history = Arc::clone(&state.history);
    let records = run_blocking(move || match query.limit {
        Some(limit) => history.list_recent(limit),
        None => history.list_all(),
    })
    .await??;
    Ok((StatusCode::OK, Json(records)).into_response())
}

/// One stored record with its advice rendered
pub async fn history_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let history = Arc::clone(&state.history);
    let lookup = id.clone();
    let record = run_blocking(move || history.get(&lookup))
        .await??
        .ok_or(AppError::NotFound(id))?;
    let html = format_advice(record.advice_text());
    Ok((StatusCode::OK, Json(RecordResponse { record, html })).into_response())
}

/// Answer a free-text question about waste handling
pub async fn ask(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Response, AppError> {
    let prompt = payload.prompt().ok_or(AppError::NoQuestion)?;
    info!(chars = prompt.chars().count(), "ask request");

    let answer = state
        .assistant
        .ask(prompt)
        .await
        .map_err(AppError::from_ask)?;
    let html = format_advice(answer.as_str());

    Ok((StatusCode::OK, Json(AskResponse { answer, html })).into_response())
}

/// Render arbitrary advice text
pub async fn format(Json(payload): Json<FormatRequest>) -> impl IntoResponse {
    Json(FormatResponse {
        html: format_advice(payload.text.as_deref()),
    })
}

/// Health check endpoint for monitoring and load balancing
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "SmartBin API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
