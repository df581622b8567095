//! # smartbin-api
//!
//! REST API server for SmartBin: photo classification through Gemini,
//! scan history and advice formatting.
//!

mod api;
pub mod config;
pub mod gemini;

pub use api::{
    app, ask, classify, format, health_check, history, history_record, AppError, AppState,
    AskRequest, AskResponse, ClassifyResponse, ErrorResponse, FormatRequest, FormatResponse,
    HistoryQuery, RecordResponse,
};
pub use config::{ApiConfig, ConfigError};
pub use gemini::GeminiClient;
