//! Image classification capability
//!
//! The external vision service has changed several times (direct HTTP
//! calls, hosted inference with model lists, vision-language models), so
//! the rest of the system only sees the [`Classifier`] trait:
//!
//! - **Classifier**: `classify(image) -> Classification`
//! - **Assistant**: free-text question answering for the same backend
//! - **FallbackClassifier**: tries candidates in order, moving on only when a
//!   model is reported as not found
//! - **MockClassifier**: canned results for tests and offline development
//!
//! # Example
//!
//! ```rust
//! use smartbin::classify::{Classifier, FallbackClassifier, ImageInput, MockClassifier};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let classifier = FallbackClassifier::new(vec![
//!     Arc::new(MockClassifier::model_not_found("retired-model")),
//!     Arc::new(MockClassifier::with_text("Glass jar\nRecycle with glass.")),
//! ]);
//!
//! let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
//! let result = classifier.classify(&ImageInput::new(jpeg, "image/jpeg")).await?;
//! assert_eq!(result.model_used, "Mock");
//! # Ok(())
//! # }
//! ```

mod fallback;
mod image_data;
mod mock;

pub use fallback::FallbackClassifier;
pub use image_data::{downscale, validate_image_data, DownscaleOptions, ImageFormat};
pub use mock::MockClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for classification operations
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Errors that can occur while talking to a classification backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifyError {
    /// No backend configured at all
    #[error("Classifier not configured: {0}")]
    NotConfigured(String),

    /// Credentials for the backend are missing
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The requested model does not exist; a fallback candidate may succeed
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Invalid or unrecognized image data
    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    /// API key rejected
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Rate limiting or quota exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Transport failure (DNS, connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an unexpected status
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Backend answered with a body we could not interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ClassifyError {
    /// Whether the fallback policy should move on to the next candidate
    pub fn is_model_not_found(&self) -> bool {
        matches!(self, ClassifyError::ModelNotFound(_))
    }
}

/// An uploaded image ready to be sent to a classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// Declared or detected content type, e.g. `image/jpeg`
    pub mime_type: String,
    /// Name of the file as uploaded, if any
    pub filename: Option<String>,
}

impl ImageInput {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            filename: None,
        }
    }

    /// Build an input from bytes alone, taking the content type from the
    /// file signature.
    pub fn sniff(data: Vec<u8>) -> ClassifyResult<Self> {
        let format = validate_image_data(&data)?;
        Ok(Self::new(data, format.mime_type()))
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What a classifier made of an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Free-text description or discrete label
    pub text: String,
    /// Confidence in percent (0-100), when the backend reports one
    pub confidence: Option<f64>,
    /// Identifier of the model that produced the result
    pub model_used: String,
}

/// A backend that can classify an image of waste
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Classify one image.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::ModelNotFound`] when the configured model does
    /// not exist, which lets [`FallbackClassifier`] try the next candidate.
    /// Every other error is final.
    async fn classify(&self, image: &ImageInput) -> ClassifyResult<Classification>;
}

/// A backend that answers free-text questions
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn ask(&self, prompt: &str) -> ClassifyResult<String>;
}
