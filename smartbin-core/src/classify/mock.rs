use super::{
    validate_image_data, Assistant, Classification, ClassifyError, ClassifyResult, Classifier,
    ImageInput,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock classifier for testing and development
///
/// Returns canned text without contacting any service. It can be scripted
/// to fail with a fixed error, and it counts how often it was called so
/// fallback behaviour can be asserted.
#[derive(Debug)]
pub struct MockClassifier {
    name: String,
    text: String,
    confidence: Option<f64>,
    failure: Option<ClassifyError>,
    calls: AtomicUsize,
}

impl MockClassifier {
    /// Create a mock returning a generic plastic-bottle answer
    pub fn new() -> Self {
        Self::with_text(
            "## Plastic Bottle\n\nHow to recycle:\n1. Rinse the bottle\n2. Remove the cap",
        )
    }

    /// Create a mock returning the given text
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            name: "Mock".to_string(),
            text: text.into(),
            confidence: None,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always fails with `error`
    pub fn failing(error: ClassifyError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    /// Create a mock that reports its model as missing
    pub fn model_not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            name: model.clone(),
            ..Self::failing(ClassifyError::ModelNotFound(model))
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 100.0));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of classify or ask calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> ClassifyResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, image: &ImageInput) -> ClassifyResult<Classification> {
        self.record_call()?;
        validate_image_data(&image.data)?;

        Ok(Classification {
            text: self.text.clone(),
            confidence: self.confidence,
            model_used: self.name.clone(),
        })
    }
}

#[async_trait]
impl Assistant for MockClassifier {
    async fn ask(&self, prompt: &str) -> ClassifyResult<String> {
        self.record_call()?;
        Ok(format!("{}\n\n(asked: {prompt})", self.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg() -> ImageInput {
        ImageInput::new(
            vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46],
            "image/jpeg",
        )
    }

    #[tokio::test]
    async fn test_mock_returns_canned_text() {
        let mock = MockClassifier::with_text("Glass jar").with_confidence(91.0);
        let result = mock.classify(&jpeg()).await.unwrap();
        assert_eq!(result.text, "Glass jar");
        assert_eq!(result.confidence, Some(91.0));
        assert_eq!(result.model_used, "Mock");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_rejects_non_image() {
        let mock = MockClassifier::new();
        let err = mock
            .classify(&ImageInput::new(b"not an image".to_vec(), "image/jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidImageData(_)));
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockClassifier::failing(ClassifyError::Network("offline".to_string()));
        let err = mock.classify(&jpeg()).await.unwrap_err();
        assert_eq!(err, ClassifyError::Network("offline".to_string()));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_not_found_mock_uses_model_name() {
        let mock = MockClassifier::model_not_found("gemini-0");
        assert_eq!(mock.name(), "gemini-0");
        assert!(mock.classify(&jpeg()).await.unwrap_err().is_model_not_found());
    }

    #[tokio::test]
    async fn test_ask_echoes_prompt() {
        let mock = MockClassifier::with_text("Answer");
        let answer = mock.ask("Is foil recyclable?").await.unwrap();
        assert!(answer.starts_with("Answer"));
        assert!(answer.contains("Is foil recyclable?"));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mock = MockClassifier::new().with_confidence(140.0);
        assert_eq!(mock.confidence, Some(100.0));
    }
}
