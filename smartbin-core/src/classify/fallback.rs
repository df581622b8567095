use super::{Classification, ClassifyError, ClassifyResult, Classifier, ImageInput};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, warn};

/// Tries candidate classifiers in order.
///
/// Moves to the next candidate only when the current one reports
/// [`ClassifyError::ModelNotFound`]. Any other failure stops the search and
/// is returned as is. When every candidate is missing, the last
/// not-found error is returned.
pub struct FallbackClassifier {
    name: String,
    candidates: Vec<Arc<dyn Classifier>>,
}

impl FallbackClassifier {
    pub fn new(candidates: Vec<Arc<dyn Classifier>>) -> Self {
        let names: Vec<&str> = candidates.iter().map(|c| c.name()).collect();
        let name = format!("fallback({})", names.join(","));
        Self { name, candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[async_trait]
impl Classifier for FallbackClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, image: &ImageInput) -> ClassifyResult<Classification> {
        let mut last_not_found = None;

        for candidate in &self.candidates {
            match candidate.classify(image).await {
                Ok(classification) => return Ok(classification),
                Err(e) if e.is_model_not_found() => {
                    warn!(candidate = candidate.name(), error = %e, "model not found, trying next candidate");
                    last_not_found = Some(e);
                }
                Err(e) => {
                    error!(candidate = candidate.name(), error = %e, "classification failed");
                    return Err(e);
                }
            }
        }

        Err(last_not_found.unwrap_or_else(|| {
            ClassifyError::NotConfigured("no classifier candidates configured".to_string())
        }))
    }
}
