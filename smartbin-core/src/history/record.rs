use crate::classify::Classification;
use crate::error::{Result, SmartBinError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text shown when a record carries neither free text nor a label
pub const NO_TEXT_RETURNED: &str = "No text returned";

/// The persisted result of one classify request.
///
/// Field names serialize in camelCase so existing `db.json` files keep
/// loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub original_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Free-text answer from a vision-language model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_text: Option<String>,
    /// Discrete label from a plain image classifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Confidence in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub used_model: String,
}

impl ClassificationRecord {
    /// Build a fresh record for a classification of `original_name`
    pub fn new(original_name: impl Into<String>, classification: &Classification) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            original_name: original_name.into(),
            filename: None,
            label_text: Some(classification.text.clone()),
            label: None,
            confidence: classification.confidence,
            used_model: classification.model_used.clone(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// The text to feed the advice formatter
    pub fn advice_text(&self) -> &str {
        self.label_text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.label.as_deref())
            .unwrap_or(NO_TEXT_RETURNED)
    }

    /// One-line label for history listings
    pub fn summary_label(&self) -> &str {
        if let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) {
            return label;
        }
        if let Some(first) = self
            .label_text
            .as_deref()
            .and_then(|t| t.lines().map(str::trim).find(|l| !l.is_empty()))
        {
            return first;
        }
        if !self.original_name.is_empty() {
            return &self.original_name;
        }
        self.filename.as_deref().unwrap_or("scan")
    }

    /// Reject records that would corrupt the history file
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SmartBinError::InvalidRecord("empty id".to_string()));
        }
        if let Some(confidence) = self.confidence {
            if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
                return Err(SmartBinError::InvalidRecord(format!(
                    "confidence {confidence} outside 0-100"
                )));
            }
        }
        Ok(())
    }
}
