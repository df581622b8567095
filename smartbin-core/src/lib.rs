//! # smartbin
//!
//! Core library of SmartBin, a waste-sorting assistant: a photo of an item
//! goes to a vision model, and the free-text answer is turned into
//! structured, highlighted disposal and recycling advice.
//!
//! ## Features
//!
//! - **Advice Formatting**: Markdown-ish model output to safe, keyword-highlighted HTML
//! - **Classifier Abstraction**: Pluggable vision backends with model fallback
//! - **Scan History**: Append-only record of every classification, stored as JSON
//! - **Image Handling**: Format sniffing and optional downscaling before upload
//!
//! ## Quick Start
//!
//! ### Formatting advice
//!
//! ```rust
//! use smartbin::advice::format_advice;
//!
//! let html = format_advice("## Glass Jar\n\nTip: remove the lid first.");
//! assert!(html.starts_with("<h4>Glass Jar</h4>"));
//! assert!(html.contains("💡 <strong>Tip</strong>"));
//! ```
//!
//! ### Recording a scan
//!
//! ```rust
//! use smartbin::classify::Classification;
//! use smartbin::history::{ClassificationRecord, HistoryStore, MemoryStore};
//!
//! # fn main() -> smartbin::Result<()> {
//! let store = MemoryStore::new();
//! let classification = Classification {
//!     text: "Aluminium can\nRinse and recycle.".to_string(),
//!     confidence: None,
//!     model_used: "Gemini(gemini-2.5-flash)".to_string(),
//! };
//! store.append(ClassificationRecord::new("can.jpg", &classification))?;
//!
//! let recent = store.list_recent(10)?;
//! assert_eq!(recent[0].summary_label(), "Aluminium can");
//! # Ok(())
//! # }
//! ```

pub mod advice;
pub mod classify;
pub mod error;
pub mod history;

pub use advice::{format_advice, parse_blocks, render_blocks, Block};
pub use classify::{Assistant, Classification, ClassifyError, Classifier, ImageInput};
pub use error::{FormatError, Result, SmartBinError};
pub use history::{ClassificationRecord, HistoryStore, JsonFileStore, MemoryStore};

/// Current version of smartbin
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
