//! Advice formatting
//!
//! Converts the free text returned by a classifier into display-ready HTML:
//!
//! ```text
//! raw text -> normalize -> parse_blocks -> render_blocks (escape + highlight) -> HTML
//! ```
//!
//! # Example
//!
//! ```rust
//! use smartbin::advice::format_advice;
//!
//! let html = format_advice("How to recycle:\n1. Rinse the bottle\n2. Remove the cap");
//! assert!(html.starts_with("<div class=\"section\">♻️"));
//! assert!(html.contains("<ol><li>Rinse the bottle</li><li>Remove the cap</li></ol>"));
//!
//! assert_eq!(format_advice(None), "<p>No advice provided.</p>");
//! ```
//!
//! [`format_advice`] never fails: any problem in the pipeline degrades to the
//! escaped raw text wrapped in a single paragraph, so a rendering glitch can
//! not take the advice panel down with it.

mod block;
mod highlight;
mod render;

pub use block::{normalize, parse_blocks, Block};
pub use highlight::{
    apply_emphasis, escape_html, highlight_keywords, KeywordRule, DISPOSAL_SYMBOL, KEYWORD_RULES,
    RECYCLE_SYMBOL, STEP_SYMBOL, TIP_SYMBOL, WARNING_SYMBOL,
};
pub use render::{looks_like_title, render_blocks, section_symbol, NO_ADVICE_GIVEN};

use crate::error::FormatError;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Rendered when there is no advice text at all
pub const NO_ADVICE_PROVIDED: &str = "<p>No advice provided.</p>";

/// Largest advice text the structured pipeline accepts
pub const MAX_ADVICE_BYTES: usize = 256 * 1024;

/// Format advice text as HTML, never failing.
///
/// Accepts `&str` or `Option<&str>`. Missing or empty text renders
/// [`NO_ADVICE_PROVIDED`]; anything the structured pipeline rejects is
/// rendered as one escaped paragraph.
pub fn format_advice<'a>(text: impl Into<Option<&'a str>>) -> String {
    let text = match text.into() {
        Some(text) if !text.is_empty() => text,
        _ => return NO_ADVICE_PROVIDED.to_string(),
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| try_format_advice(text)))
        .unwrap_or_else(|payload| Err(FormatError::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, bytes = text.len(), "advice formatting failed, rendering plain text");
            plain_paragraph(text)
        }
    }
}

/// The structured formatting pipeline, surfacing its failures
pub fn try_format_advice(text: &str) -> Result<String, FormatError> {
    if text.len() > MAX_ADVICE_BYTES {
        return Err(FormatError::TooLarge(text.len()));
    }
    let blocks = parse_blocks(text);
    Ok(render_blocks(&blocks))
}

/// Minimal rendering used when the structured pipeline fails
pub fn plain_paragraph(text: &str) -> String {
    format!("<p>{}</p>", escape_html(text))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_and_empty_share_placeholder() {
        let none = format_advice(None);
        let empty = format_advice("");
        let empty_some = format_advice(Some(""));
        assert_eq!(none, NO_ADVICE_PROVIDED);
        assert_eq!(empty, none);
        assert_eq!(empty_some, none);
    }

    #[test]
    fn test_whitespace_only_renders_no_advice_given() {
        assert_eq!(format_advice("  \n\n  "), NO_ADVICE_GIVEN);
    }

    #[test]
    fn test_oversize_text_falls_back_to_plain_paragraph() {
        let text = format!("# Title\n{}<b>", "a".repeat(MAX_ADVICE_BYTES));
        assert_eq!(
            try_format_advice(&text),
            Err(FormatError::TooLarge(text.len()))
        );

        let html = format_advice(text.as_str());
        assert!(html.starts_with("<p># Title\n"));
        assert!(html.ends_with("&lt;b&gt;</p>"));
    }

    #[test]
    fn test_full_document() {
        let raw = "## Plastic Bottle\r\n\r\nThis is a PET bottle.\r\n\r\n\r\n\r\nHow to recycle:\r\n1. Rinse it\r\n2. Remove the cap\r\n\r\nWarning: do not burn.";
        let html = format_advice(raw);
        assert_eq!(
            html,
            concat!(
                "<h4>Plastic Bottle</h4>",
                "<p>This is a PET bottle.</p>",
                "<div class=\"section\">♻️ <strong>➡️ <strong>How to</strong> ♻️ <strong>recycle</strong></strong></div>",
                "<ol><li>Rinse it</li><li>Remove the cap</li></ol>",
                "<p>⚠️ <strong>Warning</strong>: do not burn.</p>",
            )
        );
    }

    #[test]
    fn test_format_is_deterministic() {
        let raw = "Tips:\n- Rinse **well**\n- Check _local_ rules";
        assert_eq!(format_advice(raw), format_advice(raw));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
