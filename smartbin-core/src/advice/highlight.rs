//! HTML escaping and keyword decoration
//!
//! Everything in here operates on text that is already escaped, so the only
//! markup in the output is the `<strong>`/`<em>` tags inserted on purpose.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Symbol for disposal and trash terms
pub const DISPOSAL_SYMBOL: &str = "🗑️";
/// Symbol for recycling terms
pub const RECYCLE_SYMBOL: &str = "♻️";
/// Symbol for procedural terms
pub const STEP_SYMBOL: &str = "➡️";
/// Symbol for hazard terms
pub const WARNING_SYMBOL: &str = "⚠️";
/// Symbol for tips and suggestions
pub const TIP_SYMBOL: &str = "💡";

/// A case-insensitive whole-word pattern paired with a decorative symbol.
///
/// Word boundaries are ASCII-only, so `étip` still matches `tip`.
#[derive(Debug)]
pub struct KeywordRule {
    name: &'static str,
    pattern: Regex,
    symbol: &'static str,
}

impl KeywordRule {
    fn new(name: &'static str, words: &str, symbol: &'static str) -> Self {
        let pattern = Regex::new(&format!(r"(?i)(?-u:\b)(?:{words})(?-u:\b)"))
            .expect("valid keyword pattern");
        Self {
            name,
            pattern,
            symbol,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Rewrite every match as `symbol <strong>match</strong>`, keeping the
    /// original casing of the matched text.
    pub fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures| {
                format!("{} <strong>{}</strong>", self.symbol, &caps[0])
            })
            .into_owned()
    }
}

lazy_static! {
    /// Keyword rules in application order
    pub static ref KEYWORD_RULES: Vec<KeywordRule> = vec![
        KeywordRule::new("disposal", "dispose|disposal|throw away|trash", DISPOSAL_SYMBOL),
        KeywordRule::new("recycle", "recycle|recycling|recyclable", RECYCLE_SYMBOL),
        KeywordRule::new("step", "step|steps|how to|procedure", STEP_SYMBOL),
        KeywordRule::new("warning", "warn|warning|danger|hazard", WARNING_SYMBOL),
        KeywordRule::new("tip", "tip|tips|suggestion", TIP_SYMBOL),
    ];
    static ref BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*").expect("valid bold pattern");
    static ref ITALIC: Regex = Regex::new(r"_(.+?)_").expect("valid italic pattern");
}

/// Escape text for embedding in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Markdown-lite emphasis: `**bold**` then `_italic_`, one pass each
pub fn apply_emphasis(escaped: &str) -> String {
    let bold = BOLD.replace_all(escaped, "<strong>${1}</strong>");
    ITALIC.replace_all(&bold, "<em>${1}</em>").into_owned()
}

/// Apply emphasis and keyword decoration to already escaped text.
///
/// Rules run in [`KEYWORD_RULES`] order, each over the output of the
/// previous one. Feeding the result back in decorates the same words again,
/// so the transform is not idempotent.
pub fn highlight_keywords(escaped: &str) -> String {
    KEYWORD_RULES
        .iter()
        .fold(apply_emphasis(escaped), |text, rule| rule.apply(&text))
}
