//! Block to HTML rendering

use super::block::Block;
use super::highlight::{
    escape_html, highlight_keywords, DISPOSAL_SYMBOL, RECYCLE_SYMBOL, TIP_SYMBOL,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write;

/// Rendered when parsing produced no blocks at all
pub const NO_ADVICE_GIVEN: &str = "<p>No advice given.</p>";

/// Paragraphs shorter than this may be promoted to headings
const TITLE_MAX_CHARS: usize = 70;

lazy_static! {
    static ref SECTION_RECYCLE: Regex =
        Regex::new(r"(?i)(?-u:\b)(?:recycle|recycling|recyclable)(?-u:\b)")
            .expect("valid pattern");
    static ref SECTION_DISPOSAL: Regex =
        Regex::new(r"(?i)(?-u:\b)(?:dispose|disposal|trash)(?-u:\b)").expect("valid pattern");
    static ref SECTION_TIP: Regex =
        Regex::new(r"(?i)(?-u:\b)(?:tip|tips)(?-u:\b)").expect("valid pattern");
    static ref TITLE_LIKE: Regex = Regex::new(r"^[A-Z][A-Za-z0-9 ,\-]{0,60}$").expect("valid pattern");
}

/// Pick the decorative prefix for a section title from its raw text.
///
/// Recycling wins over disposal, disposal over tips. At most one symbol.
pub fn section_symbol(raw_title: &str) -> Option<&'static str> {
    if SECTION_RECYCLE.is_match(raw_title) {
        Some(RECYCLE_SYMBOL)
    } else if SECTION_DISPOSAL.is_match(raw_title) {
        Some(DISPOSAL_SYMBOL)
    } else if SECTION_TIP.is_match(raw_title) {
        Some(TIP_SYMBOL)
    } else {
        None
    }
}

/// Short, capitalized fragments without a trailing period read as titles
pub fn looks_like_title(text: &str) -> bool {
    text.chars().count() < TITLE_MAX_CHARS && TITLE_LIKE.is_match(text) && !text.ends_with('.')
}

fn decorate(text: &str) -> String {
    highlight_keywords(&escape_html(text))
}

/// Render blocks into one HTML string
pub fn render_blocks(blocks: &[Block]) -> String {
    if blocks.is_empty() {
        return NO_ADVICE_GIVEN.to_string();
    }

    let mut html = String::new();
    for block in blocks {
        // Writing into a String cannot fail
        let _ = match block {
            Block::Heading { text } => write!(html, "<h4>{}</h4>", decorate(text)),
            Block::SectionTitle { text } => match section_symbol(text) {
                Some(symbol) => write!(
                    html,
                    "<div class=\"section\">{} <strong>{}</strong></div>",
                    symbol,
                    decorate(text)
                ),
                None => write!(
                    html,
                    "<div class=\"section\"><strong>{}</strong></div>",
                    decorate(text)
                ),
            },
            Block::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                html.push('<');
                html.push_str(tag);
                html.push('>');
                for item in items {
                    html.push_str("<li>");
                    html.push_str(&decorate(item));
                    html.push_str("</li>");
                }
                write!(html, "</{tag}>")
            }
            Block::Para { text } if looks_like_title(text) => {
                write!(html, "<h4>{}</h4>", decorate(text))
            }
            Block::Para { text } => write!(html, "<p>{}</p>", decorate(text)),
        };
    }
    html
}
