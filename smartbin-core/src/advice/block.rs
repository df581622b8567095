//! Line-oriented block parser for advice text
//!
//! Classifier output is loosely structured prose: markdown-ish headings,
//! "How to recycle:" labels, numbered steps and plain paragraphs. This module
//! turns it into an ordered list of [`Block`]s in a single forward pass with
//! no backtracking. A line that could match several rules is resolved by the
//! fixed precedence heading > section title > list > paragraph.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^#{1,6}\s+(.*)").expect("valid heading pattern");
    static ref HEADING_PREFIX: Regex = Regex::new(r"^#{1,6}\s+").expect("valid heading pattern");
    static ref SECTION_TITLE: Regex =
        Regex::new(r"^[A-Za-z0-9 \-]{1,80}:$").expect("valid section title pattern");
    static ref LIST_ITEM: Regex =
        Regex::new(r"^([0-9]+[.)]|-|\*|•)\s+(.*)").expect("valid list item pattern");
    static ref LIST_PREFIX: Regex =
        Regex::new(r"^([0-9]+[.)]|-|\*|•)\s+").expect("valid list item pattern");
    static ref ORDERED_MARKER: Regex = Regex::new(r"^[0-9]+[.)]").expect("valid marker pattern");
    static ref EXCESS_BLANK_LINES: Regex = Regex::new(r"\n{3,}").expect("valid blank line pattern");
}

/// One structurally classified unit of advice text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    /// Markdown heading line (`# ...` through `###### ...`)
    Heading { text: String },
    /// Short label ending in a colon, stored without the colon
    SectionTitle { text: String },
    /// Run of bullet or numbered lines
    List { ordered: bool, items: Vec<String> },
    /// Any other run of non-blank lines, joined with single spaces
    Para { text: String },
}

impl Block {
    /// Name of the block kind as it appears in serialized output
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::SectionTitle { .. } => "sectionTitle",
            Block::List { .. } => "list",
            Block::Para { .. } => "para",
        }
    }
}

/// Normalize line endings, collapse runs of blank lines and trim.
///
/// Three or more consecutive newlines become exactly one blank line.
pub fn normalize(text: &str) -> String {
    let unix = text.replace("\r\n", "\n");
    EXCESS_BLANK_LINES
        .replace_all(&unix, "\n\n")
        .trim()
        .to_string()
}

fn is_list_line(line: &str) -> bool {
    LIST_PREFIX.is_match(line)
}

fn is_section_title(line: &str) -> bool {
    SECTION_TITLE.is_match(line)
}

fn is_heading(line: &str) -> bool {
    HEADING_PREFIX.is_match(line)
}

/// Lines that end a paragraph or a list item's continuation
fn is_structural(line: &str) -> bool {
    is_list_line(line) || is_section_title(line) || is_heading(line)
}

/// Parse raw advice text into blocks.
///
/// The input is normalized first (see [`normalize`]), so callers may pass
/// text straight from the classifier. Empty or whitespace-only input yields
/// an empty vector.
pub fn parse_blocks(raw: &str) -> Vec<Block> {
    let text = normalize(raw);
    if text.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = text.split('\n').map(str::trim).collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.is_empty() {
            i += 1;
            continue;
        }

        if let Some(caps) = HEADING.captures(line) {
            blocks.push(Block::Heading {
                text: caps[1].trim().to_string(),
            });
            i += 1;
            continue;
        }

        if is_section_title(line) {
            blocks.push(Block::SectionTitle {
                text: line.trim_end_matches(':').trim().to_string(),
            });
            i += 1;
            continue;
        }

        if let Some(first) = LIST_ITEM.captures(line) {
            let ordered = ORDERED_MARKER.is_match(&first[1]);
            let (items, next) = parse_list_items(&lines, i);
            blocks.push(Block::List { ordered, items });
            i = next;
            continue;
        }

        let mut para = line.to_string();
        let mut j = i + 1;
        while j < lines.len() {
            let next = lines[j];
            if next.is_empty() || is_structural(next) {
                break;
            }
            para.push(' ');
            para.push_str(next);
            j += 1;
        }
        blocks.push(Block::Para {
            text: para.trim().to_string(),
        });
        i = j;
    }

    tracing::debug!(blocks = blocks.len(), "parsed advice blocks");
    blocks
}

/// Consume sibling list lines starting at `start`.
///
/// Returns the items and the index of the first unconsumed line. A blank
/// line ending an item's continuation is consumed with that item.
fn parse_list_items(lines: &[&str], start: usize) -> (Vec<String>, usize) {
    let mut items = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let Some(caps) = LIST_ITEM.captures(lines[i]) else {
            break;
        };
        let mut item = caps[2].trim().to_string();

        let mut j = i + 1;
        while j < lines.len() {
            let next = lines[j];
            if next.is_empty() {
                j += 1;
                break;
            }
            if is_structural(next) {
                break;
            }
            item.push(' ');
            item.push_str(next);
            j += 1;
        }

        items.push(item.trim().to_string());
        i = j;
    }

    (items, i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn para(text: &str) -> Block {
        Block::Para {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_empty_input_yields_no_blocks() {
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("   \n\t\n  ").is_empty());
    }

    #[test]
    fn test_markdown_heading() {
        assert_eq!(
            parse_blocks("## Recycling Tips"),
            vec![Block::Heading {
                text: "Recycling Tips".to_string()
            }]
        );
    }

    #[test]
    fn test_seven_hashes_is_not_a_heading() {
        let blocks = parse_blocks("####### Too deep");
        assert_eq!(blocks, vec![para("####### Too deep")]);
    }

    #[test]
    fn test_section_title_strips_colon() {
        assert_eq!(
            parse_blocks("Disposal:"),
            vec![Block::SectionTitle {
                text: "Disposal".to_string()
            }]
        );
    }

    #[test]
    fn test_section_title_rejects_punctuation() {
        // Apostrophes are outside the allowed label alphabet
        let blocks = parse_blocks("What's this:");
        assert_eq!(blocks, vec![para("What's this:")]);
    }

    #[test]
    fn test_ordered_list_two_items() {
        let blocks = parse_blocks("1. Rinse the bottle\n2. Remove the cap");
        assert_eq!(
            blocks,
            vec![Block::List {
                ordered: true,
                items: vec!["Rinse the bottle".to_string(), "Remove the cap".to_string()],
            }]
        );
    }

    #[test]
    fn test_parenthesis_marker_is_ordered() {
        let blocks = parse_blocks("1) Rinse\n2) Dry");
        assert!(matches!(&blocks[0], Block::List { ordered: true, items } if items.len() == 2));
    }

    #[test]
    fn test_unordered_markers() {
        let blocks = parse_blocks("- Glass\n* Paper\n• Cans");
        assert_eq!(
            blocks,
            vec![Block::List {
                ordered: false,
                items: vec!["Glass".to_string(), "Paper".to_string(), "Cans".to_string()],
            }]
        );
    }

    #[test]
    fn test_first_marker_decides_ordering() {
        let blocks = parse_blocks("- Glass\n2. Paper");
        assert_eq!(
            blocks,
            vec![Block::List {
                ordered: false,
                items: vec!["Glass".to_string(), "Paper".to_string()],
            }]
        );
    }

    #[test]
    fn test_list_item_continuation() {
        let blocks = parse_blocks("- Recycle it\n  carefully");
        assert_eq!(
            blocks,
            vec![Block::List {
                ordered: false,
                items: vec!["Recycle it carefully".to_string()],
            }]
        );
    }

    #[test]
    fn test_continuation_stops_at_section_title_and_heading() {
        let blocks = parse_blocks("- Rinse\nHow to dispose:\n# Notes");
        assert_eq!(
            blocks,
            vec![
                Block::List {
                    ordered: false,
                    items: vec!["Rinse".to_string()],
                },
                Block::SectionTitle {
                    text: "How to dispose".to_string()
                },
                Block::Heading {
                    text: "Notes".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_blank_line_between_items_keeps_one_list() {
        let blocks = parse_blocks("1. Rinse\n\n2. Crush");
        assert_eq!(
            blocks,
            vec![Block::List {
                ordered: true,
                items: vec!["Rinse".to_string(), "Crush".to_string()],
            }]
        );
    }

    #[test]
    fn test_list_ends_at_plain_line_after_blank() {
        let blocks = parse_blocks("- Rinse\n\nThat is all.");
        assert_eq!(
            blocks,
            vec![
                Block::List {
                    ordered: false,
                    items: vec!["Rinse".to_string()],
                },
                para("That is all."),
            ]
        );
    }

    #[test]
    fn test_paragraph_joins_lines() {
        let blocks = parse_blocks("This is a plastic bottle\nmade of PET.");
        assert_eq!(blocks, vec![para("This is a plastic bottle made of PET.")]);
    }

    #[test]
    fn test_paragraph_stops_at_list() {
        let blocks = parse_blocks("Steps follow\n1. Rinse");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], para("Steps follow"));
        assert_eq!(blocks[1].kind(), "list");
    }

    #[test]
    fn test_heading_beats_section_title() {
        let blocks = parse_blocks("# Disposal:");
        assert_eq!(
            blocks,
            vec![Block::Heading {
                text: "Disposal:".to_string()
            }]
        );
    }

    #[test]
    fn test_section_title_beats_list() {
        // "- Tips:" is a valid label: dash and letters, ending in a colon
        let blocks = parse_blocks("- Tips:");
        assert_eq!(
            blocks,
            vec![Block::SectionTitle {
                text: "- Tips".to_string()
            }]
        );
    }

    #[test]
    fn test_blank_line_collapse() {
        let collapsed = parse_blocks("A\n\n\n\nB");
        let plain = parse_blocks("A\n\nB");
        assert_eq!(collapsed, plain);
        assert_eq!(collapsed, vec![para("A"), para("B")]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  a\r\nb\r\n\r\n\r\n\r\nc  "), "a\nb\n\nc");
        assert_eq!(normalize("\n\n\n"), "");
    }

    #[test]
    fn test_block_serialization_uses_type_tag() {
        let json = serde_json::to_value(Block::SectionTitle {
            text: "Tips".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "sectionTitle");
        assert_eq!(json["text"], "Tips");
    }
}
