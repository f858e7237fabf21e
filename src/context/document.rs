//! Sentinel-delimited region of the context document
//!
//! Only the text between the first start marker and the first end marker
//! after it belongs to the updater. Everything else passes through as-is.

use regex::Regex;
use std::sync::OnceLock;

use super::SectionData;

pub const DYNAMIC_START: &str = "<!-- DYNAMIC_CONTENT_START -->";
pub const DYNAMIC_END: &str = "<!-- DYNAMIC_CONTENT_END -->";
const AUTO_NOTE: &str = "<!-- This content is automatically updated -->";

fn generated_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<!-- Generated: [^\n]*? -->").expect("valid regex"))
}

/// Byte span of the region: start of the start marker to the end of the end
/// marker. An unterminated region runs to the end of the document.
fn region_span(document: &str) -> Option<(usize, usize)> {
    let start = document.find(DYNAMIC_START)?;
    let body = start + DYNAMIC_START.len();
    let end = document[body..]
        .find(DYNAMIC_END)
        .map(|offset| body + offset + DYNAMIC_END.len())
        .unwrap_or(document.len());
    Some((start, end))
}

/// Replace the dynamic region with `sections`, appending the marker pair
/// first when the document has none.
pub fn splice(document: &str, sections: &[SectionData], generated_at: &str) -> String {
    let mut text = document.to_string();
    if !text.contains(DYNAMIC_START) {
        text.push_str(&format!("\n\n{}\n{}\n", DYNAMIC_START, DYNAMIC_END));
    }
    let (start, end) = region_span(&text).unwrap_or((text.len(), text.len()));

    let mut lines = vec![
        DYNAMIC_START.to_string(),
        format!("<!-- Generated: {} -->", generated_at),
        AUTO_NOTE.to_string(),
        String::new(),
    ];
    for section in sections {
        lines.push(section.content.clone());
        lines.push(String::new());
    }
    lines.push(DYNAMIC_END.to_string());

    format!("{}{}{}", &text[..start], lines.join("\n"), &text[end..])
}

/// Compare two documents, disregarding the generation stamp inside the region.
pub fn same_content(a: &str, b: &str) -> bool {
    a == b || strip_generated(a) == strip_generated(b)
}

fn strip_generated(document: &str) -> String {
    match region_span(document) {
        Some((start, end)) => {
            let region = generated_line().replace(&document[start..end], "<!-- Generated -->");
            format!("{}{}{}", &document[..start], region, &document[end..])
        }
        None => document.to_string(),
    }
}
