//! Lossy HTML to plain text reduction
//!
//! Not an HTML parser. Unbalanced or malformed markup yields imperfect text,
//! never an error.

use regex::Regex;
use std::sync::OnceLock;

fn script_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script.*?>.*?</script>").expect("valid script regex"))
}

fn style_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style.*?>.*?</style>").expect("valid style regex"))
}

fn line_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<br\s*/?>").expect("valid br regex"))
}

fn paragraph_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)</p>").expect("valid paragraph regex"))
}

fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"))
}

fn trailing_space() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+\n").expect("valid whitespace regex"))
}

fn blank_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid newline regex"))
}

/// Reduce an HTML body to readable plain text
///
/// Drops `<script>`/`<style>` blocks, turns `<br>` into a newline and `</p>`
/// into a blank line, strips every other tag, removes trailing blanks on each
/// line, collapses runs of three or more newlines to two and trims the result.
pub fn html_to_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let text = script_block().replace_all(html, "");
    let text = style_block().replace_all(&text, "");
    let text = line_break().replace_all(&text, "\n");
    let text = paragraph_end().replace_all(&text, "\n\n");
    let text = any_tag().replace_all(&text, "");
    let text = trailing_space().replace_all(&text, "\n");
    let text = blank_run().replace_all(&text, "\n\n");
    text.trim().to_string()
}
