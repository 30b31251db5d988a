//! Quasi-JSON extractor for the archive's `codes.js` payload
//!
//! The archive body is a JS assignment, not valid JSON:
//!
//! `diplomaCodes = [ {oa: '...', name: '...', form: 11, hashed: '...'}, ];`
//!
//! A hand-rolled scanner handles it: strip the assignment wrapper, walk each
//! top-level `{...}` body, and pull out the recognized fields. Single-quoted
//! values are captured with escape awareness (one level of backslash escapes
//! is removed), bare integers are parsed, unknown keys are skipped, and a
//! trailing comma before the closing bracket is tolerated.
//!
//! Precondition: objects are non-nested. Braces inside field values are not
//! part of this grammar and would terminate the enclosing object early.

use crate::models::RawCodeEntry;

const ASSIGNMENT_TOKEN: &str = "diplomaCodes";

/// Parse a `codes.js` body into entries, one per recognized object, in
/// source order. Unrecognizable input yields an empty vector, never an error.
pub fn parse_diploma_codes(body: &str) -> Vec<RawCodeEntry> {
    let src = strip_assignment(body);
    let chars: Vec<char> = src.chars().collect();

    let mut entries = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '{' {
            i += 1;
            continue;
        }
        // top-level object body: everything up to the next close brace
        let start = i + 1;
        let mut end = start;
        while end < chars.len() && chars[end] != '}' {
            end += 1;
        }
        if end >= chars.len() {
            // unterminated object, ignore the remainder
            break;
        }
        entries.push(parse_object(&chars[start..end]));
        i = end + 1;
    }
    entries
}

/// Remove the leading `diplomaCodes =` token and the trailing semicolon
fn strip_assignment(body: &str) -> &str {
    let mut src = body.trim();
    if let Some(rest) = src.strip_prefix(ASSIGNMENT_TOKEN) {
        src = rest.trim_start();
        if let Some(rest) = src.strip_prefix('=') {
            src = rest.trim_start();
        }
    }
    src.trim_end().trim_end_matches(';').trim_end()
}

/// Extract the recognized fields from one object body
fn parse_object(chars: &[char]) -> RawCodeEntry {
    let mut entry = RawCodeEntry::default();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() || chars[i] == ',' {
            i += 1;
            continue;
        }

        // key: identifier characters up to the colon
        let key_start = i;
        while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        if i == key_start {
            // stray character, resynchronize
            i += 1;
            continue;
        }
        let key: String = chars[key_start..i].iter().collect();

        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() || chars[i] != ':' {
            continue;
        }
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        if chars[i] == '\'' {
            let (value, next) = scan_quoted(chars, i);
            match key.as_str() {
                "oa" => entry.oa = Some(value),
                "name" => entry.name = Some(value),
                "hashed" => entry.hashed = Some(value),
                _ => {}
            }
            i = next;
        } else {
            // bare value: runs to the next comma or end of block
            let value_start = i;
            while i < chars.len() && chars[i] != ',' {
                i += 1;
            }
            if key == "form" {
                let raw: String = chars[value_start..i].iter().collect();
                entry.form = raw.trim().parse().ok();
            }
        }
    }
    entry
}

/// Capture a single-quoted value starting at the opening quote, removing one
/// level of backslash escapes. Returns the value and the index just past the
/// closing quote; an unterminated value runs to the end of the block.
fn scan_quoted(chars: &[char], open: usize) -> (String, usize) {
    let mut value = String::new();
    let mut escaped = false;
    let mut i = open + 1;
    while i < chars.len() {
        let ch = chars[i];
        if escaped {
            value.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '\'' {
            return (value, i + 1);
        } else {
            value.push(ch);
        }
        i += 1;
    }
    (value, i)
}
