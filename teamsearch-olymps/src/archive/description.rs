//! `oa` description grammar
//!
//! Each archive entry carries a human-readable description of fixed shape:
//!
//! `№<n>. '<olympiad name>' ('<profile>'), <level> уровень. Диплом <result> степени.`
//!
//! The quoted segments may contain backslash-escaped single quotes, so they
//! are collected with an explicit character-scanning state machine (in-string
//! flag, escape flag) rather than a regular expression. Level and result are
//! located independently by their literal anchors with whitespace tolerance.

/// Fields derived from a parseable `oa` description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiplomaDescription {
    pub olymp_name: String,
    pub profile: String,
    pub level: i64,
    /// 0 when the raw degree digit is 1, otherwise 1 (fixed business rule)
    pub result: i64,
}

impl DiplomaDescription {
    /// Parse a description string. Returns `None` when either the two
    /// quoted segments or the level/result digits cannot be located —
    /// callers then keep the entry without derived fields.
    pub fn parse(oa: &str) -> Option<Self> {
        let (olymp_name, profile) = first_two_quoted(oa)?;
        let level = digits_before(oa, "уровень")?;
        let raw_result = digits_between(oa, "Диплом", "степени")?;
        let result = if raw_result == 1 { 0 } else { 1 };
        Some(Self {
            olymp_name,
            profile,
            level,
            result,
        })
    }
}

/// Collect the first two single-quoted segments, honoring backslash escapes.
/// Stops scanning as soon as both are captured.
fn first_two_quoted(s: &str) -> Option<(String, String)> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if in_string {
                current.push(ch);
            }
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '\'' {
            if in_string {
                in_string = false;
                segments.push(std::mem::take(&mut current));
                if segments.len() == 2 {
                    break;
                }
            } else {
                in_string = true;
            }
            continue;
        }
        if in_string {
            current.push(ch);
        }
    }

    let mut it = segments.into_iter();
    match (it.next(), it.next()) {
        (Some(olymp_name), Some(profile)) => Some((olymp_name, profile)),
        _ => None,
    }
}

/// Digits immediately preceding `marker`, ignoring whitespace between them
fn digits_before(s: &str, marker: &str) -> Option<i64> {
    let idx = s.find(marker)?;
    let head = s[..idx].trim_end();
    let digits: Vec<char> = head
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.iter().rev().collect::<String>().parse().ok()
}

/// Digits between the `start` and `end` literals, ignoring surrounding
/// whitespace; anything but digits between the anchors fails the match
fn digits_between(s: &str, start: &str, end: &str) -> Option<i64> {
    let after_start = s.find(start)? + start.len();
    let rest = &s[after_start..];
    let before_end = rest.find(end)?;
    let between = rest[..before_end].trim();
    if between.is_empty() || !between.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    between.parse().ok()
}
