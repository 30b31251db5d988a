//! Identity normalization and pseudonymous person keys
//!
//! The diploma archive publishes records under a per-person directory named
//! by a SHA-256 digest of the normalized full name and ISO birthdate. This
//! module canonicalizes the raw inputs and derives that key. The hash is a
//! pure function of its inputs and is never reversed.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Identity derivation errors
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Birthdate string is not in `dd-mm-yyyy` shape
    #[error("birthdate must be in dd-mm-yyyy format, got: {0:?}")]
    InvalidBirthdateFormat(String),

    /// Shape is right but the calendar date does not exist
    #[error("invalid calendar date: {0:?}")]
    InvalidDate(String),
}

/// Normalize a full name: collapse internal whitespace, lowercase, then
/// uppercase the first character of every token. Token boundaries are the
/// start of the string, a space, and a hyphen (double surnames).
pub fn normalize_fio(fio: &str) -> String {
    let collapsed = fio.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut at_boundary = true;
    for ch in lowered.chars() {
        if at_boundary {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_boundary = ch == ' ' || ch == '-';
    }
    out
}

/// Validate a `dd-mm-yyyy` birthdate and parse it to a calendar date.
///
/// The shape check is exact: two digits, hyphen, two digits, hyphen, four
/// digits. Strings with the right shape but an impossible calendar value
/// (day 31 in February) fail with `InvalidDate`.
pub fn validate_birthdate(date_str: &str) -> Result<NaiveDate, IdentityError> {
    let bytes = date_str.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(IdentityError::InvalidBirthdateFormat(date_str.to_string()));
    }

    NaiveDate::parse_from_str(date_str, "%d-%m-%Y")
        .map_err(|_| IdentityError::InvalidDate(date_str.to_string()))
}

/// Archive lookup key: SHA-256 hex digest of `"{normalized name} {iso date}"`
pub fn person_hash(fio: &str, iso_birthdate: &str) -> String {
    let namestring = format!("{} {}", normalize_fio(fio), iso_birthdate);
    format!("{:x}", Sha256::digest(namestring.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_normalize_collapses_and_capitalizes() {
        assert_eq!(normalize_fio("иван  иВаноВ"), "Иван Иванов");
        assert_eq!(normalize_fio("  петров-водкин пётр  "), "Петров-Водкин Пётр");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_fio("сидорова  анна-мария  ивановна");
        assert_eq!(normalize_fio(&once), once);
    }

    #[test]
    fn test_validate_birthdate_ok() {
        let date = validate_birthdate("01-12-2000").unwrap();
        assert_eq!(date.year(), 2000);
        assert_eq!(date.month(), 12);
        assert_eq!(date.day(), 1);
    }

    #[test]
    fn test_validate_birthdate_rejects_wrong_shape() {
        assert!(matches!(
            validate_birthdate("2000-12-01"),
            Err(IdentityError::InvalidBirthdateFormat(_))
        ));
        assert!(matches!(
            validate_birthdate("1-12-2000"),
            Err(IdentityError::InvalidBirthdateFormat(_))
        ));
        assert!(matches!(
            validate_birthdate("01.12.2000"),
            Err(IdentityError::InvalidBirthdateFormat(_))
        ));
        assert!(matches!(
            validate_birthdate(""),
            Err(IdentityError::InvalidBirthdateFormat(_))
        ));
    }

    #[test]
    fn test_validate_birthdate_rejects_impossible_date() {
        assert!(matches!(
            validate_birthdate("31-02-2005"),
            Err(IdentityError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_person_hash_is_deterministic() {
        let a = person_hash("Иванов Иван", "2000-12-01");
        let b = person_hash("иванов  иван", "2000-12-01");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_person_hash_differs_for_different_inputs() {
        let a = person_hash("Иванов Иван", "2000-12-01");
        let b = person_hash("Иванов Иван", "2000-12-02");
        let c = person_hash("Иванов Пётр", "2000-12-01");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
