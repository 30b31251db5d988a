//! Wire and domain types for the olympiad ingest pipeline

use serde::{Deserialize, Serialize};

/// Inbound person-lookup request consumed from the `olymps` queue.
///
/// All fields tolerate absence on the wire; required-field enforcement
/// happens in validation, not decoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub user_tg_id: String,
}

/// One element of a year's `codes.js` payload, as found in the archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCodeEntry {
    /// Opaque human-readable description of the diploma
    pub oa: Option<String>,
    /// Person name as printed on the diploma
    pub name: Option<String>,
    /// School form (grade)
    pub form: Option<i64>,
    pub hashed: Option<String>,
}

/// Diploma record for one person-year.
///
/// Derived fields are present only when the entry's `oa` description
/// matched the grammar; underivable entries keep `None` and are still
/// forwarded downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiplomaRecord {
    pub person_name: Option<String>,
    pub year: i32,
    pub olymp_name: Option<String>,
    pub profile: Option<String>,
    pub level: Option<i64>,
    /// 0 for a first-degree diploma, 1 for any other degree
    pub result: Option<i64>,
}

/// Body POSTed to the database API's create endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    pub name: Option<String>,
    pub profile: Option<String>,
    pub level: Option<i64>,
    pub user_tg_id: String,
    pub result: Option<i64>,
    pub year: String,
    pub is_approved: bool,
    /// True for the first three records discovered for a request
    pub is_displayed: bool,
}
