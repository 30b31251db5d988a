//! Message validation and the per-message processing pipeline
//!
//! Validation rejects requests with missing required fields before any
//! network activity. Processing then discovers the person's diploma records
//! and submits each one to the database API sequentially, in discovery
//! order — the display flag is positional. Per-record submission failures
//! are recorded in the aggregate but never abort the loop.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::{LookupRequest, SubmissionPayload};
use crate::services::db_client::{OutcomeCategory, SubmissionOutcome};
use crate::types::{DiplomaSource, OlympiadSink};

/// Leading records per request flagged for prominent display
const DISPLAYED_LIMIT: usize = 3;

/// A required field is missing or empty; permanently invalid, non-retryable
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Processing pipeline errors
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Anything unexpected during discovery or submission orchestration;
    /// treated as transient by the delivery layer
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Request fields after validation and trimming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// `"{last} {first} {middle}"`, trimmed — the discovery name
    pub full_name: String,
    pub date_of_birth: String,
    pub user_tg_id: String,
}

/// Check required fields and assemble the discovery name
pub fn validate_request(request: &LookupRequest) -> Result<ValidatedRequest, ValidationError> {
    let first_name = request.first_name.trim();
    let last_name = request.last_name.trim();
    let middle_name = request.middle_name.trim();
    let date_of_birth = request.date_of_birth.trim();
    let user_tg_id = request.user_tg_id.trim();

    if first_name.is_empty() || last_name.is_empty() {
        return Err(ValidationError(
            "first_name and last_name are required".to_string(),
        ));
    }
    if date_of_birth.is_empty() {
        return Err(ValidationError(
            "date_of_birth is required in format dd-mm-yyyy".to_string(),
        ));
    }
    if user_tg_id.is_empty() {
        return Err(ValidationError("user_tg_id is required".to_string()));
    }

    let full_name = format!("{last_name} {first_name} {middle_name}")
        .trim()
        .to_string();
    Ok(ValidatedRequest {
        full_name,
        date_of_birth: date_of_birth.to_string(),
        user_tg_id: user_tg_id.to_string(),
    })
}

/// Outcome of one submission within a message
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub payload: SubmissionPayload,
    pub category: OutcomeCategory,
    pub ok: bool,
}

/// Aggregate over one message's submissions, in submission order
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub created: usize,
    pub total: usize,
    pub items: Vec<ItemOutcome>,
}

/// Run one lookup request through discovery and submission.
///
/// Submission order equals discovery order and must stay sequential:
/// `is_displayed` is assigned by position and has to be reproducible
/// run-to-run for the same archive state.
pub async fn process_message<S, K>(
    request: &LookupRequest,
    source: &S,
    sink: &K,
) -> Result<ProcessingResult, ProcessError>
where
    S: DiplomaSource + ?Sized,
    K: OlympiadSink + ?Sized,
{
    let validated = validate_request(request)?;

    let records = source
        .find_diplomas(&validated.full_name, &validated.date_of_birth)
        .await
        .map_err(anyhow::Error::from)?;
    info!(count = records.len(), "diploma discovery finished");

    let mut items = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let payload = SubmissionPayload {
            name: record.olymp_name,
            profile: record.profile,
            level: record.level,
            user_tg_id: validated.user_tg_id.clone(),
            result: record.result,
            year: record.year.to_string(),
            is_approved: true,
            is_displayed: index < DISPLAYED_LIMIT,
        };

        let outcome = sink.submit(&payload).await;
        log_outcome(&payload, &outcome);
        items.push(ItemOutcome {
            payload,
            category: outcome.category,
            ok: outcome.ok,
        });
    }

    Ok(ProcessingResult {
        created: items.iter().filter(|item| item.ok).count(),
        total: items.len(),
        items,
    })
}

/// Conflict is expected (duplicate record) and stays informational;
/// transient categories get warnings, transport loss an error
fn log_outcome(payload: &SubmissionPayload, outcome: &SubmissionOutcome) {
    match outcome.category {
        OutcomeCategory::Created => {
            info!(name = ?payload.name, year = %payload.year, "olympiad record created")
        }
        OutcomeCategory::Conflict => {
            info!(name = ?payload.name, year = %payload.year, "olympiad record already exists")
        }
        OutcomeCategory::RateLimited => {
            warn!(status = outcome.status_code, "database API rate limit hit")
        }
        OutcomeCategory::NetworkError => error!("database API unreachable"),
        category => warn!(
            status = outcome.status_code,
            category = %category,
            body = ?outcome.response_body,
            "olympiad record rejected"
        ),
    }
}
