//! Seams between discovery, submission, and orchestration
//!
//! Discovery returns an *ordered* sequence: ascending year, archive source
//! order within a year. The orchestrator must consume it in that order —
//! the display flag on submitted records is positional, so a reordering
//! implementation would silently change which records surface prominently.

use async_trait::async_trait;

use crate::identity::IdentityError;
use crate::models::{DiplomaRecord, SubmissionPayload};
use crate::services::db_client::SubmissionOutcome;

/// Source of published diploma records for a person
#[async_trait]
pub trait DiplomaSource: Send + Sync {
    /// Discover every published record for `(full_name, birthdate)`,
    /// ordered ascending by year with per-year source order preserved.
    ///
    /// Discovery itself never fails on network trouble (years that cannot
    /// be probed or fetched are omitted); only identity derivation errors
    /// surface here.
    async fn find_diplomas(
        &self,
        full_name: &str,
        birthdate: &str,
    ) -> Result<Vec<DiplomaRecord>, IdentityError>;
}

/// Destination for normalized olympiad records
#[async_trait]
pub trait OlympiadSink: Send + Sync {
    /// Submit one record. Never fails at the call site for HTTP-level
    /// trouble; every outcome is classified into the returned taxonomy.
    async fn submit(&self, payload: &SubmissionPayload) -> SubmissionOutcome;
}
