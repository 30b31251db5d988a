//! Clients for the worker's external collaborators

pub mod db_client;
pub mod notifier;

pub use db_client::{DatabaseApiClient, OutcomeCategory, SubmissionOutcome};
pub use notifier::SuccessNotifier;
