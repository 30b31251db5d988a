//! teamsearch-olymps library interface
//!
//! Exposes the ingest pipeline modules for integration testing

pub mod archive;
pub mod consumer;
pub mod identity;
pub mod models;
pub mod processor;
pub mod services;
pub mod types;

pub use crate::consumer::{DeliveryDecision, OlympsConsumer};
pub use crate::processor::{ProcessError, ProcessingResult, ValidationError};
