//! Database API client
//!
//! Submits normalized olympiad records to the downstream database service
//! and classifies every HTTP outcome into a fixed taxonomy. The submit call
//! never fails for HTTP-level trouble — callers branch on the returned
//! outcome instead. Only client construction errors propagate.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use teamsearch_common::Error;
use tracing::{debug, warn};

use crate::models::SubmissionPayload;
use crate::types::OlympiadSink;

const CREATE_PATH: &str = "/olymp/create/";
const USER_AGENT: &str = "TeamSearchBot/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport retry budget for transient statuses and connection errors
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;

/// Submission outcome category, classified by HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCategory {
    Created,
    Conflict,
    BadRequest,
    Unauthorized,
    RateLimited,
    ServerError,
    NetworkError,
    UnknownError,
}

impl OutcomeCategory {
    /// Classification precedence: success range first, then the named
    /// statuses, then the server-error range
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Created,
            409 => Self::Conflict,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::UnknownError,
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, Self::Created)
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Conflict => "conflict",
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::NetworkError => "network_error",
            Self::UnknownError => "unknown_error",
        };
        f.write_str(name)
    }
}

/// Result of one submission attempt; never mutated after creation
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub ok: bool,
    /// 0 for transport-level failures
    pub status_code: u16,
    pub category: OutcomeCategory,
    /// Present only when the response declared a JSON content type and parsed
    pub response_body: Option<Value>,
}

impl SubmissionOutcome {
    fn network_error() -> Self {
        Self {
            ok: false,
            status_code: 0,
            category: OutcomeCategory::NetworkError,
            response_body: None,
        }
    }
}

/// Client for the database API's olympiad creation endpoint.
///
/// Holds one pooled HTTP client reused across submissions within the
/// process; the optional bearer token rides on every request.
pub struct DatabaseApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl DatabaseApiClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::Config("database API token contains invalid header characters".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client construction failed: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST one record to the creation endpoint and classify the outcome.
    ///
    /// Transient statuses (429, 500, 502, 503, 504) and transport errors are
    /// retried with exponential backoff before classification; whatever the
    /// final attempt produced is what gets classified.
    pub async fn create_olympiad(&self, payload: &SubmissionPayload) -> SubmissionOutcome {
        let url = format!("{}{}", self.base_url, CREATE_PATH);
        let mut backoff_ms = BACKOFF_BASE_MS;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.http.post(&url).json(payload).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status_is_retryable(status) && attempt <= MAX_RETRIES {
                        debug!(status, attempt, backoff_ms, "transient database API status, backing off");
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms *= 2;
                        continue;
                    }
                    return classify_response(response).await;
                }
                Err(err) => {
                    if attempt <= MAX_RETRIES {
                        debug!(error = %err, attempt, backoff_ms, "database API transport error, backing off");
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms *= 2;
                        continue;
                    }
                    warn!(error = %err, "database API unreachable after retries");
                    return SubmissionOutcome::network_error();
                }
            }
        }
    }
}

fn status_is_retryable(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Classify a response; the body is parsed only when the content type
/// declares JSON, and a parse failure yields no body rather than an error
async fn classify_response(response: reqwest::Response) -> SubmissionOutcome {
    let status = response.status().as_u16();
    let category = OutcomeCategory::from_status(status);
    let declares_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false);
    let response_body = if declares_json {
        response.json::<Value>().await.ok()
    } else {
        None
    };
    SubmissionOutcome {
        ok: category.is_ok(),
        status_code: status,
        category,
        response_body,
    }
}

#[async_trait]
impl OlympiadSink for DatabaseApiClient {
    async fn submit(&self, payload: &SubmissionPayload) -> SubmissionOutcome {
        self.create_olympiad(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert_eq!(OutcomeCategory::from_status(200), OutcomeCategory::Created);
        assert_eq!(OutcomeCategory::from_status(201), OutcomeCategory::Created);
        assert_eq!(OutcomeCategory::from_status(299), OutcomeCategory::Created);
        assert_eq!(OutcomeCategory::from_status(409), OutcomeCategory::Conflict);
        assert_eq!(OutcomeCategory::from_status(400), OutcomeCategory::BadRequest);
        assert_eq!(OutcomeCategory::from_status(401), OutcomeCategory::Unauthorized);
        assert_eq!(OutcomeCategory::from_status(429), OutcomeCategory::RateLimited);
        assert_eq!(OutcomeCategory::from_status(500), OutcomeCategory::ServerError);
        assert_eq!(OutcomeCategory::from_status(599), OutcomeCategory::ServerError);
        assert_eq!(OutcomeCategory::from_status(302), OutcomeCategory::UnknownError);
        assert_eq!(OutcomeCategory::from_status(404), OutcomeCategory::UnknownError);
    }

    #[test]
    fn test_only_created_is_ok() {
        assert!(OutcomeCategory::Created.is_ok());
        for category in [
            OutcomeCategory::Conflict,
            OutcomeCategory::BadRequest,
            OutcomeCategory::Unauthorized,
            OutcomeCategory::RateLimited,
            OutcomeCategory::ServerError,
            OutcomeCategory::NetworkError,
            OutcomeCategory::UnknownError,
        ] {
            assert!(!category.is_ok(), "{category} must not be ok");
        }
    }

    #[test]
    fn test_category_display_names() {
        assert_eq!(OutcomeCategory::Created.to_string(), "created");
        assert_eq!(OutcomeCategory::BadRequest.to_string(), "bad_request");
        assert_eq!(OutcomeCategory::NetworkError.to_string(), "network_error");
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(status_is_retryable(status), "{status} should retry");
        }
        for status in [200, 400, 401, 409, 501] {
            assert!(!status_is_retryable(status), "{status} should not retry");
        }
    }

    #[test]
    fn test_client_construction() {
        assert!(DatabaseApiClient::new("http://db:8000", None).is_ok());
        assert!(DatabaseApiClient::new("http://db:8000/", Some("token")).is_ok());
        assert!(DatabaseApiClient::new("http://db:8000", Some("bad\ntoken")).is_err());
    }

    #[test]
    fn test_network_error_outcome_shape() {
        let outcome = SubmissionOutcome::network_error();
        assert!(!outcome.ok);
        assert_eq!(outcome.status_code, 0);
        assert_eq!(outcome.category, OutcomeCategory::NetworkError);
        assert!(outcome.response_body.is_none());
    }
}
