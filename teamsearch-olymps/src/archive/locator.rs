//! Archive probing and fetching
//!
//! For a person hash and a window of years, builds candidate `codes.js`
//! URLs, cheaply probes each for existence, and fetches/extracts the years
//! that respond. Probe and fetch failures skip the year silently — discovery
//! never raises on network trouble.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use reqwest::header::RANGE;
use std::time::Duration;
use tracing::{debug, warn};

use super::codes::parse_diploma_codes;
use super::description::DiplomaDescription;
use crate::identity::{self, IdentityError};
use crate::models::{DiplomaRecord, RawCodeEntry};
use crate::types::DiplomaSource;

const STATIC_PATH: &str = "/files/rsosh-diplomas-static";
const USER_AGENT: &str = "TeamSearchBot/1.0";

/// First year the archive publishes compiled storage for
const EPOCH_YEAR: i32 = 2016;
/// Window depth when the caller does not choose one
const DEFAULT_YEARS_BACK: i32 = 10;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Ascending window of candidate years, clamped below at the archive epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    first: i32,
    last: i32,
}

impl YearWindow {
    /// Window ending at `last`, reaching back `years_back` years but never
    /// before the epoch
    pub fn ending_at(last: i32, years_back: i32) -> Self {
        let first = (last - years_back).max(EPOCH_YEAR);
        Self { first, last }
    }

    /// Window ending at the current calendar year
    pub fn current(years_back: i32) -> Self {
        Self::ending_at(Utc::now().year(), years_back)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.first..=self.last
    }
}

impl Default for YearWindow {
    fn default() -> Self {
        Self::current(DEFAULT_YEARS_BACK)
    }
}

/// Client for the public diploma archive.
///
/// Archive calls are infrequent and per-message, so the underlying client
/// keeps no idle connections between probes; each probe/fetch is an
/// independent call.
pub struct DiplomaArchive {
    base_url: String,
    client: reqwest::Client,
}

impl DiplomaArchive {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Candidate URL for one person-year
    pub fn codes_url(&self, year: i32, person_hash: &str) -> String {
        format!(
            "{}{}/compiled-storage-{}/by-person-released/{}/codes.js",
            self.base_url, STATIC_PATH, year, person_hash
        )
    }

    /// Cheap existence probe: HEAD, falling back to a one-byte ranged GET
    /// when the server rejects HEAD with 405. Any status in [200, 400)
    /// counts as "exists"; anything else, including transport failure,
    /// does not.
    pub async fn exists(&self, url: &str) -> bool {
        let status = match self.client.head(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) if response.status().as_u16() == 405 => {
                let ranged = self
                    .client
                    .get(url)
                    .header(RANGE, "bytes=0-0")
                    .timeout(PROBE_TIMEOUT)
                    .send()
                    .await;
                match ranged {
                    Ok(response) => response.status(),
                    Err(err) => {
                        debug!(url, error = %err, "ranged existence probe failed");
                        return false;
                    }
                }
            }
            Ok(response) => response.status(),
            Err(err) => {
                debug!(url, error = %err, "existence probe failed");
                return false;
            }
        };
        status_means_exists(status.as_u16())
    }

    /// Fetch and extract one year's payload. `None` on any HTTP trouble or
    /// when the payload holds no entries.
    pub async fn fetch_codes(&self, url: &str) -> Option<Vec<RawCodeEntry>> {
        let response = match self.client.get(url).timeout(FETCH_TIMEOUT).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url, error = %err, "archive fetch failed");
                return None;
            }
        };
        if response.status() != reqwest::StatusCode::OK {
            debug!(url, status = response.status().as_u16(), "archive fetch skipped");
            return None;
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(url, error = %err, "archive body read failed");
                return None;
            }
        };
        let entries = parse_diploma_codes(&body);
        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }

    /// Discover all records for a person hash across the window, ascending,
    /// per-year source order preserved
    pub async fn discover(&self, person_hash: &str, window: &YearWindow) -> Vec<DiplomaRecord> {
        let mut records = Vec::new();
        for year in window.years() {
            let url = self.codes_url(year, person_hash);
            if !self.exists(&url).await {
                continue;
            }
            let Some(entries) = self.fetch_codes(&url).await else {
                continue;
            };
            debug!(year, count = entries.len(), "archive year yielded entries");
            for entry in entries {
                records.push(record_from_entry(entry, year));
            }
        }
        records
    }
}

/// Probe statuses in [200, 400) count as "exists" — 206 Partial Content from
/// the ranged fallback included
fn status_means_exists(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Attach derived description fields where the entry's `oa` parses;
/// underivable entries still contribute a record
fn record_from_entry(entry: RawCodeEntry, year: i32) -> DiplomaRecord {
    let mut record = DiplomaRecord {
        person_name: entry.name,
        year,
        ..DiplomaRecord::default()
    };
    if let Some(description) = entry.oa.as_deref().and_then(DiplomaDescription::parse) {
        record.olymp_name = Some(description.olymp_name);
        record.profile = Some(description.profile);
        record.level = Some(description.level);
        record.result = Some(description.result);
    }
    record
}

#[async_trait]
impl DiplomaSource for DiplomaArchive {
    async fn find_diplomas(
        &self,
        full_name: &str,
        birthdate: &str,
    ) -> Result<Vec<DiplomaRecord>, IdentityError> {
        let date = identity::validate_birthdate(birthdate)?;
        let iso_date = date.format("%Y-%m-%d").to_string();
        let person = identity::person_hash(full_name, &iso_date);
        debug!(person = %person, "diploma discovery started");
        Ok(self.discover(&person, &YearWindow::default()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_window_clamps_to_epoch() {
        let window = YearWindow::ending_at(2020, 10);
        assert_eq!(window.years().collect::<Vec<_>>(), (2016..=2020).collect::<Vec<_>>());
    }

    #[test]
    fn test_year_window_without_clamp() {
        let window = YearWindow::ending_at(2030, 3);
        assert_eq!(window.years().collect::<Vec<_>>(), vec![2027, 2028, 2029, 2030]);
    }

    #[test]
    fn test_year_window_is_ascending() {
        let years: Vec<i32> = YearWindow::ending_at(2026, 10).years().collect();
        assert!(years.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(years.first(), Some(&2016));
        assert_eq!(years.last(), Some(&2026));
    }

    #[test]
    fn test_probe_status_interpretation() {
        for status in [200, 206, 301, 302, 399] {
            assert!(status_means_exists(status), "{status} should mean exists");
        }
        for status in [404, 403, 405, 500, 199] {
            assert!(!status_means_exists(status), "{status} should not mean exists");
        }
    }

    #[test]
    fn test_codes_url_template() {
        let archive = DiplomaArchive::new("https://diploma.olimpiada.ru/").unwrap();
        assert_eq!(
            archive.codes_url(2024, "abc123"),
            "https://diploma.olimpiada.ru/files/rsosh-diplomas-static/compiled-storage-2024/by-person-released/abc123/codes.js"
        );
    }

    #[test]
    fn test_record_from_entry_with_parseable_description() {
        let entry = RawCodeEntry {
            oa: Some("№1. 'Олимпиада' ('Профиль'), 1 уровень. Диплом 1 степени.".to_string()),
            name: Some("Иванов Иван".to_string()),
            form: Some(11),
            hashed: Some("h".to_string()),
        };
        let record = record_from_entry(entry, 2024);
        assert_eq!(record.person_name.as_deref(), Some("Иванов Иван"));
        assert_eq!(record.year, 2024);
        assert_eq!(record.olymp_name.as_deref(), Some("Олимпиада"));
        assert_eq!(record.profile.as_deref(), Some("Профиль"));
        assert_eq!(record.level, Some(1));
        assert_eq!(record.result, Some(0));
    }

    #[test]
    fn test_record_from_entry_keeps_underivable_entry() {
        let entry = RawCodeEntry {
            oa: Some("не по форме".to_string()),
            name: Some("Иванов Иван".to_string()),
            form: Some(9),
            hashed: None,
        };
        let record = record_from_entry(entry, 2023);
        assert_eq!(record.person_name.as_deref(), Some("Иванов Иван"));
        assert_eq!(record.olymp_name, None);
        assert_eq!(record.level, None);
        assert_eq!(record.result, None);
    }
}
