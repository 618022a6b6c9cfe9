use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub const DEFAULT_ACTIVITY_RANGE: &str = "Activity!A:E";
pub const DEFAULT_PROFILE_RANGE: &str = "Data!A:U";

pub const SPREADSHEET_ID_ENV: &str = "AGENT_WRAP_SPREADSHEET_ID";
pub const API_KEY_ENV: &str = "AGENT_WRAP_API_KEY";

/// Failures of the backing tabular store itself, distinct from a lookup that
/// simply finds no row.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum SourceError {
    #[error("missing configuration: {0}")]
    Config(&'static str),
    #[error("backing store returned HTTP {status}")]
    Status { status: u16 },
    #[error("backing store unreachable: {0}")]
    Transport(String),
    #[error("malformed backing store response: {0}")]
    Malformed(String),
    #[error("fixture unavailable: {0}")]
    Fixture(String),
}

/// One batch read of both named ranges, row 0 of each being the header.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct RowBatch {
    #[serde(default)]
    pub activity_rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub profile_rows: Vec<Vec<Value>>,
}

#[derive(Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub api_key: String,
    pub activity_range: String,
    pub profile_range: String,
}

impl SheetsConfig {
    /// Read the spreadsheet identifier and access key from the environment,
    /// with the default range names.
    ///
    /// # Errors
    /// Returns [`SourceError::Config`] when either variable is unset or blank.
    pub fn from_env() -> Result<Self, SourceError> {
        let spreadsheet_id = std::env::var(SPREADSHEET_ID_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(SourceError::Config(SPREADSHEET_ID_ENV))?;
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(SourceError::Config(API_KEY_ENV))?;
        Ok(Self {
            spreadsheet_id,
            api_key,
            activity_range: DEFAULT_ACTIVITY_RANGE.to_string(),
            profile_range: DEFAULT_PROFILE_RANGE.to_string(),
        })
    }
}

// The access key stays out of logs.
impl Debug for SheetsConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("api_key", &"<redacted>")
            .field("activity_range", &self.activity_range)
            .field("profile_range", &self.profile_range)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn into_row_batch(decoded: BatchGetResponse) -> RowBatch {
    let mut ranges = decoded.value_ranges.into_iter();
    let activity_rows = ranges.next().map(|range| range.values).unwrap_or_default();
    let profile_rows = ranges.next().map(|range| range.values).unwrap_or_default();
    RowBatch { activity_rows, profile_rows }
}

/// Blocking `values:batchGet` client. Both ranges are fetched in a single
/// round trip with no internal retries; failures propagate as one terminal
/// [`SourceError`] for the request.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    agent: ureq::Agent,
    config: SheetsConfig,
}

impl SheetsClient {
    #[must_use]
    pub fn new(config: SheetsConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self { agent, config }
    }

    /// One batch read of the activity and profile ranges.
    ///
    /// # Errors
    /// Returns [`SourceError::Status`] for non-2xx responses,
    /// [`SourceError::Transport`] for connection failures, and
    /// [`SourceError::Malformed`] when the response body is not the expected
    /// batch shape.
    pub fn fetch_batch(&self) -> Result<RowBatch, SourceError> {
        let url = format!("{BASE_URL}/{}/values:batchGet", self.config.spreadsheet_id);
        let response = self
            .agent
            .get(&url)
            .query("ranges", &self.config.activity_range)
            .query("ranges", &self.config.profile_range)
            .query("key", &self.config.api_key)
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => SourceError::Status { status },
                ureq::Error::Transport(transport) => {
                    SourceError::Transport(transport.to_string())
                }
            })?;

        let decoded: BatchGetResponse = response
            .into_json()
            .map_err(|err| SourceError::Malformed(err.to_string()))?;
        let batch = into_row_batch(decoded);
        tracing::debug!(
            activity_rows = batch.activity_rows.len(),
            profile_rows = batch.profile_rows.len(),
            "fetched sheet batch"
        );
        Ok(batch)
    }
}

/// File-backed [`RowBatch`] for offline runs and integration tests.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    path: PathBuf,
}

impl FixtureSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// # Errors
    /// Returns [`SourceError::Fixture`] when the file cannot be read or is
    /// not a serialized [`RowBatch`].
    pub fn load(&self) -> Result<RowBatch, SourceError> {
        let body = fs::read_to_string(&self.path).map_err(|err| {
            SourceError::Fixture(format!("{}: {err}", self.path.display()))
        })?;
        serde_json::from_str(&body)
            .map_err(|err| SourceError::Fixture(format!("{}: {err}", self.path.display())))
    }
}
