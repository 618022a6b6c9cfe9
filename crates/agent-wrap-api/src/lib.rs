use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use agent_wrap_core::{
    assemble_summary, candidate_identifiers, find_matching_row, AgentSummary,
    ACTIVITY_IDENTIFIER_COLUMN, PROFILE_IDENTIFIER_COLUMN,
};
use agent_wrap_sheets::{FixtureSource, RowBatch, SheetsClient, SourceError};
use serde_json::json;

pub const API_CONTRACT_VERSION: &str = "api.v1";

/// The backing tabular store: one batch read of both ranges per request.
pub trait RowSource: Send + Sync {
    /// # Errors
    /// Returns [`SourceError`] when the store itself is unavailable; a lookup
    /// that finds no row is not a source error.
    fn fetch_batch(&self) -> Result<RowBatch, SourceError>;
}

impl RowSource for SheetsClient {
    fn fetch_batch(&self) -> Result<RowBatch, SourceError> {
        Self::fetch_batch(self)
    }
}

impl RowSource for FixtureSource {
    fn fetch_batch(&self) -> Result<RowBatch, SourceError> {
        self.load()
    }
}

/// In-memory source for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    batch: RowBatch,
}

impl StaticSource {
    #[must_use]
    pub fn new(batch: RowBatch) -> Self {
        Self { batch }
    }
}

impl RowSource for StaticSource {
    fn fetch_batch(&self) -> Result<RowBatch, SourceError> {
        Ok(self.batch.clone())
    }
}

/// Injected analytics seam. The derivation pipeline never calls this; only
/// the request boundary emits events through it.
pub trait Observer: Send + Sync {
    fn on_event(&self, name: &str, properties: &serde_json::Value);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&self, _name: &str, _properties: &serde_json::Value) {}
}

/// Facade over the full lookup-and-derive pass: resolve the identifier
/// against both sources, then assemble one canonical summary.
#[derive(Clone)]
pub struct AgentWrapApi {
    source: Arc<dyn RowSource>,
    observer: Arc<dyn Observer>,
}

impl Debug for AgentWrapApi {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentWrapApi").finish_non_exhaustive()
    }
}

impl AgentWrapApi {
    pub fn new(source: impl RowSource + 'static) -> Self {
        Self { source: Arc::new(source), observer: Arc::new(NoopObserver) }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Full derivation pass for one identifier. A blank identifier or an
    /// identifier matching neither source yields a typed `found: false`
    /// summary, never an error.
    ///
    /// # Errors
    /// Returns [`SourceError`] only when the batch read itself fails; no
    /// partial record is produced in that case.
    pub fn resolve_agent_summary(&self, identifier: &str) -> Result<AgentSummary, SourceError> {
        let candidates = candidate_identifiers(identifier);
        if candidates.is_empty() {
            self.observer.on_event("lookup_rejected", &json!({ "reason": "blank_identifier" }));
            return Ok(AgentSummary::not_found());
        }

        let batch = self.source.fetch_batch()?;
        let activity_row =
            find_matching_row(&batch.activity_rows, ACTIVITY_IDENTIFIER_COLUMN, &candidates);
        let profile_row =
            find_matching_row(&batch.profile_rows, PROFILE_IDENTIFIER_COLUMN, &candidates);
        let summary =
            assemble_summary(identifier, activity_row.map(Vec::as_slice), profile_row.map(Vec::as_slice));

        tracing::debug!(
            found = summary.found,
            activity = activity_row.is_some(),
            profile = profile_row.is_some(),
            "resolved agent summary"
        );
        self.observer.on_event(
            "summary_resolved",
            &json!({ "found": summary.found, "contract": API_CONTRACT_VERSION }),
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn fixture_batch() -> RowBatch {
        RowBatch {
            activity_rows: vec![
                vec![json!("Mobile Number"), json!("Days Active")],
                vec![
                    json!("919876543210"),
                    json!("12"),
                    json!("4"),
                    json!("2025-02-03"),
                    json!("0110110"),
                ],
            ],
            profile_rows: vec![
                vec![json!("CP Id"), json!("Mobile Number"), json!("Name")],
                vec![
                    json!("CP123"),
                    json!("9876543210"),
                    json!("Asha Rao"),
                    json!(r#"[{"zone":"East Bangalore","count":5}]"#),
                ],
            ],
        }
    }

    #[derive(Debug, Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl Observer for Arc<RecordingObserver> {
        fn on_event(&self, name: &str, _properties: &serde_json::Value) {
            if let Ok(mut events) = self.events.lock() {
                events.push(name.to_string());
            }
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct FailingSource;

    impl RowSource for FailingSource {
        fn fetch_batch(&self) -> Result<RowBatch, SourceError> {
            Err(SourceError::Status { status: 503 })
        }
    }

    // Test IDs: TAPI-001
    #[test]
    fn lookup_joins_both_sources_despite_prefix_mismatch() {
        let api = AgentWrapApi::new(StaticSource::new(fixture_batch()));
        let summary = match api.resolve_agent_summary("+91 98765 43210") {
            Ok(summary) => summary,
            Err(err) => panic!("lookup should succeed: {err}"),
        };
        assert!(summary.found);
        assert_eq!(summary.days_active, Some(12));
        assert_eq!(summary.agent_name.as_deref(), Some("Asha Rao"));
        assert_eq!(summary.top_zone.as_deref(), Some("East"));
    }

    // Test IDs: TAPI-002
    #[test]
    fn unknown_identifier_is_a_typed_negative_result() {
        let api = AgentWrapApi::new(StaticSource::new(fixture_batch()));
        let summary = match api.resolve_agent_summary("1234567890") {
            Ok(summary) => summary,
            Err(err) => panic!("lookup should succeed: {err}"),
        };
        assert!(!summary.found);
    }

    // Test IDs: TAPI-003
    #[test]
    fn blank_identifier_short_circuits_without_a_fetch() {
        let api = AgentWrapApi::new(FailingSource);
        let summary = match api.resolve_agent_summary("  + - ") {
            Ok(summary) => summary,
            Err(err) => panic!("blank lookup should not touch the source: {err}"),
        };
        assert!(!summary.found);
    }

    // Test IDs: TAPI-004
    #[test]
    fn source_failure_propagates_as_a_terminal_error() {
        let api = AgentWrapApi::new(FailingSource);
        let result = api.resolve_agent_summary("9876543210");
        assert_eq!(result, Err(SourceError::Status { status: 503 }));
    }

    // Test IDs: TAPI-005
    #[test]
    fn observer_receives_resolution_events() {
        let observer = Arc::new(RecordingObserver::default());
        let api = AgentWrapApi::new(StaticSource::new(fixture_batch()))
            .with_observer(Arc::clone(&observer));
        if let Err(err) = api.resolve_agent_summary("9876543210") {
            panic!("lookup should succeed: {err}");
        }

        let events = match observer.events.lock() {
            Ok(events) => events.clone(),
            Err(err) => panic!("observer mutex poisoned: {err}"),
        };
        assert_eq!(events, vec!["summary_resolved".to_string()]);
    }
}
