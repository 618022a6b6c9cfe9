use std::net::SocketAddr;

use agent_wrap_api::{AgentWrapApi, API_CONTRACT_VERSION};
use agent_wrap_core::AgentSummary;
use agent_wrap_sheets::{SheetsClient, SheetsConfig, DEFAULT_ACTIVITY_RANGE, DEFAULT_PROFILE_RANGE};
use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";
const OPENAPI_YAML: &str = include_str!("../../../openapi/openapi.yaml");

#[derive(Debug, Clone)]
struct ServiceState {
    api: AgentWrapApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    service_contract_version: &'static str,
    found: bool,
    error: String,
    #[serde(skip_serializing)]
    status: StatusCode,
}

#[derive(Debug, Clone, Deserialize)]
struct AgentQuery {
    mobile: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Parser)]
#[command(name = "agent-wrap-service")]
#[command(about = "HTTP service for agent year-in-review summaries")]
struct Args {
    #[arg(long, env = "AGENT_WRAP_SPREADSHEET_ID")]
    spreadsheet_id: String,
    #[arg(long, env = "AGENT_WRAP_API_KEY")]
    api_key: String,
    #[arg(long, default_value = DEFAULT_ACTIVITY_RANGE)]
    activity_range: String,
    #[arg(long, default_value = DEFAULT_PROFILE_RANGE)]
    profile_range: String,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> ServiceError {
    ServiceError {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        found: false,
        error: message.into(),
        status,
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/openapi", get(openapi))
        .route("/v1/agent", get(agent))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let config = SheetsConfig {
        spreadsheet_id: args.spreadsheet_id,
        api_key: args.api_key,
        activity_range: args.activity_range,
        profile_range: args.profile_range,
    };
    let state = ServiceState { api: AgentWrapApi::new(SheetsClient::new(config)) };

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(bind = %args.bind, "agent-wrap service listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health() -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok" }))
}

async fn openapi() -> impl IntoResponse {
    (StatusCode::OK, [("content-type", "application/yaml; charset=utf-8")], OPENAPI_YAML)
}

async fn agent(
    State(state): State<ServiceState>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<ServiceEnvelope<AgentSummary>>, ServiceError> {
    let Some(mobile) = query.mobile.filter(|mobile| !mobile.trim().is_empty()) else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "mobile query parameter is required",
        ));
    };

    // The sheets read is blocking; keep it off the async workers.
    let api = state.api.clone();
    let summary = tokio::task::spawn_blocking(move || api.resolve_agent_summary(&mobile))
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "lookup task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup task failed")
        })?
        .map_err(|err| {
            tracing::warn!(error = %err, "backing store read failed");
            error_response(StatusCode::BAD_GATEWAY, "backing store unavailable")
        })?;

    Ok(Json(envelope(summary)))
}

#[cfg(test)]
mod tests {
    use agent_wrap_api::{RowSource, StaticSource};
    use agent_wrap_sheets::{RowBatch, SourceError};
    use axum::body::to_bytes;
    use http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    fn fixture_batch() -> RowBatch {
        RowBatch {
            activity_rows: vec![
                vec![json!("Mobile Number")],
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
                vec![json!("CP123"), json!("9876543210"), json!("Asha Rao")],
            ],
        }
    }

    fn fixture_router() -> Router {
        app(ServiceState { api: AgentWrapApi::new(StaticSource::new(fixture_batch())) })
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes,
            Err(err) => panic!("failed to read response body: {err}"),
        };
        let body = match String::from_utf8(bytes.to_vec()) {
            Ok(body) => body,
            Err(err) => panic!("response body is not UTF-8: {err}"),
        };
        match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(err) => panic!("response body is not JSON: {err}; body={body}"),
        }
    }

    async fn get_response(router: Router, uri: &str) -> Response {
        let request = Request::builder()
            .uri(uri)
            .method("GET")
            .body(axum::body::Body::empty())
            .unwrap_or_else(|err| panic!("failed to build request: {err}"));
        match router.oneshot(request).await {
            Ok(response) => response,
            Err(err) => panic!("router request failed: {err}"),
        }
    }

    // Test IDs: TSVC-001
    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let response = get_response(fixture_router(), "/v1/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = response_json(response).await;
        assert_eq!(
            value.get("service_contract_version").and_then(serde_json::Value::as_str),
            Some(SERVICE_CONTRACT_VERSION)
        );
    }

    // Test IDs: TSVC-002
    #[tokio::test]
    async fn agent_endpoint_returns_an_enveloped_summary() {
        let response =
            get_response(fixture_router(), "/v1/agent?mobile=%2B91%2098765%2043210").await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = response_json(response).await;
        let data = value.get("data").unwrap_or(&serde_json::Value::Null);
        assert_eq!(data.get("found").and_then(serde_json::Value::as_bool), Some(true));
        assert_eq!(
            data.get("agent_name").and_then(serde_json::Value::as_str),
            Some("Asha Rao")
        );
        assert_eq!(data.get("days_active").and_then(serde_json::Value::as_i64), Some(12));
    }

    // Test IDs: TSVC-003
    #[tokio::test]
    async fn agent_endpoint_reports_not_found_lookups_as_data() {
        let response = get_response(fixture_router(), "/v1/agent?mobile=1234567890").await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = response_json(response).await;
        assert_eq!(
            value.pointer("/data/found").and_then(serde_json::Value::as_bool),
            Some(false)
        );
    }

    // Test IDs: TSVC-004
    #[tokio::test]
    async fn missing_mobile_parameter_is_a_bad_request() {
        let response = get_response(fixture_router(), "/v1/agent").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let value = response_json(response).await;
        assert_eq!(value.get("found").and_then(serde_json::Value::as_bool), Some(false));
        assert!(value.get("error").and_then(serde_json::Value::as_str).is_some());
    }

    // Test IDs: TSVC-005
    #[tokio::test]
    async fn source_failure_maps_to_bad_gateway() {
        #[derive(Debug, Clone, Copy)]
        struct FailingSource;

        impl RowSource for FailingSource {
            fn fetch_batch(&self) -> Result<RowBatch, SourceError> {
                Err(SourceError::Transport("connection refused".to_string()))
            }
        }

        let router = app(ServiceState { api: AgentWrapApi::new(FailingSource) });
        let response = get_response(router, "/v1/agent?mobile=9876543210").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    // Test IDs: TSVC-006
    #[tokio::test]
    async fn openapi_endpoint_returns_versioned_artifact() {
        let response = get_response(fixture_router(), "/v1/openapi").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes,
            Err(err) => panic!("failed to read response body: {err}"),
        };
        let body = match String::from_utf8(bytes.to_vec()) {
            Ok(body) => body,
            Err(err) => panic!("response body is not UTF-8: {err}"),
        };
        assert!(body.contains("openapi: 3.1.0"));
        assert!(body.contains("version: service.v1"));
        assert!(body.contains("/v1/agent"));
    }
}
