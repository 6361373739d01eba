//! HTTP handlers for the analysis service.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};

use crate::error::AnalysisError;
use crate::pipeline::{AnalysisReport, Analyzer, FetchSummary, StopReason};
use crate::product::ProductRef;
use crate::stats::AggregateStats;
use crate::themes::{Aspect, ThemeEntry};

pub const URL_REQUIRED: &str = "URL is required.";

pub struct AppState {
    pub analyzer: Analyzer,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Product page URL, e.g. `https://www.amazon.com/dp/B08N5WRWNW`.
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponse {
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Request failure as returned to clients.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        match &e {
            AnalysisError::InvalidInput(_) => {
                warn!(error = %e, "rejected product url");
                Self::bad_request(e.to_string())
            }
            AnalysisError::SourceUnavailable(_) => {
                error!(error = %e, "❌ analysis failed");
                Self { status: StatusCode::BAD_GATEWAY, message: e.to_string() }
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "rejected request body");
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

fn required_url(body: Result<Json<AnalyzeRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Json(req) = body?;
    req.url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request(URL_REQUIRED))
}

#[derive(OpenApi)]
#[openapi(
    paths(analyze, analyze_report, health),
    components(
        schemas(
            AnalyzeRequest,
            AnalyzeResponse,
            ErrorResponse,
            HealthResponse,
            AnalysisReport,
            FetchSummary,
            StopReason,
            ProductRef,
            AggregateStats,
            ThemeEntry,
            Aspect,
            crate::sentiment::Sentiment
        )
    ),
    tags(
        (name = "analysis", description = "Product review analysis")
    )
)]
pub struct ApiDoc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze/report", post(analyze_report))
        .route("/health", get(health))
        .with_state(state)
}

/// Summarize the reviews of a product
#[utoipa::path(
    post,
    path = "/analyze",
    tag = "analysis",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Narrative summary", body = AnalyzeResponse),
        (status = 400, description = "Malformed body, or missing or unrecognized product URL", body = ErrorResponse),
        (status = 502, description = "Review source unavailable", body = ErrorResponse)
    )
)]
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let url = required_url(body)?;
    let summary = state.analyzer.analyze_summary(&url).await?;
    Ok(Json(AnalyzeResponse { summary }))
}

/// Full analysis report with statistics, themes, and fetch details
#[utoipa::path(
    post,
    path = "/analyze/report",
    tag = "analysis",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis report", body = AnalysisReport),
        (status = 400, description = "Malformed body, or missing or unrecognized product URL", body = ErrorResponse),
        (status = 502, description = "Review source unavailable", body = ErrorResponse)
    )
)]
pub async fn analyze_report(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let url = required_url(body)?;
    Ok(Json(state.analyzer.analyze(&url).await?))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "analysis",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{fast_settings, ScriptedSource, Step};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(source: ScriptedSource) -> Router {
        let analyzer = Analyzer::new(Arc::new(source), fast_settings());
        router(Arc::new(AppState { analyzer }))
    }

    async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
        post_raw(app, path, "application/json", body.to_string()).await
    }

    async fn post_raw(app: Router, path: &str, content_type: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn kettle_reviews() -> ScriptedSource {
        ScriptedSource::new(vec![
            Step::Reviews(vec![("Great kettle, love it.", 5.0), ("Works well.", 4.0)]),
            Step::End,
        ])
    }

    #[tokio::test]
    async fn test_analyze_returns_summary() {
        let (status, body) = post_json(
            app(kettle_reviews()),
            "/analyze",
            json!({"url": "https://www.amazon.com/dp/B08N5WRWNW"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let summary = body["summary"].as_str().unwrap();
        assert!(summary.starts_with("Based on a detailed analysis of 2 customer reviews, the Acme Kettle"));
    }

    #[tokio::test]
    async fn test_missing_url() {
        for body in [json!({}), json!({"url": "   "})] {
            let (status, body) = post_json(app(kettle_reviews()), "/analyze", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"error": URL_REQUIRED}));
        }
    }

    #[tokio::test]
    async fn test_malformed_body_gets_error_shape() {
        let cases = [
            ("application/json", "{not json".to_string()),
            ("application/json", json!({"url": 123}).to_string()),
            ("text/plain", json!({"url": "https://www.amazon.com/dp/B08N5WRWNW"}).to_string()),
        ];
        for (content_type, body) in cases {
            for path in ["/analyze", "/analyze/report"] {
                let (status, body) = post_raw(app(kettle_reviews()), path, content_type, body.clone()).await;
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(!body["error"].as_str().unwrap().is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_bad_request() {
        let (status, body) = post_json(
            app(kettle_reviews()),
            "/analyze",
            json!({"url": "https://www.amazon.com/gp/bestsellers"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("ASIN"));
    }

    #[tokio::test]
    async fn test_unavailable_source_is_bad_gateway() {
        let (status, body) = post_json(
            app(ScriptedSource::new(vec![Step::Blocked])),
            "/analyze",
            json!({"url": "https://www.amazon.com/dp/B08N5WRWNW"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("captcha"));
    }

    #[tokio::test]
    async fn test_report_shape() {
        let (status, body) = post_json(
            app(kettle_reviews()),
            "/analyze/report",
            json!({"url": "https://www.amazon.co.uk/dp/B08N5WRWNW"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"], json!({"domain": "www.amazon.co.uk", "asin": "B08N5WRWNW"}));
        assert_eq!(body["title"], "Acme Kettle");
        assert_eq!(body["stats"]["total_count"], 2);
        assert_eq!(body["fetch"]["stop"], "exhausted");
        assert!(body["request_id"].is_string());
        assert!(body["analyzed_at"].is_string());
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(kettle_reviews()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/analyze"));
        assert!(doc.paths.paths.contains_key("/analyze/report"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
