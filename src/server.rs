//! HTTP transport.
//!
//! Endpoints:
//! - `GET  /features?bbox=minX,minY,maxX,maxY` - features inside a box
//! - `GET  /nearest?point=x,y&radius=r`        - features within a radius
//! - `GET  /stats`                             - dataset counters
//! - `POST /admin/reload`                      - rebuild and publish now
//!
//! Query responses are GeoJSON `FeatureCollection`s. Bad parameters get a
//! 400 and everything else a 500, both with an `Error: ...` text body.

use crate::dataset::Dataset;
use crate::error::PointServerError;
use crate::query::QueryService;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const GEOJSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Deserialize)]
struct BoxParams {
    bbox: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NearestParams {
    point: Option<String>,
    radius: Option<String>,
}

/// Per-request error response.
struct ApiError(PointServerError);

impl From<PointServerError> for ApiError {
    fn from(err: PointServerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, format!("Error: {}", self.0)).into_response()
    }
}

fn missing(name: &str) -> ApiError {
    ApiError(PointServerError::Parse(format!(
        "missing required parameter `{}`",
        name
    )))
}

fn geojson_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, GEOJSON_CONTENT_TYPE)], body).into_response()
}

async fn features(
    State(service): State<QueryService>,
    Query(params): Query<BoxParams>,
) -> Result<Response, ApiError> {
    let bbox = params.bbox.ok_or_else(|| missing("bbox"))?;
    let body = service.box_geojson(&bbox)?;
    Ok(geojson_response(body))
}

async fn nearest(
    State(service): State<QueryService>,
    Query(params): Query<NearestParams>,
) -> Result<Response, ApiError> {
    let point = params.point.ok_or_else(|| missing("point"))?;
    let radius = params.radius.ok_or_else(|| missing("radius"))?;
    let body = service.nearest_geojson(&point, &radius)?;
    Ok(geojson_response(body))
}

async fn stats(State(service): State<QueryService>) -> impl IntoResponse {
    Json(service.dataset().stats())
}

async fn reload(State(service): State<QueryService>) -> Response {
    let dataset = Arc::clone(service.dataset());
    // Building a store is CPU-bound; keep it off the async workers.
    let outcome = tokio::task::spawn_blocking(move || dataset.reload()).await;

    match outcome {
        Ok(Ok(report)) => {
            info!(
                features = report.features,
                generation = report.generation,
                "Reload requested by operator succeeded"
            );
            Json(json!({
                "features": report.features,
                "generation": report.generation,
                "elapsed_ms": report.elapsed.as_millis() as u64,
            }))
            .into_response()
        }
        Ok(Err(e)) => {
            warn!("Reload requested by operator failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Reload task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "reload task failed" })),
            )
                .into_response()
        }
    }
}

/// Build the router serving `dataset`.
pub fn router(dataset: Arc<Dataset>) -> Router {
    Router::new()
        .route("/features", get(features))
        .route("/nearest", get(nearest))
        .route("/stats", get(stats))
        .route("/admin/reload", post(reload))
        .with_state(QueryService::new(dataset))
}

/// Serve until `shutdown` resolves, then finish in-flight requests.
pub async fn run_server(
    listener: TcpListener,
    dataset: Arc<Dataset>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("pointserver listening on {}", listener.local_addr()?);

    axum::serve(listener, router(dataset))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
