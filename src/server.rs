//! HTTP surface: live arrivals from the cache, archived snapshots from the store.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono_tz::Tz;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::arrivals::{ArrivalFilter, ArrivalRow, extract_arrivals};
use crate::cache::LiveCache;
use crate::error::{FeedError, Result};
use crate::parser::{parse_feed, render_feed};
use crate::routes::feed_url;
use crate::store::{ListFilter, SnapshotDetail, SnapshotMeta, SnapshotStore};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<LiveCache>,
    pub store: SnapshotStore,
    /// Zone used for arrival wall-clock strings.
    pub timezone: Tz,
}

type QueryPairs = Query<Vec<(String, String)>>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/route/:route_id/arrivals", get(live_arrivals))
        .route("/route/:route_id/feed", get(live_feed))
        .route("/db/raw", get(list_snapshots))
        .route("/db/raw/:id", get(snapshot_detail))
        .route("/db/raw/:id/compressed", get(snapshot_compressed))
        .route("/db/raw/:id/protobuf", get(snapshot_protobuf))
        .route("/db/raw/:id/arrivals", get(snapshot_arrivals))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub error_code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            error_code: code.to_string(),
            message,
        },
    };
    (status, Json(body)).into_response()
}

impl FeedError {
    pub fn status(&self) -> StatusCode {
        match self {
            FeedError::UnsupportedRoute(_) | FeedError::InvalidParameter { .. } => {
                StatusCode::BAD_REQUEST
            }
            FeedError::NotFound(_) => StatusCode::NOT_FOUND,
            FeedError::UpstreamFetch { .. } => StatusCode::BAD_GATEWAY,
            FeedError::Decode(_) | FeedError::Storage(_) | FeedError::Compress(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, "Request rejected");
        }
        error_response(status, self.code(), self.to_string())
    }
}

fn values(params: &[(String, String)], key: &str) -> Vec<String> {
    params
        .iter()
        .filter(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.clone())
        .collect()
}

/// Path snapshot id; a malformed one is an `InvalidParameter`.
fn parse_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| FeedError::invalid_parameter("id", format!("expected an integer, got {raw:?}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(FeedError::invalid_parameter(name, format!("expected true or false, got {value:?}"))),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /route/{route_id}/arrivals?stop_id=..`
async fn live_arrivals(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
    Query(params): QueryPairs,
) -> Result<Json<Vec<ArrivalRow>>> {
    let url = feed_url(&route_id)?;
    let feed = state.cache.get_or_refresh(&url).await?;

    let filter = ArrivalFilter::for_route(route_id).with_stops(values(&params, "stop_id"));
    Ok(Json(extract_arrivals(&feed, &filter, &state.timezone)))
}

/// `GET /route/{route_id}/feed`
async fn live_feed(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> Result<String> {
    let url = feed_url(&route_id)?;
    let feed = state.cache.get_or_refresh(&url).await?;
    Ok(render_feed(&feed))
}

/// `GET /db/raw?route_group=..&start_date&start_time&end_date&end_time&limit&offset`
async fn list_snapshots(
    State(state): State<AppState>,
    Query(params): QueryPairs,
) -> Result<Json<Vec<SnapshotMeta>>> {
    let filter = ListFilter::from_query_pairs(&params)?;
    Ok(Json(state.store.list(&filter).await?))
}

/// `GET /db/raw/{id}?include_data=..`
async fn snapshot_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): QueryPairs,
) -> Result<Json<SnapshotDetail>> {
    let id = parse_id(&id)?;
    let include_data = match values(&params, "include_data").first() {
        Some(v) => parse_flag("include_data", v)?,
        None => false,
    };
    Ok(Json(state.store.get(id, include_data).await?))
}

/// `GET /db/raw/{id}/compressed`
async fn snapshot_compressed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let bytes = state.store.get_compressed(parse_id(&id)?).await?;
    Ok(([(header::CONTENT_TYPE, "application/gzip")], bytes))
}

/// `GET /db/raw/{id}/protobuf`
async fn snapshot_protobuf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let bytes = state.store.get_decompressed(parse_id(&id)?).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// `GET /db/raw/{id}/arrivals?route_id=..&stop_id=..`
async fn snapshot_arrivals(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): QueryPairs,
) -> Result<Json<Vec<ArrivalRow>>> {
    let bytes = state.store.get_decompressed(parse_id(&id)?).await?;
    let feed = parse_feed(&bytes)?;

    let filter = ArrivalFilter {
        route_id: values(&params, "route_id").into_iter().next(),
        stop_ids: values(&params, "stop_id"),
    };
    Ok(Json(extract_arrivals(&feed, &filter, &state.timezone)))
}

async fn not_found(uri: Uri) -> Response {
    warn!(path = %uri.path(), "No route");
    error_response(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("not found: {}", uri.path()),
    )
}
