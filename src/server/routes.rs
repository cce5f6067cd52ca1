//! server::routes
//!
//! HTTP handlers.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ApiError;
use super::AppState;
use crate::core::config::DeliveryMode;
use crate::core::types::ResourcePath;
use crate::resolve::{Delivery, Origin, ResolveError};

/// Header naming where the delivered bytes came from.
pub const ORIGIN_HEADER: &str = "x-geojson-origin";

const JSON: &str = "application/json";

#[derive(Debug, Default, Deserialize)]
pub struct GeoJsonQuery {
    /// `true`/`false` override of the configured delivery mode
    pub stream: Option<String>,
}

impl GeoJsonQuery {
    fn mode(&self, default: DeliveryMode) -> Result<DeliveryMode, ApiError> {
        match self.stream.as_deref() {
            None => Ok(default),
            Some("true") | Some("1") => Ok(DeliveryMode::Streaming),
            Some("false") | Some("0") => Ok(DeliveryMode::Buffered),
            Some(other) => Err(ApiError::BadRequest(format!(
                "stream must be true or false, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /api/geojson/*path
pub async fn geojson(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(query): Query<GeoJsonQuery>,
) -> Result<Response, ApiError> {
    let mode = query.mode(state.mode)?;
    let path = ResourcePath::new(&raw).map_err(ResolveError::from)?;
    debug!(path = %path, mode = %mode, "geojson request");

    let response = match state.resolver.deliver(&path, mode).await? {
        Delivery::Buffered(doc) => document_response(doc.origin, Body::from(doc.body)),
        Delivery::Streaming(stream) => {
            document_response(stream.origin, Body::from_stream(stream.body))
        }
    };
    Ok(response)
}

/// GET /api/geojson with nothing after the prefix.
pub async fn geojson_root() -> ApiError {
    ApiError::Resolve(ResolveError::InvalidPath {
        path: String::new(),
        reason: "path is empty".to_string(),
    })
}

/// GET /api/list and /api/list/*path
pub async fn list(
    State(state): State<AppState>,
    raw: Option<Path<String>>,
) -> Result<Response, ApiError> {
    let raw = raw.map(|Path(p)| p).unwrap_or_default();
    let path = ResourcePath::directory(&raw).map_err(ResolveError::from)?;
    let entries = state.resolver.list(path.as_ref()).await?;
    Ok(Json(entries).into_response())
}

fn document_response(origin: Origin, body: Body) -> Response {
    let origin = match origin {
        Origin::Literal => HeaderValue::from_static("literal"),
        Origin::LargeObject => HeaderValue::from_static("large_object"),
    };
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(JSON)),
            (header::HeaderName::from_static(ORIGIN_HEADER), origin),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_query_overrides_mode() {
        let query = |v: Option<&str>| GeoJsonQuery {
            stream: v.map(str::to_string),
        };
        assert_eq!(
            query(None).mode(DeliveryMode::Buffered).unwrap(),
            DeliveryMode::Buffered
        );
        assert_eq!(
            query(Some("true")).mode(DeliveryMode::Buffered).unwrap(),
            DeliveryMode::Streaming
        );
        assert_eq!(
            query(Some("false")).mode(DeliveryMode::Streaming).unwrap(),
            DeliveryMode::Buffered
        );
        assert!(query(Some("maybe")).mode(DeliveryMode::Buffered).is_err());
    }
}
