//! Request handlers for the map service endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ServiceResult;
use crate::query::{FilterParams, DEFAULT_LIMIT};
use crate::router::AppState;
use crate::tiles::TileMetadata;

/// `GET /metadata` response: the container descriptor flattened, plus
/// the client-facing `sourceLayerId` and `churchData` block.
#[derive(Serialize)]
pub struct MetadataResponse<'a> {
    #[serde(flatten)]
    pub info: &'a TileMetadata,
    #[serde(rename = "sourceLayerId")]
    pub source_layer_id: &'a str,
    #[serde(rename = "churchData")]
    pub church_data: ChurchData<'a>,
}

#[derive(Serialize)]
pub struct ChurchData<'a> {
    pub bounds: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<&'a Vec<f64>>,
    pub minzoom: u8,
    pub maxzoom: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<&'a str>,
}

/// GET /metadata - container descriptor.
pub async fn metadata(State(state): State<AppState>) -> ServiceResult<Response> {
    let tiles = state.tiles()?;
    let info = tiles.metadata();

    let response = MetadataResponse {
        info,
        source_layer_id: info.source_layer_id(),
        church_data: ChurchData {
            bounds: info.bounds,
            center: info.center.as_ref(),
            minzoom: info.minzoom,
            maxzoom: info.maxzoom,
            attribution: info.attribution.as_deref(),
        },
    };
    Ok(Json(&response).into_response())
}

/// GET /tiles/{z}/{x}/{y} - binary tile payload.
pub async fn tile(
    State(state): State<AppState>,
    Path((z, x, y)): Path<(u8, u32, u32)>,
) -> ServiceResult<Response> {
    let payload = state.tiles()?.tile(z, x, y).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(payload.content_type));
    if let Some(encoding) = payload.content_encoding {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    Ok((headers, payload.data).into_response())
}

/// GET /churches?page&limit&search - paginated, searchable listing.
pub async fn churches(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ServiceResult<Response> {
    let catalog = state.catalog()?;
    let page = positive_or(query.get("page"), 1);
    let limit = positive_or(query.get("limit"), DEFAULT_LIMIT);
    let search = query.get("search").map(String::as_str).unwrap_or("");

    Ok(Json(catalog.list(page, limit, search)).into_response())
}

/// GET /filter?title&country&type&address&rite&jurisdiction -
/// conjunctive filter over the catalog, first window only.
pub async fn filter(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ServiceResult<Response> {
    let catalog = state.catalog()?;
    let params = FilterParams::from_query(&query);
    Ok(Json(catalog.filter(&params)).into_response())
}

/// Pagination parameters from map clients may be partial or garbled;
/// anything unparseable or non-positive falls back to the default
/// rather than failing the request.
fn positive_or(value: Option<&String>, default: usize) -> usize {
    value
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
