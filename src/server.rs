use crate::config::ServerConfig;
use crate::render::ChoroplethMap;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub map: ChoroplethMap,
    pub png: Vec<u8>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct QueryResponse {
    pub iso3: Option<String>,
    pub name: Option<String>,
    pub count: u32,
}

pub fn router(map: ChoroplethMap) -> Result<Router> {
    let png = map.png_bytes()?;
    let state = Arc::new(AppState { map, png });

    Ok(Router::new()
        .route("/map.png", get(map_handler))
        .route("/api/counts", get(counts_handler))
        .route("/api/query", get(query_handler))
        .layer(CorsLayer::permissive())
        .with_state(state))
}

pub async fn start_server(config: &ServerConfig, map: ChoroplethMap) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let app = router(map)?;

    tracing::info!("Serving appeal map on http://{}/map.png", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn map_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        state.png.clone(),
    )
}

async fn counts_handler(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, u32>> {
    Json(state.map.counts.clone())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let found = state.map.lookup.find(params.lon, params.lat).map(|country| QueryResponse {
        iso3: country.shape.iso3.clone(),
        name: country.shape.name.clone(),
        count: country.count,
    });

    Json(found)
}
