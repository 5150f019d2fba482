use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use quarry_core::search::{SearchResponse, Searcher};

#[derive(Clone)]
pub struct AppState {
    pub searcher: Arc<dyn Searcher>,
}

/// Builds the full router: the versioned search API, the UI entry point at
/// `/`, and static assets under `/static`. CORS is wide open and preflight
/// requests are answered before they reach any handler.
pub fn build_app(searcher: Arc<dyn Searcher>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/search", get(search_handler))
        .with_state(AppState { searcher });

    Router::new()
        .nest("/api/v1", api)
        .route_service("/", ServeFile::new("ui/index.html"))
        .nest_service("/static", ServeDir::new("ui"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    // Params are taken raw so a missing value and a malformed one can be
    // reported separately.
    let query = require_param(&params, "q")?;
    let page = parse_param(&params, "page")?;
    let limit = parse_param(&params, "limit")?;

    match state.searcher.search(query, page, limit).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            tracing::error!(error = %err, "search failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ))
        }
    }
}

fn require_param<'a>(
    params: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, (StatusCode, String)> {
    params.get(name).map(String::as_str).ok_or((
        StatusCode::BAD_REQUEST,
        format!("query parameter '{name}' is missing"),
    ))
}

fn parse_param(
    params: &HashMap<String, String>,
    name: &str,
) -> Result<i64, (StatusCode, String)> {
    require_param(params, name)?.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("query parameter '{name}' must be an integer"),
        )
    })
}
