use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::id::ModuleId;
use crate::server::AppState;
use crate::Error;

#[derive(Deserialize)]
pub struct ModuleParams {
    pub id: String,
    pub include_self: Option<bool>,
}

#[derive(Deserialize)]
pub struct ResolveParams {
    pub module: String,
    pub symbol: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type RouteResult = Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)>;

fn bad_request(error: impl ToString) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn map_error(error: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        Error::UnknownModule(_) => StatusCode::NOT_FOUND,
        Error::InvalidId(_) | Error::Manifest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn parse_id(raw: &str) -> Result<ModuleId, (StatusCode, Json<ErrorResponse>)> {
    ModuleId::parse(raw).map_err(bad_request)
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> RouteResult {
    let host = state.host.read().await;
    let stats = host.stats();
    Ok(Json(serde_json::to_value(&stats).map_err(bad_request)?))
}

pub async fn list_modules(State(state): State<Arc<AppState>>) -> RouteResult {
    let host = state.host.read().await;
    let modules: Vec<serde_json::Value> = host
        .modules()
        .map(|id| {
            let version = host
                .manifest(id)
                .map(|m| m.version.clone())
                .unwrap_or_default();
            serde_json::json!({
                "id": id,
                "version": version,
                "enabled": host.is_enabled(id),
            })
        })
        .collect();
    Ok(Json(serde_json::Value::Array(modules)))
}

pub async fn get_module(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModuleParams>,
) -> RouteResult {
    let id = parse_id(&params.id)?;
    let host = state.host.read().await;
    let manifest = host
        .manifest(&id)
        .ok_or_else(|| map_error(Error::UnknownModule(id.clone())))?;
    let edges = host.graph().edges_from(&id);
    Ok(Json(serde_json::json!({
        "manifest": manifest,
        "enabled": host.is_enabled(&id),
        "edges": edges,
    })))
}

pub async fn get_dependencies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModuleParams>,
) -> RouteResult {
    let id = parse_id(&params.id)?;
    let include_self = params.include_self.unwrap_or(false);
    let host = state.host.read().await;
    let deps = host
        .graph()
        .transitive_dependencies(&id, include_self)
        .map_err(map_error)?;
    Ok(Json(serde_json::to_value(&deps).map_err(bad_request)?))
}

pub async fn get_dependents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModuleParams>,
) -> RouteResult {
    let id = parse_id(&params.id)?;
    let include_self = params.include_self.unwrap_or(false);
    let host = state.host.read().await;
    let deps = host
        .graph()
        .transitive_dependents(&id, include_self)
        .map_err(map_error)?;
    Ok(Json(serde_json::to_value(&deps).map_err(bad_request)?))
}

pub async fn resolve_symbol(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveParams>,
) -> RouteResult {
    let id = parse_id(&params.module)?;
    let host = state.host.read().await;
    let resolution = host.resolve(&id, &params.symbol).map_err(map_error)?;
    match resolution.found() {
        Some(export) => Ok(Json(serde_json::json!({
            "found": true,
            "export": export,
        }))),
        None => Ok(Json(serde_json::json!({ "found": false }))),
    }
}

pub async fn get_order(State(state): State<Arc<AppState>>) -> RouteResult {
    let host = state.host.read().await;
    let order = host.graph().load_order();
    Ok(Json(serde_json::to_value(&order).map_err(bad_request)?))
}

pub async fn validate_module(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModuleParams>,
) -> RouteResult {
    let id = parse_id(&params.id)?;
    let mut host = state.host.write().await;
    let validation = host.validate(&id).map_err(map_error)?;
    Ok(Json(serde_json::to_value(&validation).map_err(bad_request)?))
}
