//! Node HTTP Surface
//!
//! Handlers for the key endpoints and the observational endpoints, plus the
//! router wiring them together. The key handler owns the local-vs-forward
//! decision; everything else reads node state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use sysinfo::System;

use crate::error::NodeError;
use crate::telemetry::{track_request, Metrics};

use super::node::CacheNode;
use super::protocol::{InfoResponse, StatsResponse, KV_PREFIX};

/// Builds the node's router. Every request passes through the telemetry
/// middleware; node and metrics handles travel as extensions.
pub fn create_router(node: Arc<CacheNode>, metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/healthz", get(handle_healthz))
        .route("/info", get(handle_info))
        .route("/stats", get(handle_stats))
        .route("/metrics", get(handle_metrics))
        .route("/kv/*key", any(handle_kv))
        .layer(middleware::from_fn(track_request))
        .layer(Extension(node))
        .layer(Extension(metrics))
}

/// Liveness probe.
async fn handle_healthz() -> &'static str {
    "ok"
}

/// Process id, server time, and local item count.
async fn handle_info(Extension(node): Extension<Arc<CacheNode>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        pid: std::process::id(),
        now: chrono::Utc::now().to_rfc3339(),
        items: node.store.len(),
    })
}

/// Node diagnostics: ring membership, store occupancy, process resources.
async fn handle_stats(Extension(node): Extension<Arc<CacheNode>>) -> Json<StatsResponse> {
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    // sysinfo reports memory in bytes.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(StatsResponse {
        node_id: node.id.clone(),
        addr: node.addr.clone(),
        peers: node.ring.len(),
        replication_factor: node.replication_factor,
        store_items: node.store.len(),
        store_used_bytes: node.store.used_bytes(),
        store_capacity_bytes: node.store.capacity_bytes(),
        cpu_usage: sys.global_cpu_info().cpu_usage(),
        mem_used_mb,
        mem_total_mb,
    })
}

/// Prometheus text exposition.
async fn handle_metrics(Extension(metrics): Extension<Arc<Metrics>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
        .into_response()
}

/// Key endpoint dispatcher.
///
/// Resolves the owner for the key and either serves from the local store or
/// proxies the whole request to the owner. A request arriving on a non-owner
/// that has just lost ownership is still served locally by the receiving
/// node; forwards never chain.
async fn handle_kv(
    Extension(node): Extension<Arc<CacheNode>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
) -> Result<Response, NodeError> {
    let method = req.method().clone();
    match method {
        Method::GET | Method::PUT | Method::POST | Method::DELETE => {}
        _ => return Err(NodeError::MethodNotAllowed),
    }

    let key = req
        .uri()
        .path()
        .strip_prefix(KV_PREFIX)
        .unwrap_or_default()
        .to_string();

    let (owner, self_hp) = node.owner_for_key(&key)?;
    if owner != self_hp {
        tracing::info!(
            "forward {} key={:?} owner={} self={}",
            method,
            key,
            owner,
            self_hp
        );
        let client_addr = connect_info.map(|ConnectInfo(addr)| addr);
        return node.forward(&owner, client_addr, req).await;
    }

    match method {
        Method::GET => handle_local_get(&node, &key),
        Method::PUT | Method::POST => handle_local_put(&node, &key, req).await,
        Method::DELETE => {
            node.store.delete(&key);
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        _ => Err(NodeError::MethodNotAllowed),
    }
}

fn handle_local_get(node: &CacheNode, key: &str) -> Result<Response, NodeError> {
    match node.store.get(key) {
        Some(value) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            value,
        )
            .into_response()),
        None => Err(NodeError::NotFound),
    }
}

async fn handle_local_put(
    node: &CacheNode,
    key: &str,
    req: Request,
) -> Result<Response, NodeError> {
    let ttl = parse_ttl(req.uri().query())?;
    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|err| NodeError::BodyRead(err.to_string()))?;

    node.store.put(key, &body, ttl);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Extracts `ttl=<seconds>` from the raw query string. Absent means no
/// expiry; present-but-unparseable is a client error.
fn parse_ttl(query: Option<&str>) -> Result<Option<Duration>, NodeError> {
    let Some(query) = query else {
        return Ok(None);
    };
    for pair in query.split('&') {
        if let Some(raw) = pair.strip_prefix("ttl=") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| NodeError::InvalidTtl(raw.to_string()))?;
            return Ok(Some(Duration::from_secs(secs)));
        }
    }
    Ok(None)
}
