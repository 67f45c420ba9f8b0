use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::response::Response;

use crate::cache::KvStore;
use crate::error::NodeError;
use crate::ring::HashRing;

use super::protocol::{DEFAULT_PORT, FORWARDED_FOR};

/// Canonical `host:port` form of an address for owner comparison.
///
/// Strips an `http://`/`https://` scheme, keeps an existing port, and
/// appends `default_port` otherwise. Owner equality is decided on the
/// normalized strings, never on the raw registry values.
pub fn normalize_host_port(addr: &str, default_port: &str) -> String {
    let addr = addr
        .strip_prefix("http://")
        .or_else(|| addr.strip_prefix("https://"))
        .unwrap_or(addr);

    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => addr.to_string(),
        _ => format!("{}:{}", addr, default_port),
    }
}

/// One cache node: the local store, the shared ring, and the client used to
/// reach peers.
pub struct CacheNode {
    pub id: String,
    pub addr: String,
    pub store: Arc<KvStore>,
    pub ring: Arc<HashRing>,
    /// Carried and reported; writes are not fanned out yet.
    pub replication_factor: usize,
    http: reqwest::Client,
}

impl CacheNode {
    pub fn new(
        id: String,
        addr: String,
        store: Arc<KvStore>,
        ring: Arc<HashRing>,
        replication_factor: usize,
        http: reqwest::Client,
    ) -> Self {
        Self {
            id,
            addr,
            store,
            ring,
            replication_factor,
            http,
        }
    }

    pub fn self_host_port(&self) -> String {
        normalize_host_port(&self.addr, DEFAULT_PORT)
    }

    /// Resolves the normalized owner address for `key` alongside this node's
    /// own normalized address.
    pub fn owner_for_key(&self, key: &str) -> Result<(String, String), NodeError> {
        let owner_id = self.ring.lookup(key.as_bytes());
        if owner_id.is_empty() {
            return Err(NodeError::NoOwner);
        }
        let owner_addr = match self.ring.addr(&owner_id) {
            Some(addr) if !addr.is_empty() => addr,
            _ => return Err(NodeError::NoOwner),
        };
        Ok((
            normalize_host_port(&owner_addr, DEFAULT_PORT),
            self.self_host_port(),
        ))
    }

    /// Proxies `req` unchanged to the owner and streams the response back.
    ///
    /// The request body is streamed rather than buffered, headers are cloned
    /// (minus hop-specific ones the client recomputes), and the original
    /// caller's address travels in `X-Forwarded-For`. Forwards are one hop:
    /// an owner that normalizes back to this node is refused with an error
    /// rather than looping.
    pub async fn forward(
        &self,
        owner: &str,
        client_addr: Option<SocketAddr>,
        req: Request,
    ) -> Result<Response, NodeError> {
        if owner == self.self_host_port() {
            return Err(NodeError::ForwardLoop);
        }

        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let url = format!("http://{}{}", owner, path_and_query);
        let method = req.method().clone();

        let mut headers = req.headers().clone();
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        if let Some(peer) = client_addr {
            if let Ok(value) = HeaderValue::try_from(peer.to_string()) {
                headers.insert(FORWARDED_FOR, value);
            }
        }

        let body = reqwest::Body::wrap_stream(req.into_body().into_data_stream());
        let upstream = self
            .http
            .request(method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    NodeError::UpstreamTimeout(err.to_string())
                } else {
                    NodeError::Upstream(err.to_string())
                }
            })?;

        let mut response = Response::builder().status(upstream.status());
        if let Some(dst) = response.headers_mut() {
            for (name, value) in upstream.headers() {
                dst.append(name.clone(), value.clone());
            }
        }
        response
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|err| NodeError::Upstream(err.to_string()))
    }

    /// Applies a full peer snapshot to the ring as a diff.
    ///
    /// Departed ids are removed first, new ids added after; ids present on
    /// both sides are left untouched so their token placements survive.
    /// Redundant snapshots therefore reduce to no-ops.
    pub fn apply_peers(&self, peers: &HashMap<String, String>) {
        let current = self.ring.nodes();

        for id in current.keys() {
            if !peers.contains_key(id) {
                tracing::info!("peer {} left the cluster, removing from ring", id);
                self.ring.remove(id);
            }
        }

        for (id, addr) in peers {
            if !current.contains_key(id) {
                let normalized = normalize_host_port(addr, DEFAULT_PORT);
                tracing::info!("peer {} joined the cluster at {}", id, normalized);
                self.ring.add(id, &normalized);
            }
        }
    }
}
