use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use distributed_cache::cache::KvStore;
use distributed_cache::config::Config;
use distributed_cache::registry::{RegistrationHandle, RegistryClient};
use distributed_cache::ring::HashRing;
use distributed_cache::routing::node::normalize_host_port;
use distributed_cache::routing::protocol::DEFAULT_PORT;
use distributed_cache::routing::{create_router, CacheNode};
use distributed_cache::telemetry::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "distributed_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "starting node {} at {} (cap={}B, replicas={}, rf={})",
        config.self_id,
        config.self_addr,
        config.capacity_bytes,
        config.ring_replicas,
        config.replication_factor
    );

    // 1. Store and ring. The ring is seeded with this node so keys resolve
    //    locally before discovery has converged.
    let store = Arc::new(KvStore::new(config.capacity_bytes));
    let ring = Arc::new(HashRing::new(config.ring_replicas));
    ring.add(
        &config.self_id,
        &normalize_host_port(&config.self_addr, DEFAULT_PORT),
    );

    // 2. Shared HTTP client, used for forwards and for the registry.
    let http = reqwest::Client::builder()
        .timeout(config.forward_timeout)
        .build()?;

    let node = Arc::new(CacheNode::new(
        config.self_id.clone(),
        config.self_addr.clone(),
        store,
        ring,
        config.replication_factor,
        http.clone(),
    ));
    let metrics = Arc::new(Metrics::new());

    // 3. Registry: publish this node, then apply peer snapshots as ring
    //    diffs from a single applier task. A missing registry degrades to a
    //    standalone node rather than failing startup.
    let registry = RegistryClient::new(http, &config.registry_endpoint, &config.registry_prefix);
    let registration = if config.registry_endpoint.is_empty() {
        info!("REGISTRY_ENDPOINT empty, running standalone");
        None
    } else {
        match registry
            .register(&config.self_id, &config.self_addr, config.lease_ttl_secs)
            .await
        {
            Ok(handle) => {
                let mut snapshots = registry.watch_peers(config.watch_interval);
                let applier_node = node.clone();
                let self_id = config.self_id.clone();
                let self_addr = config.self_addr.clone();
                tokio::spawn(async move {
                    while let Some(mut snapshot) = snapshots.recv().await {
                        // Keep ourselves on the ring even if our own
                        // registration has briefly lapsed.
                        snapshot
                            .entry(self_id.clone())
                            .or_insert_with(|| self_addr.clone());
                        applier_node.apply_peers(&snapshot);
                    }
                });
                Some(handle)
            }
            Err(err) => {
                warn!("registry unavailable, running standalone: {}", err);
                None
            }
        }
    };

    // 4. HTTP surface.
    let app = create_router(node, metrics);
    let listen_addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("listening on http://{}", listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(registration))
    .await?;

    info!("shutdown complete");
    Ok(())
}

/// Waits for SIGINT/SIGTERM, then revokes the registry lease *before* the
/// HTTP server drains, so peers stop routing to this node while it can still
/// answer in-flight forwards.
async fn shutdown_signal(registration: Option<RegistrationHandle>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("received SIGTERM, shutting down");
        }
    }

    if let Some(handle) = registration {
        handle.revoke().await;
    }
}
