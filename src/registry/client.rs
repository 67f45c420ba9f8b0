use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::types::{
    KeyValue, LeaseGrantRequest, LeaseGrantResponse, LeaseKeepAliveRequest, LeaseRevokeRequest,
    PutRequest, RangeRequest, RangeResponse,
};

/// How many peer snapshots may queue between the watcher and the applier.
const SNAPSHOT_BUFFER: usize = 8;

/// Client for the registry's v3 JSON gateway.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    endpoint: String,
    prefix: String,
}

impl RegistryClient {
    pub fn new(http: reqwest::Client, endpoint: &str, prefix: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
        }
    }

    /// Publishes `addr` under `{prefix}{id}` bound to a fresh lease and keeps
    /// the lease alive in the background until the handle is revoked.
    pub async fn register(
        &self,
        id: &str,
        addr: &str,
        ttl_secs: i64,
    ) -> Result<RegistrationHandle> {
        let lease_id = self.grant_lease(ttl_secs).await?;
        let key = format!("{}{}", self.prefix, id);
        self.put_with_lease(&key, addr, &lease_id).await?;
        tracing::info!("registered {} -> {} under lease {}", key, addr, lease_id);

        let keepalive = {
            let client = self.clone();
            let lease = lease_id.clone();
            // Renew well inside the TTL window, with jitter so a fleet of
            // nodes does not renew in lockstep.
            let base = Duration::from_secs((ttl_secs as u64 / 3).max(1));
            tokio::spawn(async move {
                loop {
                    let jitter = Duration::from_millis(rand::random::<u64>() % 250);
                    tokio::time::sleep(base + jitter).await;
                    if let Err(err) = client.keep_alive(&lease).await {
                        tracing::warn!("lease {} keep-alive failed: {}", lease, err);
                    }
                }
            })
        };

        Ok(RegistrationHandle {
            lease_id,
            client: self.clone(),
            keepalive,
        })
    }

    /// Spawns the peer watcher and returns the snapshot stream.
    ///
    /// The first snapshot arrives immediately; afterwards a new one is sent
    /// whenever the registry view changes. The channel is bounded and sends
    /// never block: a snapshot the applier has no room for is dropped, and a
    /// fresher one follows on the next poll.
    pub fn watch_peers(&self, poll_interval: Duration) -> mpsc::Receiver<HashMap<String, String>> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let client = self.clone();

        tokio::spawn(async move {
            let mut last: Option<HashMap<String, String>> = None;
            loop {
                match client.fetch_peers().await {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            match tx.try_send(snapshot.clone()) {
                                Ok(()) => last = Some(snapshot),
                                Err(mpsc::error::TrySendError::Closed(_)) => break,
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    tracing::warn!("peer applier lagging, dropping snapshot");
                                }
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!("peer watch poll failed: {}", err);
                    }
                }
                tokio::time::sleep(poll_interval).await;
            }
            tracing::info!("peer watch stopped");
        });

        rx
    }

    /// Reads every key under the prefix and decodes it into `id -> addr`.
    pub async fn fetch_peers(&self) -> Result<HashMap<String, String>> {
        let request = RangeRequest {
            key: BASE64.encode(self.prefix.as_bytes()),
            range_end: BASE64.encode(prefix_range_end(&self.prefix)),
        };
        let response: RangeResponse = self
            .http
            .post(format!("{}/v3/kv/range", self.endpoint))
            .json(&request)
            .send()
            .await
            .context("registry range request failed")?
            .error_for_status()?
            .json()
            .await
            .context("registry range response malformed")?;

        Ok(decode_peers(&self.prefix, &response.kvs))
    }

    async fn grant_lease(&self, ttl_secs: i64) -> Result<String> {
        let response: LeaseGrantResponse = self
            .http
            .post(format!("{}/v3/lease/grant", self.endpoint))
            .json(&LeaseGrantRequest { ttl: ttl_secs })
            .send()
            .await
            .context("lease grant request failed")?
            .error_for_status()?
            .json()
            .await
            .context("lease grant response malformed")?;
        Ok(response.id)
    }

    async fn put_with_lease(&self, key: &str, value: &str, lease_id: &str) -> Result<()> {
        self.http
            .post(format!("{}/v3/kv/put", self.endpoint))
            .json(&PutRequest {
                key: BASE64.encode(key.as_bytes()),
                value: BASE64.encode(value.as_bytes()),
                lease: Some(lease_id.to_string()),
            })
            .send()
            .await
            .context("registry put request failed")?
            .error_for_status()?;
        Ok(())
    }

    async fn keep_alive(&self, lease_id: &str) -> Result<()> {
        self.http
            .post(format!("{}/v3/lease/keepalive", self.endpoint))
            .json(&LeaseKeepAliveRequest {
                id: lease_id.to_string(),
            })
            .send()
            .await
            .context("lease keep-alive request failed")?
            .error_for_status()?;
        Ok(())
    }

    async fn revoke_lease(&self, lease_id: &str) -> Result<()> {
        self.http
            .post(format!("{}/v3/lease/revoke", self.endpoint))
            .json(&LeaseRevokeRequest {
                id: lease_id.to_string(),
            })
            .send()
            .await
            .context("lease revoke request failed")?
            .error_for_status()?;
        Ok(())
    }
}

/// A live registration. Revoking it stops the keep-alive task and deletes
/// the published key by revoking its lease, which takes the node out of
/// every peer's view before its HTTP surface goes away.
pub struct RegistrationHandle {
    lease_id: String,
    client: RegistryClient,
    keepalive: JoinHandle<()>,
}

impl RegistrationHandle {
    pub fn lease_id(&self) -> &str {
        &self.lease_id
    }

    pub async fn revoke(self) {
        self.keepalive.abort();
        match self.client.revoke_lease(&self.lease_id).await {
            Ok(()) => tracing::info!("lease {} revoked", self.lease_id),
            Err(err) => tracing::warn!("lease {} revoke failed: {}", self.lease_id, err),
        }
    }
}

/// Exclusive upper bound of the key range sharing `prefix`: the prefix with
/// its last byte incremented (dropping trailing 0xff bytes first).
fn prefix_range_end(prefix: &str) -> Vec<u8> {
    let mut end = prefix.as_bytes().to_vec();
    while let Some(&last) = end.last() {
        if last < 0xff {
            *end.last_mut().unwrap() = last + 1;
            return end;
        }
        end.pop();
    }
    // Prefix was empty or all 0xff: scan from the zero key.
    vec![0]
}

fn decode_peers(prefix: &str, kvs: &[KeyValue]) -> HashMap<String, String> {
    let mut peers = HashMap::new();
    for kv in kvs {
        let key = match BASE64.decode(&kv.key).map(String::from_utf8) {
            Ok(Ok(key)) => key,
            _ => {
                tracing::warn!("skipping undecodable registry key");
                continue;
            }
        };
        let value = match BASE64.decode(&kv.value).map(String::from_utf8) {
            Ok(Ok(value)) => value,
            _ => {
                tracing::warn!("skipping undecodable registry value for {}", key);
                continue;
            }
        };
        if let Some(id) = key.strip_prefix(prefix) {
            if !id.is_empty() {
                peers.insert(id.to_string(), value);
            }
        }
    }
    peers
}
