//! Registry Gateway Protocol
//!
//! Request and response bodies for the registry's v3 JSON gateway. Keys and
//! values travel base64-encoded; lease ids are decimal strings because the
//! gateway renders 64-bit integers as JSON strings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct LeaseGrantRequest {
    /// Requested lease TTL in seconds.
    #[serde(rename = "TTL")]
    pub ttl: i64,
}

#[derive(Debug, Deserialize)]
pub struct LeaseGrantResponse {
    /// Granted lease id.
    #[serde(rename = "ID")]
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct PutRequest {
    /// Base64-encoded key.
    pub key: String,
    /// Base64-encoded value.
    pub value: String,
    /// Lease to attach, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RangeRequest {
    /// Base64-encoded start key (the prefix).
    pub key: String,
    /// Base64-encoded exclusive end key (prefix successor).
    pub range_end: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeResponse {
    #[serde(default)]
    pub kvs: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
pub struct KeyValue {
    /// Base64-encoded key.
    pub key: String,
    /// Base64-encoded value.
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct LeaseKeepAliveRequest {
    #[serde(rename = "ID")]
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct LeaseRevokeRequest {
    #[serde(rename = "ID")]
    pub id: String,
}
