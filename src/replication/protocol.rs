//! Replication Network Protocol
//!
//! Defines the endpoints, the origin tag and the Data Transfer Objects exchanged
//! between clients, the primary and its replicas.
//!
//! Primary-to-replica pushes and replica-to-primary forwards reuse the public
//! `/note` paths. The only thing telling them apart on the wire is the
//! `From-Primary: true` header, which is turned into an [`Origin`] as soon as a
//! request enters a node.

use crate::storage::types::{MemoDraft, MemoPatch};

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Collection endpoint (list, create).
pub const ENDPOINT_NOTES: &str = "/note";

/// Header set only on writes pushed by the primary.
pub const HEADER_FROM_PRIMARY: &str = "from-primary";

// --- Origin Discriminator ---

/// Who issued a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Pushed down by the primary after it committed the write. Apply directly.
    Primary,
    /// Anyone else. A replica must forward it upstream.
    Client,
}

impl Origin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let tagged = headers
            .get(HEADER_FROM_PRIMARY)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if tagged { Origin::Primary } else { Origin::Client }
    }
}

// --- Write Operations ---

/// A single mutation of a memo table, independent of how it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// `id` is only set when the primary pushes an id it already assigned.
    Create { id: Option<u64>, draft: MemoDraft },
    Update { id: u64, draft: MemoDraft },
    PartialUpdate { id: u64, patch: MemoPatch },
    Delete { id: u64 },
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            WriteOp::Create { .. } => "create",
            WriteOp::Update { .. } => "update",
            WriteOp::PartialUpdate { .. } => "partial-update",
            WriteOp::Delete { .. } => "delete",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            WriteOp::Create { .. } => Method::POST,
            WriteOp::Update { .. } => Method::PUT,
            WriteOp::PartialUpdate { .. } => Method::PATCH,
            WriteOp::Delete { .. } => Method::DELETE,
        }
    }

    /// Target memo id, if the operation addresses an existing memo.
    pub fn id(&self) -> Option<u64> {
        match self {
            WriteOp::Create { id, .. } => *id,
            WriteOp::Update { id, .. }
            | WriteOp::PartialUpdate { id, .. }
            | WriteOp::Delete { id } => Some(*id),
        }
    }

    pub fn path(&self) -> String {
        match self {
            WriteOp::Create { .. } => ENDPOINT_NOTES.to_string(),
            WriteOp::Update { id, .. }
            | WriteOp::PartialUpdate { id, .. }
            | WriteOp::Delete { id } => memo_path(*id),
        }
    }

    /// JSON body to send for this operation, `None` for deletes.
    pub fn body(&self) -> Option<serde_json::Value> {
        let value = match self {
            WriteOp::Create { id, draft } => serde_json::to_value(CreateRequest {
                id: *id,
                title: draft.title.clone(),
                body: draft.body.clone(),
            }),
            WriteOp::Update { draft, .. } => serde_json::to_value(draft),
            WriteOp::PartialUpdate { patch, .. } => serde_json::to_value(patch),
            WriteOp::Delete { .. } => return None,
        };
        // Plain structs of strings and integers always serialize.
        value.ok()
    }
}

/// A write together with the tag saying where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationEnvelope {
    pub op: WriteOp,
    pub origin: Origin,
}

pub fn memo_path(id: u64) -> String {
    format!("{}/{}", ENDPOINT_NOTES, id)
}

/// Builds a peer URL from a configured address, which may or may not carry a scheme.
pub fn peer_url(addr: &str, path_and_query: &str) -> String {
    let base = addr.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}{}", base, path_and_query)
    } else {
        format!("http://{}{}", base, path_and_query)
    }
}

// --- Data Transfer Objects ---

/// Body of `POST /note`.
///
/// Clients send only `title` and `body`. The primary adds the `id` it assigned
/// when pushing the create to its replicas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    pub body: String,
}

impl CreateRequest {
    pub fn into_draft(self) -> MemoDraft {
        MemoDraft {
            title: self.title,
            body: self.body,
        }
    }
}

/// Replica answer to a primary push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Body of a successful `DELETE /note/{id}`: `{"msg":"OK"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResponse {
    pub msg: String,
}

impl DeleteResponse {
    pub fn ok() -> Self {
        Self { msg: "OK".to_string() }
    }
}

/// Error body for every 4xx/5xx a node produces itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// --- Inbound Writes ---

/// A write request as it reached a node, before anything decided what to do with it.
///
/// The raw body is kept so a replica can forward it upstream byte for byte; it
/// is only decoded when the write is applied locally.
#[derive(Debug, Clone)]
pub struct InboundWrite {
    pub method: Method,
    pub path_and_query: String,
    /// Id from the path, for item routes.
    pub id: Option<u64>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundWrite {
    pub fn origin(&self) -> Origin {
        Origin::from_headers(&self.headers)
    }

    /// Decodes the body according to the method. The error is a client-facing message.
    pub fn decode(&self) -> Result<WriteOp, String> {
        let id = || self.id.ok_or_else(|| "Invalid ID".to_string());

        match self.method {
            Method::POST => {
                let request: CreateRequest = decode_json(&self.body)?;
                Ok(WriteOp::Create {
                    id: request.id,
                    draft: request.into_draft(),
                })
            }
            Method::PUT => Ok(WriteOp::Update {
                id: id()?,
                draft: decode_json(&self.body)?,
            }),
            Method::PATCH => Ok(WriteOp::PartialUpdate {
                id: id()?,
                patch: decode_json(&self.body)?,
            }),
            Method::DELETE => Ok(WriteOp::Delete { id: id()? }),
            ref other => Err(format!("Unsupported write method {}", other)),
        }
    }
}

fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, String> {
    serde_json::from_slice(body).map_err(|e| format!("Malformed body: {}", e))
}
