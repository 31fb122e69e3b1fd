use super::client::{PeerClient, Relayed};
use super::protocol::Origin;

use anyhow::Result;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method};

/// What a replica does with an inbound write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaPath {
    /// Pushed by the primary: apply to the local table and acknowledge.
    ApplyLocal,
    /// From a client: relay to the primary and do not touch the local table.
    ForwardUpstream,
}

impl From<Origin> for ReplicaPath {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Primary => ReplicaPath::ApplyLocal,
            Origin::Client => ReplicaPath::ForwardUpstream,
        }
    }
}

/// Replica-side relay of client writes to the primary.
pub struct Forwarder {
    client: PeerClient,
    primary: String,
}

impl Forwarder {
    pub fn new(client: PeerClient, primary: String) -> Self {
        Self { client, primary }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Sends the write upstream and returns the primary's answer untouched.
    ///
    /// The local table is updated later by the primary's own push.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Relayed> {
        tracing::info!("Forwarding {} {} to primary {}", method, path_and_query, self.primary);

        let relayed = self
            .client
            .forward(&self.primary, method.clone(), path_and_query, headers, body)
            .await?;

        tracing::info!(
            "Primary answered {} to forwarded {} {}",
            relayed.status,
            method,
            path_and_query
        );
        Ok(relayed)
    }
}
