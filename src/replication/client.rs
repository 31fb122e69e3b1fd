use super::protocol::{Ack, HEADER_FROM_PRIMARY, WriteOp, peer_url};

use anyhow::Result;
use axum::body::{Body, Bytes};
use axum::http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Duration;

/// The primary's answer to a forwarded write, relayed verbatim to the caller.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        for (name, value) in self.headers.iter() {
            // Framing is recomputed for the new connection.
            if name == CONTENT_LENGTH || name == TRANSFER_ENCODING || name == CONNECTION {
                continue;
            }
            response.headers_mut().append(name.clone(), value.clone());
        }
        response
    }
}

/// Outbound HTTP calls between nodes.
///
/// Covers both directions: primary pushes to replicas (`propagate`) and
/// replica forwards to the primary (`forward`). Every call is bounded by the
/// configured timeout and is attempted exactly once.
#[derive(Clone)]
pub struct PeerClient {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Pushes an already committed write to one replica, tagged as coming from the primary.
    ///
    /// Succeeds only on a 2xx status with an `Ack` body whose `success` is true.
    pub async fn propagate(&self, replica_addr: &str, op: &WriteOp) -> Result<Ack> {
        let url = peer_url(replica_addr, &op.path());

        let mut request = self
            .http_client
            .request(op.method(), url.clone())
            .header(HEADER_FROM_PRIMARY, "true")
            .timeout(self.timeout);
        if let Some(body) = op.body() {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let reason = serde_json::from_slice::<Ack>(&body)
                .map(|ack| ack.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(anyhow::anyhow!(
                "Replica {} answered {} to {}: {}",
                url,
                status,
                op.name(),
                reason
            ));
        }

        let ack: Ack = serde_json::from_slice(&body)
            .map_err(|e| anyhow::anyhow!("Undecodable ack from {}: {}", url, e))?;
        if !ack.success {
            return Err(anyhow::anyhow!("Replica {} refused {}: {}", url, op.name(), ack.message));
        }

        Ok(ack)
    }

    /// Re-issues a client write against the primary, without the origin tag.
    ///
    /// Any status the primary answers with, including 4xx/5xx, is a successful
    /// relay. Only transport failures are errors.
    pub async fn forward(
        &self,
        primary_addr: &str,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Relayed> {
        let url = peer_url(primary_addr, path_and_query);

        let mut request = self
            .http_client
            .request(method, url)
            .timeout(self.timeout);
        if let Some(content_type) = headers.get(CONTENT_TYPE) {
            request = request.header(CONTENT_TYPE, content_type.clone());
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(Relayed {
            status,
            headers,
            body,
        })
    }
}
