//! Replication Module Tests
//!
//! ## Test Scopes
//! - **Protocol**: Origin tag parsing, operation encoding, inbound body decoding.
//! - **PeerClient**: Push acknowledgements and failure reporting against throwaway servers.
//! - **Replicator / Forwarder**: Fan-out accounting and verbatim relaying.

#[cfg(test)]
mod tests {
    use crate::replication::client::{PeerClient, Relayed};
    use crate::replication::primary::{ReplicationReport, Replicator};
    use crate::replication::protocol::*;
    use crate::replication::replica::{Forwarder, ReplicaPath};
    use crate::storage::types::{MemoDraft, MemoPatch};

    use axum::body::Bytes;
    use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE, VARY};
    use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
    use axum::response::IntoResponse;
    use axum::Router;
    use parking_lot::Mutex;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        path: String,
        from_primary: Option<String>,
        body: String,
    }

    type Log = Arc<Mutex<Vec<Seen>>>;

    /// Starts a server answering every request with `status` and `body`, recording what it got.
    async fn spawn_peer(status: StatusCode, body: &'static str) -> (SocketAddr, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let recorded = log.clone();

        let app = Router::new().fallback(
            move |method: Method, uri: axum::http::Uri, headers: HeaderMap, payload: Bytes| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().push(Seen {
                        method,
                        path: uri.to_string(),
                        from_primary: headers
                            .get(HEADER_FROM_PRIMARY)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                        body: String::from_utf8_lossy(&payload).into_owned(),
                    });
                    (status, [(CONTENT_TYPE, "application/json")], body)
                }
            },
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, log)
    }

    fn unreachable_addr() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    fn client() -> PeerClient {
        PeerClient::new(Duration::from_secs(2))
    }

    // ============================================================
    // ORIGIN TAG
    // ============================================================

    #[test]
    fn test_origin_defaults_to_client() {
        assert_eq!(Origin::from_headers(&HeaderMap::new()), Origin::Client);
    }

    #[test]
    fn test_origin_parses_primary_tag() {
        for value in ["true", "TRUE", " True "] {
            let mut headers = HeaderMap::new();
            headers.insert(HEADER_FROM_PRIMARY, HeaderValue::from_str(value).unwrap());
            assert_eq!(Origin::from_headers(&headers), Origin::Primary, "value {:?}", value);
        }

        let mut headers = HeaderMap::new();
        headers.insert(HEADER_FROM_PRIMARY, HeaderValue::from_static("false"));
        assert_eq!(Origin::from_headers(&headers), Origin::Client);
    }

    #[test]
    fn test_replica_path_follows_origin() {
        assert_eq!(ReplicaPath::from(Origin::Primary), ReplicaPath::ApplyLocal);
        assert_eq!(ReplicaPath::from(Origin::Client), ReplicaPath::ForwardUpstream);
    }

    // ============================================================
    // OPERATION ENCODING
    // ============================================================

    #[test]
    fn test_pushed_create_carries_assigned_id() {
        let op = WriteOp::Create { id: Some(3), draft: MemoDraft::new("t", "b") };

        assert_eq!(op.method(), Method::POST);
        assert_eq!(op.path(), "/note");
        assert_eq!(
            op.body().unwrap(),
            serde_json::json!({"id": 3, "title": "t", "body": "b"})
        );
    }

    #[test]
    fn test_client_create_omits_id() {
        let op = WriteOp::Create { id: None, draft: MemoDraft::new("t", "b") };
        assert_eq!(op.body().unwrap(), serde_json::json!({"title": "t", "body": "b"}));
    }

    #[test]
    fn test_partial_update_sends_only_present_fields() {
        let op = WriteOp::PartialUpdate {
            id: 4,
            patch: MemoPatch { title: None, body: Some(String::new()) },
        };

        assert_eq!(op.method(), Method::PATCH);
        assert_eq!(op.path(), "/note/4");
        assert_eq!(op.body().unwrap(), serde_json::json!({"body": ""}));
    }

    #[test]
    fn test_delete_has_no_body() {
        let op = WriteOp::Delete { id: 9 };
        assert_eq!(op.method(), Method::DELETE);
        assert_eq!(op.id(), Some(9));
        assert!(op.body().is_none());
    }

    #[test]
    fn test_peer_url_with_and_without_scheme() {
        assert_eq!(peer_url("127.0.0.1:8081", "/note/1"), "http://127.0.0.1:8081/note/1");
        assert_eq!(peer_url("http://node2:8081/", "/note"), "http://node2:8081/note");
        assert_eq!(peer_url("https://node2", "/note"), "https://node2/note");
    }

    // ============================================================
    // INBOUND DECODING
    // ============================================================

    fn inbound(method: Method, id: Option<u64>, body: &'static str) -> InboundWrite {
        InboundWrite {
            method,
            path_and_query: "/note".to_string(),
            id,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_decode_create() {
        let op = inbound(Method::POST, None, r#"{"title":"t1","body":"b1"}"#).decode().unwrap();
        assert_eq!(op, WriteOp::Create { id: None, draft: MemoDraft::new("t1", "b1") });
    }

    #[test]
    fn test_decode_rejects_malformed_and_incomplete_bodies() {
        assert!(inbound(Method::POST, None, "{not json").decode().is_err());
        assert!(inbound(Method::POST, None, r#"{"title":"only"}"#).decode().is_err());
        assert!(inbound(Method::PUT, Some(1), r#"{"body":"only"}"#).decode().is_err());
        assert!(inbound(Method::PATCH, Some(1), r#"{"title":5}"#).decode().is_err());
    }

    #[test]
    fn test_decode_patch_keeps_field_presence() {
        let op = inbound(Method::PATCH, Some(2), r#"{"title":""}"#).decode().unwrap();
        assert_eq!(
            op,
            WriteOp::PartialUpdate {
                id: 2,
                patch: MemoPatch { title: Some(String::new()), body: None },
            }
        );
    }

    #[test]
    fn test_decode_item_write_without_id() {
        assert!(inbound(Method::DELETE, None, "").decode().is_err());
        assert_eq!(
            inbound(Method::DELETE, Some(5), "").decode().unwrap(),
            WriteOp::Delete { id: 5 }
        );
    }

    // ============================================================
    // PEER CLIENT
    // ============================================================

    #[tokio::test]
    async fn test_propagate_tags_request_and_reads_ack() {
        let (addr, log) =
            spawn_peer(StatusCode::CREATED, r#"{"success":true,"message":"created memo 1"}"#).await;

        let op = WriteOp::Create { id: Some(1), draft: MemoDraft::new("t1", "b1") };
        let ack = client().propagate(&addr.to_string(), &op).await.unwrap();

        assert_eq!(ack, Ack::ok("created memo 1"));

        let seen = log.lock().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].path, "/note");
        assert_eq!(seen[0].from_primary.as_deref(), Some("true"));
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body, serde_json::json!({"id": 1, "title": "t1", "body": "b1"}));
    }

    #[tokio::test]
    async fn test_propagate_fails_on_error_status() {
        let (addr, _log) =
            spawn_peer(StatusCode::NOT_FOUND, r#"{"success":false,"message":"Memo not found"}"#).await;

        let result = client()
            .propagate(&addr.to_string(), &WriteOp::Delete { id: 3 })
            .await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("404"), "unexpected error: {}", err);
        assert!(err.contains("Memo not found"), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_propagate_fails_on_negative_or_garbled_ack() {
        let (negative, _) = spawn_peer(StatusCode::OK, r#"{"success":false,"message":"nope"}"#).await;
        let (garbled, _) = spawn_peer(StatusCode::OK, "not an ack").await;
        let op = WriteOp::Delete { id: 1 };

        assert!(client().propagate(&negative.to_string(), &op).await.is_err());
        assert!(client().propagate(&garbled.to_string(), &op).await.is_err());
    }

    #[tokio::test]
    async fn test_propagate_fails_when_unreachable() {
        let op = WriteOp::Delete { id: 1 };
        assert!(client().propagate(&unreachable_addr().to_string(), &op).await.is_err());
    }

    // ============================================================
    // REPLICATOR
    // ============================================================

    #[tokio::test]
    async fn test_replicator_counts_each_replica() {
        let (healthy, log) = spawn_peer(StatusCode::OK, r#"{"success":true,"message":"ok"}"#).await;
        let replicator = Replicator::new(
            client(),
            vec![unreachable_addr().to_string(), healthy.to_string()],
            true,
        );

        let report = replicator.replicate(&WriteOp::Delete { id: 1 }).await;

        assert_eq!(report, ReplicationReport { acknowledged: 1, failed: 1 });
        assert!(!report.is_complete());
        assert_eq!(log.lock().len(), 1, "A dead replica must not stop the next one");
    }

    #[tokio::test]
    async fn test_replicator_disabled_sends_nothing() {
        let (addr, log) = spawn_peer(StatusCode::OK, r#"{"success":true,"message":"ok"}"#).await;
        let replicator = Replicator::new(client(), vec![addr.to_string()], false);

        let report = replicator.replicate(&WriteOp::Delete { id: 1 }).await;

        assert_eq!(report, ReplicationReport::default());
        assert!(log.lock().is_empty());
    }

    // ============================================================
    // FORWARDER
    // ============================================================

    #[tokio::test]
    async fn test_forwarder_relays_primary_answer_verbatim() {
        let (addr, log) =
            spawn_peer(StatusCode::NOT_FOUND, r#"{"error":"Memo not found"}"#).await;
        let forwarder = Forwarder::new(client(), addr.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let relayed = forwarder
            .forward(
                Method::PATCH,
                "/note/7",
                &headers,
                Bytes::from_static(br#"{"body":"x"}"#),
            )
            .await
            .unwrap();

        assert_eq!(relayed.status, StatusCode::NOT_FOUND);
        assert_eq!(&relayed.body[..], br#"{"error":"Memo not found"}"#);
        assert_eq!(relayed.headers.get(CONTENT_TYPE).unwrap(), "application/json");

        let seen = log.lock().clone();
        assert_eq!(seen[0].method, Method::PATCH);
        assert_eq!(seen[0].path, "/note/7");
        assert_eq!(seen[0].body, r#"{"body":"x"}"#);
        assert_eq!(seen[0].from_primary, None, "Forwarded writes must not carry the origin tag");
    }

    #[tokio::test]
    async fn test_forwarder_reports_unreachable_primary() {
        let forwarder = Forwarder::new(client(), unreachable_addr().to_string());

        let result = forwarder
            .forward(Method::DELETE, "/note/1", &HeaderMap::new(), Bytes::new())
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_relayed_keeps_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.append(VARY, HeaderValue::from_static("accept"));
        headers.append(VARY, HeaderValue::from_static("origin"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("999"));

        let response = Relayed {
            status: StatusCode::CREATED,
            headers,
            body: Bytes::from_static(b"ok"),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        let vary: Vec<_> = response.headers().get_all(VARY).iter().collect();
        assert_eq!(vary, vec!["accept", "origin"]);
        assert!(response.headers().get(CONTENT_LENGTH).is_none(), "Stale framing must not be relayed");
    }

    #[test]
    fn test_relayed_adds_no_content_type() {
        let response = Relayed {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_https_peer_fails_at_connect_not_at_build() {
        let addr = format!("https://{}", unreachable_addr());

        let err = client()
            .propagate(&addr, &WriteOp::Delete { id: 1 })
            .await
            .unwrap_err();

        let err = err
            .downcast_ref::<reqwest::Error>()
            .expect("transport error from reqwest");
        assert!(!err.is_builder(), "https peers must be supported: {}", err);
        assert!(err.is_connect(), "unexpected error: {}", err);
    }
}
