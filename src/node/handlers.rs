use super::service::{Applied, MemoNode, WriteOutcome};
use crate::replication::protocol::{Ack, DeleteResponse, ENDPOINT_NOTES, ErrorResponse, InboundWrite};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;

/// Builds the node's HTTP surface.
///
/// Both roles share the same handlers; only the verbs enabled by the node's
/// capabilities are wired.
pub fn router(node: Arc<MemoNode>) -> Router {
    let mut item = get(handle_get_memo)
        .patch(handle_write_memo)
        .delete(handle_write_memo);
    if node.config().capabilities.full_replace {
        item = item.put(handle_write_memo);
    }

    Router::new()
        .route(ENDPOINT_NOTES, get(handle_list_memos).post(handle_create_memo))
        .route(&format!("{}/{{id}}", ENDPOINT_NOTES), item)
        .layer(Extension(node))
}

pub async fn handle_list_memos(Extension(node): Extension<Arc<MemoNode>>) -> Response {
    let memos = node.list();
    tracing::debug!("{} serving list of {} memos", node.role(), memos.len());

    if memos.is_empty() {
        return error_response(StatusCode::NOT_FOUND, "No Data");
    }
    (StatusCode::OK, Json(memos)).into_response()
}

pub async fn handle_get_memo(
    Extension(node): Extension<Arc<MemoNode>>,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid ID");
    };

    match node.get(id) {
        Some(memo) => (StatusCode::OK, Json(memo)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Memo not found"),
    }
}

pub async fn handle_create_memo(
    Extension(node): Extension<Arc<MemoNode>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = InboundWrite {
        method: Method::POST,
        path_and_query: path_and_query(&uri),
        id: None,
        headers,
        body,
    };
    node.write(request).await.into_response()
}

/// `PUT`, `PATCH` and `DELETE` on a single memo.
pub async fn handle_write_memo(
    Extension(node): Extension<Arc<MemoNode>>,
    Path(raw_id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid ID");
    };

    let request = InboundWrite {
        method,
        path_and_query: path_and_query(&uri),
        id: Some(id),
        headers,
        body,
    };
    node.write(request).await.into_response()
}

impl IntoResponse for WriteOutcome {
    fn into_response(self) -> Response {
        match self {
            WriteOutcome::Committed(Applied::Created(memo)) => {
                (StatusCode::CREATED, Json(memo)).into_response()
            }
            WriteOutcome::Committed(Applied::Updated(memo)) => {
                (StatusCode::OK, Json(memo)).into_response()
            }
            WriteOutcome::Committed(Applied::Deleted(_)) => {
                (StatusCode::OK, Json(DeleteResponse::ok())).into_response()
            }
            WriteOutcome::Acknowledged(applied) => {
                let (status, message) = match &applied {
                    Applied::Created(memo) => (StatusCode::CREATED, format!("created memo {}", memo.id)),
                    Applied::Updated(memo) => (StatusCode::OK, format!("updated memo {}", memo.id)),
                    Applied::Deleted(id) => (StatusCode::OK, format!("deleted memo {}", id)),
                };
                (status, Json(Ack::ok(message))).into_response()
            }
            WriteOutcome::NotFound { pushed: true } => {
                (StatusCode::NOT_FOUND, Json(Ack::rejected("Memo not found"))).into_response()
            }
            WriteOutcome::NotFound { pushed: false } => {
                error_response(StatusCode::NOT_FOUND, "Memo not found")
            }
            WriteOutcome::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
            WriteOutcome::Relayed(relayed) => relayed.into_response(),
            WriteOutcome::ForwardFailed(message) => error_response(StatusCode::BAD_GATEWAY, message),
        }
    }
}

fn parse_id(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

fn path_and_query(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}
