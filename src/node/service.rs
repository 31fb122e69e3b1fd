use super::config::{NodeConfig, Role};
use crate::replication::client::{PeerClient, Relayed};
use crate::replication::primary::Replicator;
use crate::replication::protocol::{InboundWrite, Origin, ReplicationEnvelope, WriteOp};
use crate::replication::replica::{Forwarder, ReplicaPath};
use crate::storage::memory::MemoStore;
use crate::storage::types::{Memo, MemoDraft};

use anyhow::Result;
use std::sync::Arc;

/// Result of applying one write to the local table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Created(Memo),
    Updated(Memo),
    Deleted(u64),
}

/// Everything a write request can end in, for either role.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// Applied by the primary. Carries the local result only.
    Committed(Applied),
    /// Pushed write applied by a replica.
    Acknowledged(Applied),
    /// Unknown id. Nothing was applied and nothing was propagated.
    NotFound { pushed: bool },
    /// Body or path could not be decoded.
    BadRequest(String),
    /// Client write relayed through the primary.
    Relayed(Relayed),
    /// The primary could not be reached from a replica.
    ForwardFailed(String),
}

/// Per-process node state, shared by every handler.
///
/// Owns the memo table; nothing about a node lives in globals, so several
/// nodes can run side by side in one process.
pub struct MemoNode {
    role: Role,
    config: NodeConfig,
    store: Arc<MemoStore>,
    replicator: Replicator,
    forwarder: Forwarder,
}

impl MemoNode {
    pub fn new(role: Role, config: NodeConfig) -> Result<Self> {
        config.validate()?;

        let client = PeerClient::new(config.timeout());
        let replicator = Replicator::new(
            client.clone(),
            config.replica_addrs().to_vec(),
            config.capabilities.propagate,
        );
        let forwarder = Forwarder::new(client, config.primary_addr()?.to_string());

        Ok(Self {
            role,
            config,
            store: Arc::new(MemoStore::new()),
            replicator,
            forwarder,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MemoStore> {
        &self.store
    }

    /// Reads never leave the node, whatever its role.
    pub fn get(&self, id: u64) -> Option<Memo> {
        self.store.get(id)
    }

    pub fn list(&self) -> Vec<Memo> {
        self.store.list()
    }

    /// Decides between forwarding, local apply and primary commit, then does it.
    pub async fn write(&self, request: InboundWrite) -> WriteOutcome {
        let origin = request.origin();

        if self.role == Role::Replica && ReplicaPath::from(origin) == ReplicaPath::ForwardUpstream {
            return self.forward(request).await;
        }

        let op = match request.decode() {
            Ok(op) => op,
            Err(message) => {
                tracing::warn!("Rejected {} {}: {}", request.method, request.path_and_query, message);
                return WriteOutcome::BadRequest(message);
            }
        };
        let envelope = ReplicationEnvelope { op, origin };

        match self.role {
            Role::Primary => self.commit(envelope).await,
            Role::Replica => self.apply_pushed(envelope.op),
        }
    }

    /// Primary write path: apply locally, propagate, report the local result.
    async fn commit(&self, envelope: ReplicationEnvelope) -> WriteOutcome {
        let ReplicationEnvelope { op, origin } = envelope;

        // The primary is the only id authority.
        let op = match op {
            WriteOp::Create { draft, .. } => WriteOp::Create { id: None, draft },
            other => other,
        };

        let Some(applied) = self.apply_local(&op) else {
            tracing::info!("{} on unknown memo {:?}, no replica update needed", op.name(), op.id());
            return WriteOutcome::NotFound { pushed: false };
        };
        tracing::info!("Committed {} locally: {:?}", op.name(), applied);

        if origin == Origin::Primary {
            tracing::warn!("Primary received a primary-tagged {}, not propagating it", op.name());
            return WriteOutcome::Committed(applied);
        }

        let pushed = push_op(op, &applied);
        let report = self.replicator.replicate(&pushed).await;
        if !report.is_complete() {
            tracing::error!(
                "{} reached {}/{} replicas",
                pushed.name(),
                report.acknowledged,
                report.acknowledged + report.failed
            );
        }

        WriteOutcome::Committed(applied)
    }

    /// Replica path for writes pushed by the primary.
    fn apply_pushed(&self, op: WriteOp) -> WriteOutcome {
        match self.apply_local(&op) {
            Some(applied) => {
                tracing::info!("Applied pushed {}: {:?}", op.name(), applied);
                WriteOutcome::Acknowledged(applied)
            }
            None => {
                tracing::warn!("Pushed {} targets unknown memo {:?}", op.name(), op.id());
                WriteOutcome::NotFound { pushed: true }
            }
        }
    }

    async fn forward(&self, request: InboundWrite) -> WriteOutcome {
        match self
            .forwarder
            .forward(
                request.method.clone(),
                &request.path_and_query,
                &request.headers,
                request.body,
            )
            .await
        {
            Ok(relayed) => WriteOutcome::Relayed(relayed),
            Err(e) => {
                tracing::error!(
                    "Failed to forward {} {} to {}: {}",
                    request.method,
                    request.path_and_query,
                    self.forwarder.primary(),
                    e
                );
                WriteOutcome::ForwardFailed(e.to_string())
            }
        }
    }

    /// Runs `op` against the table. The lock is released when this returns.
    fn apply_local(&self, op: &WriteOp) -> Option<Applied> {
        match op {
            WriteOp::Create { id: Some(id), draft } => {
                Some(Applied::Created(self.store.adopt(draft.clone().into_memo(*id))))
            }
            WriteOp::Create { id: None, draft } => Some(Applied::Created(self.store.create(draft.clone()))),
            WriteOp::Update { id, draft } => self.store.update(*id, draft.clone()).map(Applied::Updated),
            WriteOp::PartialUpdate { id, patch } => self.store.patch(*id, patch).map(Applied::Updated),
            WriteOp::Delete { id } => self.store.delete(*id).then_some(Applied::Deleted(*id)),
        }
    }
}

/// The operation sent to replicas for a committed write.
///
/// Creates carry the id the primary assigned so replicas adopt it. Everything
/// else is pushed as received, so a partial update only carries the fields
/// that changed.
fn push_op(op: WriteOp, applied: &Applied) -> WriteOp {
    match (op, applied) {
        (WriteOp::Create { .. }, Applied::Created(memo)) => WriteOp::Create {
            id: Some(memo.id),
            draft: MemoDraft::new(memo.title.clone(), memo.body.clone()),
        },
        (op, _) => op,
    }
}
