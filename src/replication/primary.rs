use super::client::PeerClient;
use super::protocol::WriteOp;

/// Outcome of pushing one write to every replica.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    pub acknowledged: usize,
    pub failed: usize,
}

impl ReplicationReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Primary-side propagation of committed writes.
///
/// Propagation is advisory: a failure is logged and counted, it never undoes
/// the local write and never changes what the caller is told.
pub struct Replicator {
    client: PeerClient,
    replicas: Vec<String>,
    enabled: bool,
}

impl Replicator {
    pub fn new(client: PeerClient, replicas: Vec<String>, enabled: bool) -> Self {
        Self {
            client,
            replicas,
            enabled,
        }
    }

    /// Pushes `op` to each replica in configuration order.
    ///
    /// Must be called after the store lock is released. One unreachable
    /// replica does not stop the others from being updated.
    pub async fn replicate(&self, op: &WriteOp) -> ReplicationReport {
        let mut report = ReplicationReport::default();

        if !self.enabled {
            tracing::debug!("Propagation disabled, keeping {} local", op.name());
            return report;
        }

        for replica in &self.replicas {
            tracing::info!("Propagating {} to replica {}", op.name(), replica);

            match self.client.propagate(replica, op).await {
                Ok(ack) => {
                    tracing::info!("Replica {} acknowledged {}: {}", replica, op.name(), ack.message);
                    report.acknowledged += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to propagate {} to {}: {}", op.name(), replica, e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
