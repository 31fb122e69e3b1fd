//! Replication Module
//!
//! Implements the primary-replica protocol for memo writes.
//!
//! ## Core Concepts
//! - **Propagation**: The primary applies a write locally, releases the table lock,
//!   then pushes the same write to every replica tagged `From-Primary: true` (`Replicator`).
//! - **Forwarding**: A replica receiving an untagged write relays it to the primary and
//!   hands the primary's answer back verbatim (`Forwarder`).
//! - **Origin**: The tag is parsed once into `Origin`; `ReplicaPath` turns it into the
//!   replica's decision, so a pushed write is never forwarded again.
//! - **Weak consistency**: No retries, no reconciliation. A replica that misses a push
//!   stays behind until a later write touches the same memo.

pub mod client;
pub mod primary;
pub mod protocol;
pub mod replica;

#[cfg(test)]
mod tests;
