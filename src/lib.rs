//! Replicated Memo Store Library
//!
//! This library crate defines the modules of a primary-replica memo store served
//! over HTTP. It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`storage`**: The in-memory memo table (`MemoStore`), guarded by a single lock
//!   and assigning monotonic ids.
//! - **`replication`**: The protocol between nodes. The primary pushes committed writes
//!   to its replicas; replicas forward client writes to the primary.
//! - **`node`**: Configuration, per-node state and the axum router shared by both roles.

pub mod node;
pub mod replication;
pub mod storage;
