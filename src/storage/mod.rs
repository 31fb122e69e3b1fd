//! Memo Storage Module
//!
//! Implements the in-memory record table used identically by the primary and
//! by every replica.
//!
//! ## Core Concepts
//! - **Single lock**: The whole table (records + id counter) sits behind one mutex,
//!   so mutations never interleave their read-modify-write sequences.
//! - **Monotonic ids**: Ids come from a counter that only moves forward; deletes never free an id.
//! - **Adoption**: Replicas store memos under the id the primary assigned (`MemoStore::adopt`).
//! - **No durability**: Everything lives in process memory and is lost on restart.

pub mod memory;
pub mod types;
