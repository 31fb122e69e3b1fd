//! Node Module
//!
//! Wires one memo node together: its configuration, its state, and its HTTP surface.
//!
//! ## Core Concepts
//! - **Role**: `primary` or `replica`, given at startup. The same handlers serve both.
//! - **Capabilities**: Configuration flags choosing which verbs are wired and whether a
//!   primary propagates, instead of separate code per node variant.
//! - **Ordering**: A primary applies, releases the lock, propagates to every replica,
//!   and only then answers with the local result.

pub mod config;
pub mod handlers;
pub mod service;
