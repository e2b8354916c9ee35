//! services/studio/src/adapters/mod.rs
//!
//! Concrete implementations of the core service ports.

pub mod backend;
pub mod local_store;
