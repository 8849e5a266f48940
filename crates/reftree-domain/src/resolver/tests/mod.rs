//! Tests for the reference resolver module.
//!
//! Organized by functionality:
//! - Root fetch and call memo
//! - Reference walk (per-id, batch, nested, relation names)
//! - Cache, failed ids and noCache
//! - Warnings and failure isolation
//! - Side fetches
//! - Concurrency and in-flight sharing
