//! Consolidated memories: storage, search, and the consolidation pipeline.

pub mod consolidate;
pub mod query;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;

pub use types::Memory;
