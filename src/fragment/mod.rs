//! Fragment lifecycle: segmentation, storage, and session grouping.

pub mod ingest;
pub mod segment;
pub mod session;
pub mod store;
pub mod types;

pub use types::{Fragment, Metadata, Session};
