//! Fragment capture and memory consolidation.
//!
//! Engram turns loose text into small, independently stored **fragments**,
//! groups them into **sessions**, and on request consolidates a selection of
//! fragments into a single narrative **memory** using a language-model
//! completion service. Memories can then be searched and used as context for
//! answering questions.
//!
//! # Lifecycle
//!
//! | State | `processed` | `memory_id` |
//! |-------|-------------|-------------|
//! | Unprocessed | `false` | `None` |
//! | Processed | `true` | `Some(id)` |
//!
//! A fragment moves from unprocessed to processed exactly once, when a
//! memory built from it has been stored. The transition is never reversed.
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML files and environment variables
//! - [`db`]: SQLite setup, schema, migrations, and health checks
//! - [`fragment`]: segmentation, fragment and session storage, text ingest
//! - [`memory`]: memory storage, search, consolidation, and question answering
//! - [`completion`]: the language-model completion service seam
//! - [`server`] and [`api`]: the JSON HTTP surface

pub mod api;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod fragment;
pub mod memory;
pub mod server;
