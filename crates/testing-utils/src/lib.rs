//! # Listener Testing Utils
//!
//! Shared testing utilities for the dispatch listener workspace.
//!
//! - **Scripted dispatch source**: queued provider responses with optional latency
//! - **In-memory event store**: dedup-aware store with per-id failure injection
//! - **Test data builders**: `DispatchRecord` with sensible defaults
//! - **Helpers**: fixed timestamps and condition polling
//!
//! ```toml
//! [dev-dependencies]
//! listener-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
