//! Trellis Storage - Pluggable Adapter and Cache Contracts
//!
//! The storage boundary of the Trellis façade. The engine drives a storage
//! `Adapter` for physical persistence and query execution, and a `Cache`
//! for per-document snapshots; both are pluggable. In-memory
//! implementations back tests and development.
//!
//! Key Features:
//! - Full adapter contract: DDL, CRUD, find/count/sum, capabilities
//! - Cache contract with TTL loads and wildcard purges
//! - Complete in-memory adapter with filter/order/cursor evaluation
//!
//! @version 0.1.0
//! @author Trellis Development Team

pub mod adapter;
pub mod cache;
pub mod memory;

pub use adapter::Adapter;
pub use cache::{Cache, MemoryCache};
pub use memory::{MemoryAdapter, MemoryLimits};
