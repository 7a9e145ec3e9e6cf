//! Storage layer for cmpd
//!
//! The in-memory store lives in `cmp-core`; this module adds the
//! PostgreSQL-backed one.

mod postgres;

pub use cmp_core::InMemoryStore;
pub use postgres::PostgresStore;
