//! CMP Daemon library
//!
//! This crate provides the service shell around `cmp-core`:
//! - REST API handlers with bearer-token authentication
//! - PostgreSQL storage
//! - Layered configuration
//! - Server lifecycle management

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;
pub use storage::PostgresStore;
