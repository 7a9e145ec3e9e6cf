//! Persistence for tenant, cluster and instance records

mod memory;
mod traits;

pub use memory::InMemoryStore;
pub use traits::*;
