//! Concrete backends for the rental and status-check collections.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;
