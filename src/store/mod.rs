pub mod base;
pub mod database;
pub mod memory_store;
pub mod mongodb_store;

// Re-export the primary Store items so code outside can do
// "use crate::store::{Store, Database, create_store};"
pub use base::{create_store, Store};
pub use database::Database;
