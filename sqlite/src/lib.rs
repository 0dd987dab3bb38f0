//! SQLite persistence for the command registry.
//!
//! [`SqliteStore`] implements both
//! [`ModuleStore`](command_registry::ModuleStore) and
//! [`HelpStore`](command_registry::HelpStore), so a registry survives
//! process restarts: descriptors registered in one run are replayed by
//! [`Registry::builder`](command_registry::Registry::builder) in the next.
//!
//! # Architecture
//!
//! - **`schema`**: SQL generation with customizable table prefixes
//! - **`migration`**: table lifecycle (up/down/status)
//! - **`convert`**: descriptor and help rows
//! - **`store`**: the store trait implementations
//!
//! # Quick start
//!
//! ```no_run
//! use command_registry::Registry;
//! use command_registry_sqlite::{Migration, SqliteStore};
//! use rusqlite::Connection;
//!
//! let mut migration = Migration::new(Connection::open("registry.db").unwrap(), "reg_").unwrap();
//! migration.up().unwrap();
//! println!("Modules: {}", migration.status().unwrap().module_count);
//!
//! let store = SqliteStore::new(migration.into_connection(), "reg_").unwrap();
//! let registry = Registry::builder()
//!     .store(store.clone())
//!     .help_store(store)
//!     .build()
//!     .unwrap();
//! ```
//!
//! # Table prefix customization
//!
//! All table and index names are prefixed with a configurable string,
//! allowing several isolated registries within the same SQLite database.
//! Prefixes must contain only alphanumeric characters and underscores.

mod convert;
mod error;
mod migration;
mod schema;
mod store;

pub use error::{Result, SqliteError};
pub use migration::{Migration, MigrationStatus};
pub use schema::{generate_drop_sql, generate_schema_sql};
pub use store::SqliteStore;
