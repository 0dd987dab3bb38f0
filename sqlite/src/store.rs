//! SQLite-backed [`ModuleStore`] and [`HelpStore`].
//!
//! One [`SqliteStore`] handle can be cloned and given to the registry as
//! both the module store and the help store; the clones share a single
//! connection. Every write runs in its own transaction.
//!
//! # Example
//!
//! ```no_run
//! use command_registry::Registry;
//! use command_registry_sqlite::SqliteStore;
//!
//! let store = SqliteStore::open("registry.db", "reg_").unwrap();
//! let registry = Registry::builder()
//!     .store(store.clone())
//!     .help_store(store)
//!     .build()
//!     .unwrap();
//! println!("{} modules restored", registry.load_report().loaded.len());
//! ```

use std::path::Path;
use std::sync::Arc;

use command_registry::{HelpStore, LoadedRecord, ModuleStore, StoreError};
use command_registry_core::{CommandHelp, ModuleDescriptor};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::debug;

use crate::convert;
use crate::error::{Result, SqliteError};
use crate::migration::Migration;
use crate::schema::validate_prefix;

/// Durable registry mirror in a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    prefix: String,
}

impl SqliteStore {
    /// Wraps an existing connection whose tables are already migrated.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`](crate::SqliteError::InvalidPrefix)
    /// if the prefix is invalid.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            prefix,
        })
    }

    /// Opens (or creates) a database file and creates missing tables.
    pub fn open(path: impl AsRef<Path>, prefix: impl Into<String>) -> Result<Self> {
        Self::migrated(Connection::open(path)?, prefix.into())
    }

    /// A private in-memory database with tables created.
    pub fn open_in_memory(prefix: impl Into<String>) -> Result<Self> {
        Self::migrated(Connection::open_in_memory()?, prefix.into())
    }

    fn migrated(conn: Connection, prefix: String) -> Result<Self> {
        let mut migration = Migration::new(conn, prefix.clone())?;
        migration.up()?;
        Self::new(migration.into_connection(), prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Loads one stored descriptor.
    pub fn load_module(&self, package_id: &str) -> Result<Option<ModuleDescriptor>> {
        let conn = self.conn.lock();
        convert::load_module(&conn, &self.prefix, package_id)
    }

    fn write<T>(&self, op: impl FnOnce(&Connection, &str) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = op(&*tx, self.prefix.as_str())?;
        tx.commit()?;
        Ok(value)
    }
}

impl ModuleStore for SqliteStore {
    fn load_all(&mut self) -> std::result::Result<Vec<LoadedRecord>, StoreError> {
        let conn = self.conn.lock();
        let package_ids = convert::load_package_ids(&conn, &self.prefix)?;

        let records = package_ids
            .into_iter()
            .filter_map(|package_id| {
                match convert::load_module(&conn, &self.prefix, &package_id) {
                    Ok(Some(descriptor)) => Some(Ok(descriptor)),
                    Ok(None) => None,
                    Err(e) => Some(Err(StoreError::Decode {
                        package_id,
                        reason: e.to_string(),
                    })),
                }
            })
            .collect::<Vec<_>>();
        debug!(records = records.len(), prefix = %self.prefix, "Read stored modules");
        Ok(records)
    }

    fn upsert(&mut self, descriptor: &ModuleDescriptor) -> std::result::Result<(), StoreError> {
        let written = self.write(|tx, prefix| {
            convert::delete_module(tx, prefix, &descriptor.package_id)?;
            convert::insert_module(tx, prefix, descriptor)
        })?;
        debug!(package = %descriptor.package_id, commands = written, "Stored module");
        Ok(())
    }

    fn delete(&mut self, package_id: &str) -> std::result::Result<bool, StoreError> {
        Ok(self.write(|tx, prefix| convert::delete_module(tx, prefix, package_id))?)
    }

    fn contains_module(&mut self, package_id: &str) -> std::result::Result<bool, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}modules WHERE package_id = ?1", self.prefix),
                [package_id],
                |row| row.get(0),
            )
            .map_err(SqliteError::from)?;
        Ok(count > 0)
    }
}

impl HelpStore for SqliteStore {
    fn replace_help(&mut self, package_id: &str, help: &[CommandHelp]) -> std::result::Result<(), StoreError> {
        self.write(|tx, prefix| convert::replace_help(tx, prefix, package_id, help))?;
        Ok(())
    }

    fn delete_help(&mut self, package_id: &str) -> std::result::Result<(), StoreError> {
        Ok(self.write(|tx, prefix| convert::delete_help(tx, prefix, package_id))?)
    }

    fn help_for(&mut self, package_id: &str) -> std::result::Result<Vec<CommandHelp>, StoreError> {
        let conn = self.conn.lock();
        Ok(convert::load_help(&conn, &self.prefix, package_id)?)
    }
}
