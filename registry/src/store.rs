//! Persistence contracts and the in-memory backend.
//!
//! The registry mirrors every descriptor into a [`ModuleStore`] and every
//! help set into a [`HelpStore`]. Both are keyed by package id. The SQLite
//! backend lives in its own crate; [`MemoryStore`] serves tests and
//! processes that do not need durability.

use std::collections::BTreeMap;
use std::sync::Arc;

use command_registry_core::{CommandHelp, ModuleDescriptor};
use parking_lot::Mutex;

use crate::error::StoreError;

/// One persisted record as returned by [`ModuleStore::load_all`].
///
/// Decoding failures are reported per record so a single corrupt row does
/// not prevent the rest of the registry from loading.
pub type LoadedRecord = Result<ModuleDescriptor, StoreError>;

/// Durable mirror of module descriptors.
///
/// `upsert` and `delete` must be atomic with respect to a single package's
/// record.
pub trait ModuleStore: Send {
    /// Returns every persisted record.
    fn load_all(&mut self) -> Result<Vec<LoadedRecord>, StoreError>;

    /// Inserts or replaces the record for `descriptor.package_id`.
    fn upsert(&mut self, descriptor: &ModuleDescriptor) -> Result<(), StoreError>;

    /// Deletes the record for `package_id`; returns whether one existed.
    fn delete(&mut self, package_id: &str) -> Result<bool, StoreError>;

    /// Whether a record exists for `package_id`, readable or not.
    fn contains_module(&mut self, package_id: &str) -> Result<bool, StoreError>;
}

/// Durable store of user-facing help lines, keyed by package id.
pub trait HelpStore: Send {
    /// Replaces all help lines of `package_id` with `help`.
    fn replace_help(&mut self, package_id: &str, help: &[CommandHelp]) -> Result<(), StoreError>;

    fn delete_help(&mut self, package_id: &str) -> Result<(), StoreError>;

    /// Help lines of `package_id`; empty if none are stored.
    fn help_for(&mut self, package_id: &str) -> Result<Vec<CommandHelp>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Package id -> descriptor JSON
    modules: BTreeMap<String, String>,
    help: BTreeMap<String, Vec<CommandHelp>>,
    fail_writes: bool,
}

/// In-memory [`ModuleStore`] and [`HelpStore`].
///
/// Cloning yields another handle to the same contents, so a test can keep a
/// handle while the registry owns another. Descriptors are kept as JSON, the
/// same way a durable backend would hold them.
///
/// # Examples
///
/// ```
/// use command_registry::{MemoryStore, ModuleStore};
/// use command_registry_core::ModuleDescriptor;
///
/// let mut store = MemoryStore::new();
/// store.upsert(&ModuleDescriptor::new("org.example.sms", "Sms")).unwrap();
/// assert!(store.contains_module("org.example.sms").unwrap());
/// assert_eq!(store.package_ids(), vec!["org.example.sms"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with [`StoreError::Backend`].
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Stores a raw record without validation, e.g. to simulate corruption.
    pub fn insert_raw(&self, package_id: impl Into<String>, raw: impl Into<String>) {
        self.state.lock().modules.insert(package_id.into(), raw.into());
    }

    /// Package ids with a stored record, sorted.
    pub fn package_ids(&self) -> Vec<String> {
        self.state.lock().modules.keys().cloned().collect()
    }

    /// Decodes the stored record of `package_id`, if any.
    pub fn stored(&self, package_id: &str) -> Option<ModuleDescriptor> {
        let state = self.state.lock();
        let raw = state.modules.get(package_id)?;
        serde_json::from_str(raw).ok()
    }

    fn check_writable(state: &MemoryState) -> Result<(), StoreError> {
        if state.fail_writes {
            return Err(StoreError::Backend("memory store is read-only".to_string()));
        }
        Ok(())
    }
}

impl ModuleStore for MemoryStore {
    fn load_all(&mut self) -> Result<Vec<LoadedRecord>, StoreError> {
        let state = self.state.lock();
        let records = state
            .modules
            .iter()
            .map(|(package_id, raw)| {
                serde_json::from_str::<ModuleDescriptor>(raw).map_err(|e| StoreError::Decode {
                    package_id: package_id.clone(),
                    reason: e.to_string(),
                })
            })
            .collect();
        Ok(records)
    }

    fn upsert(&mut self, descriptor: &ModuleDescriptor) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::check_writable(&state)?;
        let raw = serde_json::to_string(descriptor)?;
        state.modules.insert(descriptor.package_id.clone(), raw);
        Ok(())
    }

    fn delete(&mut self, package_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Self::check_writable(&state)?;
        Ok(state.modules.remove(package_id).is_some())
    }

    fn contains_module(&mut self, package_id: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().modules.contains_key(package_id))
    }
}

impl HelpStore for MemoryStore {
    fn replace_help(&mut self, package_id: &str, help: &[CommandHelp]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::check_writable(&state)?;
        state.help.insert(package_id.to_string(), help.to_vec());
        Ok(())
    }

    fn delete_help(&mut self, package_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::check_writable(&state)?;
        state.help.remove(package_id);
        Ok(())
    }

    fn help_for(&mut self, package_id: &str) -> Result<Vec<CommandHelp>, StoreError> {
        Ok(self
            .state
            .lock()
            .help
            .get(package_id)
            .cloned()
            .unwrap_or_default())
    }
}
