//! The command dispatch table.
//!
//! [`Registry`] owns three indices that are always updated together under a
//! single lock:
//!
//! - command name -> [`CommandEntry`]
//! - short alias -> command name (with the set of packages contributing it)
//! - package id -> descriptor plus the command names and aliases it added
//!
//! The package index drives removal only; dispatch goes through the alias
//! and command indices. After every mutation:
//!
//! 1. every alias resolves to a command in the command index,
//! 2. every provider of a command is a registered package,
//! 3. a command is indexed iff it has at least one provider,
//! 4. re-registering a package leaves no trace of its previous descriptor.
//!
//! # Example
//!
//! ```
//! use command_registry::Registry;
//! use command_registry_core::{CommandSpec, ModuleDescriptor};
//!
//! let registry = Registry::builder().build().unwrap();
//! registry
//!     .register_module(
//!         ModuleDescriptor::new("org.example.wifi", "Wifi")
//!             .with_command(CommandSpec::new("wifi").with_alias("wf").as_default()),
//!     )
//!     .unwrap();
//!
//! let entry = registry.lookup("wf").unwrap();
//! assert_eq!(entry.name(), "wifi");
//! assert!(entry.is_provided_by("org.example.wifi"));
//!
//! registry.unregister_module("org.example.wifi").unwrap();
//! assert!(registry.lookup("wf").is_none());
//! assert!(registry.lookup("wifi").is_none());
//! ```

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use command_registry_core::{CommandHelp, ModuleDescriptor, validate_descriptor};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{AliasPolicy, RegistryConfig};
use crate::entry::CommandEntry;
use crate::error::{Clash, RegistryError, Result, StoreError};
use crate::listener::{ChangeEvent, ChangeListener, notify};
use crate::store::{HelpStore, MemoryStore, ModuleStore};

/// Outcome of replaying the durable store at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Package ids that were indexed, in load order.
    pub loaded: Vec<String>,
    /// Records that were skipped, with the reason.
    pub skipped: Vec<SkippedRecord>,
}

/// A persisted record that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Package id, when the record got far enough to reveal it.
    pub package_id: Option<String>,
    pub reason: String,
}

/// The package chosen to execute an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Full command name (aliases are expanded).
    pub command: String,
    pub package_id: String,
}

#[derive(Debug, Clone)]
struct AliasBinding {
    command: String,
    /// Packages that contributed this alias for `command`
    owners: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct PackageRecord {
    descriptor: ModuleDescriptor,
    commands: BTreeSet<String>,
    aliases: BTreeSet<String>,
}

/// Index changes computed for a descriptor before anything is mutated.
struct StagedAdd {
    entries: HashMap<String, CommandEntry>,
    aliases: Vec<(String, String)>,
}

struct RegistryState {
    commands: HashMap<String, CommandEntry>,
    aliases: HashMap<String, AliasBinding>,
    packages: BTreeMap<String, PackageRecord>,
    listeners: Vec<Arc<dyn ChangeListener>>,
    store: Box<dyn ModuleStore>,
    help_store: Box<dyn HelpStore>,
}

impl RegistryState {
    /// Applies `descriptor` to copies of the affected entries, as if any
    /// previous version of the same package were already removed.
    fn stage(&self, descriptor: &ModuleDescriptor, policy: AliasPolicy) -> std::result::Result<StagedAdd, Clash> {
        let package_id = descriptor.package_id.as_str();
        let mut entries: HashMap<String, CommandEntry> = HashMap::new();
        let mut aliases: Vec<(String, String)> = Vec::new();

        for spec in &descriptor.commands {
            let entry = match entries.entry(spec.full_name.clone()) {
                Entry::Occupied(o) => o.into_mut(),
                Entry::Vacant(v) => {
                    let mut entry = self
                        .commands
                        .get(&spec.full_name)
                        .cloned()
                        .unwrap_or_else(|| CommandEntry::new(spec.full_name.clone()));
                    entry.remove_provider(package_id);
                    v.insert(entry)
                }
            };
            entry.add_provider(package_id, spec)?;

            let Some(alias) = &spec.short_alias else {
                continue;
            };
            if policy == AliasPolicy::Reject {
                if let Some((_, existing)) = aliases.iter().find(|(a, c)| a == alias && c != &spec.full_name) {
                    return Err(Clash::Alias {
                        alias: alias.clone(),
                        existing: existing.clone(),
                        command: spec.full_name.clone(),
                        claimant: package_id.to_string(),
                    });
                }
                if let Some(binding) = self.aliases.get(alias) {
                    let held_by_others = binding.owners.iter().any(|owner| owner != package_id);
                    if held_by_others && binding.command != spec.full_name {
                        return Err(Clash::Alias {
                            alias: alias.clone(),
                            existing: binding.command.clone(),
                            command: spec.full_name.clone(),
                            claimant: package_id.to_string(),
                        });
                    }
                }
            }
            aliases.push((alias.clone(), spec.full_name.clone()));
        }

        self.check_shadowing(package_id, &entries, &aliases)?;
        Ok(StagedAdd { entries, aliases })
    }

    /// Rejects a name that would be both a full command name and an alias of
    /// a different command. `lookup` checks aliases first, so either order
    /// of registration would leave one of the two unreachable.
    fn check_shadowing(
        &self,
        package_id: &str,
        entries: &HashMap<String, CommandEntry>,
        aliases: &[(String, String)],
    ) -> std::result::Result<(), Clash> {
        for (alias, command) in aliases {
            if alias == command {
                continue;
            }
            let is_command = entries.contains_key(alias)
                || self
                    .commands
                    .get(alias)
                    .is_some_and(|entry| entry.providers().any(|p| p != package_id));
            if is_command {
                return Err(Clash::AliasShadowsCommand {
                    alias: alias.clone(),
                    command: command.clone(),
                    claimant: package_id.to_string(),
                });
            }
        }

        for name in entries.keys() {
            let Some(binding) = self.aliases.get(name) else {
                continue;
            };
            let rebound_here = aliases.iter().any(|(a, c)| a == name && c == name);
            let held_by_others = binding.owners.iter().any(|owner| owner != package_id);
            if held_by_others && binding.command != *name && !rebound_here {
                return Err(Clash::AliasShadowsCommand {
                    alias: name.clone(),
                    command: binding.command.clone(),
                    claimant: package_id.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Drops every trace of `package_id` from the three indices.
    fn remove(&mut self, package_id: &str) -> Option<ModuleDescriptor> {
        let record = self.packages.remove(package_id)?;

        for command in &record.commands {
            let orphaned = self
                .commands
                .get_mut(command)
                .is_some_and(|entry| entry.remove_provider(package_id));
            if orphaned {
                self.commands.remove(command);
            }
        }

        for alias in &record.aliases {
            if let Some(binding) = self.aliases.get_mut(alias) {
                binding.owners.remove(package_id);
                if binding.owners.is_empty() {
                    self.aliases.remove(alias);
                }
            }
        }

        debug!(package = %package_id, "Removed module from indices");
        Some(record.descriptor)
    }

    /// Publishes a staged descriptor. `remove` must already have run.
    fn commit(&mut self, descriptor: ModuleDescriptor, staged: StagedAdd) {
        let package_id = descriptor.package_id.clone();
        let commands: BTreeSet<String> = staged.entries.keys().cloned().collect();
        self.commands.extend(staged.entries);

        let mut aliases = BTreeSet::new();
        for (alias, command) in staged.aliases {
            match self.aliases.entry(alias.clone()) {
                Entry::Occupied(mut o) if o.get().command == command => {
                    o.get_mut().owners.insert(package_id.clone());
                }
                Entry::Occupied(mut o) => {
                    warn!(
                        alias = %alias,
                        previous = %o.get().command,
                        command = %command,
                        package = %package_id,
                        "Alias taken over by a later registration"
                    );
                    o.insert(AliasBinding {
                        command,
                        owners: BTreeSet::from([package_id.clone()]),
                    });
                }
                Entry::Vacant(v) => {
                    v.insert(AliasBinding {
                        command,
                        owners: BTreeSet::from([package_id.clone()]),
                    });
                }
            }
            aliases.insert(alias);
        }

        self.packages.insert(
            package_id,
            PackageRecord {
                descriptor,
                commands,
                aliases,
            },
        );
    }

    /// Deletes the stored record of a package that never made it into the
    /// indices. Returns whether a record existed.
    fn purge_unloaded(&mut self, package_id: &str) -> Result<bool> {
        if !self.store.contains_module(package_id)? {
            debug!(package = %package_id, "Unregister of unknown module ignored");
            return Ok(false);
        }

        self.store.delete(package_id)?;
        if let Err(e) = self.help_store.delete_help(package_id) {
            warn!(package = %package_id, error = %e, "Failed to delete command help");
        }
        info!(package = %package_id, "Deleted stored module that was never loaded");
        Ok(true)
    }

    fn persist_help(&mut self, descriptor: &ModuleDescriptor) {
        let package_id = descriptor.package_id.as_str();
        let result = if descriptor.has_help() {
            self.help_store.replace_help(package_id, &descriptor.help)
        } else {
            self.help_store.delete_help(package_id)
        };
        if let Err(e) = result {
            warn!(package = %package_id, error = %e, "Failed to persist command help");
        }
    }
}

/// Thread-safe command and module registry.
///
/// Construct one per process with [`Registry::builder`] and share it with
/// `Arc`. All operations take `&self`.
pub struct Registry {
    state: Mutex<RegistryState>,
    config: RegistryConfig,
    load_report: LoadReport,
}

impl Registry {
    /// Returns a builder backed by in-memory stores unless told otherwise.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registers (or re-registers) a module.
    ///
    /// Any previous descriptor of the same package is removed first, so
    /// calling this twice with the same descriptor leaves the registry as a
    /// single call would. A clash or validation failure leaves the registry
    /// exactly as it was. If the durable store rejects the write the
    /// in-memory registration stays in effect and [`RegistryError::Store`]
    /// is returned.
    pub fn register_module(&self, descriptor: ModuleDescriptor) -> Result<()> {
        let errors = validate_descriptor(&descriptor);
        if !errors.is_empty() {
            return Err(RegistryError::Invalid {
                package_id: descriptor.package_id.clone(),
                errors,
            });
        }

        let (events, listeners, persisted) = {
            let mut state = self.state.lock();
            let staged = state.stage(&descriptor, self.config.alias_policy)?;

            let mut events = Vec::with_capacity(2);
            if let Some(previous) = state.remove(&descriptor.package_id) {
                events.push(ChangeEvent::Unregistered(previous));
            }
            state.commit(descriptor.clone(), staged);

            let persisted = state.store.upsert(&descriptor);
            state.persist_help(&descriptor);

            info!(
                package = %descriptor.package_id,
                commands = descriptor.commands.len(),
                "Registered module"
            );
            events.push(ChangeEvent::Registered(descriptor));
            (events, state.listeners.clone(), persisted)
        };

        notify(&listeners, &events);
        persisted.map_err(RegistryError::from)
    }

    /// Unregisters a module.
    ///
    /// The durable record and help lines are deleted after the indices are
    /// updated; a store failure is returned but does not restore the module.
    ///
    /// A package that is persisted but was skipped at start-up (unreadable,
    /// invalid or clashing) has its record and help deleted without firing
    /// an event. Returns `Ok(false)` without doing anything if the package
    /// is neither registered nor persisted.
    pub fn unregister_module(&self, package_id: &str) -> Result<bool> {
        let (removed, listeners, persisted) = {
            let mut state = self.state.lock();
            let Some(removed) = state.remove(package_id) else {
                return state.purge_unloaded(package_id);
            };

            let persisted = state.store.delete(package_id);
            if let Err(e) = state.help_store.delete_help(package_id) {
                warn!(package = %package_id, error = %e, "Failed to delete command help");
            }

            info!(package = %package_id, "Unregistered module");
            (removed, state.listeners.clone(), persisted)
        };

        notify(&listeners, &[ChangeEvent::Unregistered(removed)]);
        persisted.map(|_| true).map_err(RegistryError::from)
    }

    /// Resolves a full command name or short alias.
    ///
    /// Aliases are checked first. Returns a snapshot of the entry.
    pub fn lookup(&self, name_or_alias: &str) -> Option<CommandEntry> {
        let state = self.state.lock();
        let command = state
            .aliases
            .get(name_or_alias)
            .map_or(name_or_alias, |binding| binding.command.as_str());
        state.commands.get(command).cloned()
    }

    /// Resolves an invocation to the package that should execute it.
    ///
    /// See [`CommandEntry::resolve`] for the selection rules.
    pub fn resolve(
        &self,
        name_or_alias: &str,
        sub_command: Option<&str>,
        has_arguments: bool,
    ) -> Option<Resolution> {
        let entry = self.lookup(name_or_alias)?;
        let package_id = entry.resolve(sub_command, has_arguments)?;
        Some(Resolution {
            command: entry.name().to_string(),
            package_id: package_id.to_string(),
        })
    }

    /// Snapshot of all registered descriptors, ordered by package id.
    pub fn list_modules(&self) -> Vec<ModuleDescriptor> {
        let state = self.state.lock();
        state
            .packages
            .values()
            .map(|record| record.descriptor.clone())
            .collect()
    }

    /// Registered package ids, sorted.
    pub fn module_packages(&self) -> Vec<String> {
        self.state.lock().packages.keys().cloned().collect()
    }

    /// Descriptor registered under `package_id`, if any.
    pub fn module(&self, package_id: &str) -> Option<ModuleDescriptor> {
        let state = self.state.lock();
        state
            .packages
            .get(package_id)
            .map(|record| record.descriptor.clone())
    }

    /// Whether `package_id` is currently registered. Records skipped at
    /// start-up do not count.
    pub fn contains_module(&self, package_id: &str) -> bool {
        self.state.lock().packages.contains_key(package_id)
    }

    /// Indexed command names, sorted.
    pub fn commands(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// `(alias, command)` pairs, sorted by alias.
    pub fn aliases(&self) -> Vec<(String, String)> {
        let state = self.state.lock();
        let mut aliases: Vec<(String, String)> = state
            .aliases
            .iter()
            .map(|(alias, binding)| (alias.clone(), binding.command.clone()))
            .collect();
        aliases.sort();
        aliases
    }

    /// Help lines persisted for `package_id`.
    pub fn help(&self, package_id: &str) -> Result<Vec<CommandHelp>> {
        Ok(self.state.lock().help_store.help_for(package_id)?)
    }

    /// Adds a listener for subsequent changes. Adding the same `Arc` twice
    /// has no effect.
    pub fn add_change_listener(&self, listener: Arc<dyn ChangeListener>) {
        let mut state = self.state.lock();
        if !state.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            state.listeners.push(listener);
        }
    }

    /// Removes a listener previously added; returns whether it was present.
    pub fn remove_change_listener(&self, listener: &Arc<dyn ChangeListener>) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        state.listeners.len() != before
    }

    /// Adds a listener and returns the modules registered at that instant.
    ///
    /// No event can fall between the snapshot and the subscription.
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> Vec<ModuleDescriptor> {
        let mut state = self.state.lock();
        if !state.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            state.listeners.push(listener);
        }
        state
            .packages
            .values()
            .map(|record| record.descriptor.clone())
            .collect()
    }

    /// Configuration the registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// What happened when the durable store was replayed at construction.
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }
}

/// Builder for a [`Registry`].
///
/// # Example
///
/// ```
/// use command_registry::{AliasPolicy, MemoryStore, Registry};
///
/// let store = MemoryStore::new();
/// let registry = Registry::builder()
///     .store(store.clone())
///     .help_store(store)
///     .alias_policy(AliasPolicy::Reject)
///     .build()
///     .unwrap();
/// assert!(registry.list_modules().is_empty());
/// ```
pub struct RegistryBuilder {
    store: Option<Box<dyn ModuleStore>>,
    help_store: Option<Box<dyn HelpStore>>,
    listeners: Vec<Arc<dyn ChangeListener>>,
    config: RegistryConfig,
}

impl RegistryBuilder {
    /// Creates a builder with default configuration and no stores.
    pub fn new() -> Self {
        Self {
            store: None,
            help_store: None,
            listeners: Vec::new(),
            config: RegistryConfig::default(),
        }
    }

    /// Durable mirror of descriptors.
    pub fn store(mut self, store: impl ModuleStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Durable store of help lines.
    pub fn help_store(mut self, help_store: impl HelpStore + 'static) -> Self {
        self.help_store = Some(Box::new(help_store));
        self
    }

    /// Replaces the whole configuration, including the alias policy.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a listener before the store is replayed.
    ///
    /// Replayed modules do not produce events; the listener sees only
    /// changes made after [`build`](Self::build) returns.
    pub fn listener(mut self, listener: Arc<dyn ChangeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Overrides only the alias policy.
    pub fn alias_policy(mut self, policy: AliasPolicy) -> Self {
        self.config.alias_policy = policy;
        self
    }

    /// Builds the registry and replays every persisted descriptor.
    ///
    /// Records that cannot be decoded, fail validation, or clash with
    /// records loaded before them are skipped and listed in the
    /// [`LoadReport`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Store`] if the store cannot be read at all.
    pub fn build(self) -> Result<Registry> {
        let mut state = RegistryState {
            commands: HashMap::new(),
            aliases: HashMap::new(),
            packages: BTreeMap::new(),
            listeners: self.listeners,
            store: self.store.unwrap_or_else(|| Box::new(MemoryStore::new())),
            help_store: self
                .help_store
                .unwrap_or_else(|| Box::new(MemoryStore::new())),
        };

        let load_report = load_from_store(&mut state, self.config.alias_policy)?;
        info!(
            loaded = load_report.loaded.len(),
            skipped = load_report.skipped.len(),
            "Loaded module registry"
        );

        Ok(Registry {
            state: Mutex::new(state),
            config: self.config,
            load_report,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn load_from_store(state: &mut RegistryState, policy: AliasPolicy) -> Result<LoadReport> {
    let records = state.store.load_all()?;
    let mut report = LoadReport::default();

    for record in records {
        let descriptor = match record {
            Ok(descriptor) => descriptor,
            Err(e) => {
                let package_id = match &e {
                    StoreError::Decode { package_id, .. } => Some(package_id.clone()),
                    _ => None,
                };
                warn!(package = ?package_id, error = %e, "Skipping unreadable module record");
                report.skipped.push(SkippedRecord {
                    package_id,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let package_id = descriptor.package_id.clone();
        let outcome = match validate_descriptor(&descriptor).into_iter().next() {
            Some(invalid) => Err(invalid.to_string()),
            None => state
                .stage(&descriptor, policy)
                .map_err(|clash| clash.to_string()),
        };

        match outcome {
            Ok(staged) => {
                state.remove(&package_id);
                state.commit(descriptor, staged);
                report.loaded.push(package_id);
            }
            Err(reason) => {
                warn!(package = %package_id, reason = %reason, "Skipping stored module");
                report.skipped.push(SkippedRecord {
                    package_id: Some(package_id),
                    reason,
                });
            }
        }
    }

    Ok(report)
}
