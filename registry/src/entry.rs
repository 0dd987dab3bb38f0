//! Per-command provider bookkeeping.
//!
//! A [`CommandEntry`] records every package contributing to one full command
//! name and which package owns each exclusive binding: the two default slots
//! and each named sub-command. It knows nothing about aliases or the package
//! index; the [`Registry`](crate::Registry) maintains those.

use std::collections::BTreeMap;

use command_registry_core::{BindingSlot, CommandSpec};

use crate::error::Clash;

/// Providers and binding owners for one full command name.
///
/// # Examples
///
/// ```
/// use command_registry::CommandEntry;
/// use command_registry_core::CommandSpec;
///
/// let mut entry = CommandEntry::new("wifi");
/// entry.add_provider("org.example.wifiaccess", &CommandSpec::new("wifi").as_default()).unwrap();
/// entry.add_provider("org.example.wifichange", &CommandSpec::new("wifi").with_sub_command("disable")).unwrap();
///
/// assert_eq!(entry.resolve(None, false), Some("org.example.wifiaccess"));
/// assert_eq!(entry.resolve(Some("disable"), false), Some("org.example.wifichange"));
///
/// // A second default without arguments is a clash
/// assert!(entry.add_provider("org.example.other", &CommandSpec::new("wifi").as_default()).is_err());
///
/// assert!(!entry.remove_provider("org.example.wifiaccess"));
/// assert!(entry.remove_provider("org.example.wifichange"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    name: String,
    /// Package id -> specs it contributed under this name
    providers: BTreeMap<String, Vec<CommandSpec>>,
    default_without_args: Option<String>,
    default_with_args: Option<String>,
    /// Sub-command -> owning package id
    sub_commands: BTreeMap<String, String>,
}

impl CommandEntry {
    /// Creates an entry with no providers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            providers: BTreeMap::new(),
            default_without_args: None,
            default_with_args: None,
            sub_commands: BTreeMap::new(),
        }
    }

    /// Adds `package_id` as a provider of `spec`.
    ///
    /// Fails with a [`Clash`] if the spec claims a default slot or
    /// sub-command that is already owned, including by the same package.
    /// Adding a spec the package already contributed verbatim is a no-op.
    /// On failure the entry is unchanged.
    pub fn add_provider(&mut self, package_id: &str, spec: &CommandSpec) -> Result<(), Clash> {
        if self
            .providers
            .get(package_id)
            .is_some_and(|specs| specs.contains(spec))
        {
            return Ok(());
        }

        let slot = spec.binding_slot();
        if let Some(slot) = slot {
            if let Some(holder) = self.slot_holder(slot) {
                return Err(Clash::DefaultBinding {
                    command: self.name.clone(),
                    slot,
                    holder: holder.to_string(),
                    claimant: package_id.to_string(),
                });
            }
        }
        if let Some(sub) = &spec.sub_command {
            if let Some(holder) = self.sub_commands.get(sub) {
                return Err(Clash::SubCommand {
                    command: self.name.clone(),
                    sub_command: sub.clone(),
                    holder: holder.clone(),
                    claimant: package_id.to_string(),
                });
            }
        }

        match slot {
            Some(BindingSlot::DefaultWithoutArgs) => {
                self.default_without_args = Some(package_id.to_string());
            }
            Some(BindingSlot::DefaultWithArgs) => {
                self.default_with_args = Some(package_id.to_string());
            }
            None => {}
        }
        if let Some(sub) = &spec.sub_command {
            self.sub_commands.insert(sub.clone(), package_id.to_string());
        }
        self.providers
            .entry(package_id.to_string())
            .or_default()
            .push(spec.clone());
        Ok(())
    }

    /// Removes every binding of `package_id`.
    ///
    /// Returns `true` iff no providers remain, in which case the caller
    /// should drop the entry from its command index.
    pub fn remove_provider(&mut self, package_id: &str) -> bool {
        if self.providers.remove(package_id).is_some() {
            if self.default_without_args.as_deref() == Some(package_id) {
                self.default_without_args = None;
            }
            if self.default_with_args.as_deref() == Some(package_id) {
                self.default_with_args = None;
            }
            self.sub_commands.retain(|_, owner| owner != package_id);
        }
        self.providers.is_empty()
    }

    /// Picks the package that should execute an invocation.
    ///
    /// A known sub-command wins. Otherwise the default-with-arguments owner
    /// handles calls carrying arguments and the default-without-arguments
    /// owner handles bare calls.
    pub fn resolve(&self, sub_command: Option<&str>, has_arguments: bool) -> Option<&str> {
        if let Some(owner) = sub_command.and_then(|sub| self.sub_commands.get(sub)) {
            return Some(owner);
        }
        if has_arguments {
            self.default_with_args.as_deref()
        } else {
            self.default_without_args.as_deref()
        }
    }

    /// Full command name this entry is indexed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package ids of all providers, sorted.
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Number of distinct packages contributing to this command.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Whether `package_id` contributes at least one spec.
    pub fn is_provided_by(&self, package_id: &str) -> bool {
        self.providers.contains_key(package_id)
    }

    /// Specs `package_id` contributed under this command.
    pub fn specs_of(&self, package_id: &str) -> &[CommandSpec] {
        self.providers
            .get(package_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Owner of the default-without-arguments slot.
    pub fn default_provider(&self) -> Option<&str> {
        self.default_without_args.as_deref()
    }

    /// Owner of the default-with-arguments slot.
    pub fn default_with_args_provider(&self) -> Option<&str> {
        self.default_with_args.as_deref()
    }

    /// `(sub_command, package_id)` pairs, sorted by sub-command.
    pub fn sub_commands(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sub_commands
            .iter()
            .map(|(sub, owner)| (sub.as_str(), owner.as_str()))
    }

    fn slot_holder(&self, slot: BindingSlot) -> Option<&str> {
        match slot {
            BindingSlot::DefaultWithoutArgs => self.default_without_args.as_deref(),
            BindingSlot::DefaultWithArgs => self.default_with_args.as_deref(),
        }
    }
}
