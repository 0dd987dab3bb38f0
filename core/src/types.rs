//! Descriptor type definitions.
//!
//! This module defines the values a feature module hands to the registry when
//! it is installed: the [`ModuleDescriptor`] itself, the [`CommandSpec`]s it
//! offers, and the optional [`CommandHelp`] entries surfaced to users. The
//! types are designed for serialization with [`serde`] and round-trip through
//! JSON and SQLite.

use serde::{Deserialize, Serialize};

/// Version of the descriptor contract (semver).
///
/// Embedded in every [`ModuleBundle`](crate::ModuleBundle) to track
/// compatibility across releases.
pub const DESCRIPTOR_CONTRACT_VERSION: &str = "1.0.0";

/// Binding slot a [`CommandSpec`] claims on its command.
///
/// A command has at most one owner per exclusive slot. Specs that are not
/// marked default claim no slot and only contribute a sub-command (if any).
///
/// # Examples
///
/// ```
/// use command_registry_core::{BindingSlot, CommandSpec};
///
/// let spec = CommandSpec::new("wifi").with_alias("wf").as_default();
/// assert_eq!(spec.binding_slot(), Some(BindingSlot::DefaultWithoutArgs));
///
/// let spec = CommandSpec::new("sms").as_default().with_arguments();
/// assert_eq!(spec.binding_slot(), Some(BindingSlot::DefaultWithArgs));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingSlot {
    /// Invoked when the command is sent with no sub-command and no arguments.
    DefaultWithoutArgs,
    /// Invoked when the command is sent with arguments but no known sub-command.
    DefaultWithArgs,
}

/// One command a module offers.
///
/// The `full_name` is the key in the registry's command index. Several
/// modules may contribute to the same full name as long as their binding
/// slots and sub-commands do not overlap.
///
/// # Examples
///
/// ```
/// use command_registry_core::CommandSpec;
///
/// let spec = CommandSpec::new("ringermode")
///     .with_alias("ringer")
///     .with_sub_command("silent");
/// assert_eq!(spec.full_name, "ringermode");
/// assert_eq!(spec.short_alias.as_deref(), Some("ringer"));
/// assert!(!spec.is_default);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Full command name (e.g. "wifi")
    pub full_name: String,
    /// Abbreviated alias (e.g. "wf")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_alias: Option<String>,
    /// Sub-behavior under the full command (e.g. "list")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_command: Option<String>,
    /// Whether this spec is a default binding of the command
    #[serde(default)]
    pub is_default: bool,
    /// Whether the default binding expects arguments
    #[serde(default)]
    pub takes_arguments: bool,
}

impl CommandSpec {
    /// Creates a non-default spec without alias or sub-command.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            short_alias: None,
            sub_command: None,
            is_default: false,
            takes_arguments: false,
        }
    }

    /// Sets the short alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.short_alias = Some(alias.into());
        self
    }

    /// Sets the sub-command name.
    pub fn with_sub_command(mut self, sub_command: impl Into<String>) -> Self {
        self.sub_command = Some(sub_command.into());
        self
    }

    /// Marks the spec as a default binding.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Marks the spec as taking arguments.
    pub fn with_arguments(mut self) -> Self {
        self.takes_arguments = true;
        self
    }

    /// Returns the exclusive slot this spec claims, if any.
    pub fn binding_slot(&self) -> Option<BindingSlot> {
        match (self.is_default, self.takes_arguments) {
            (false, _) => None,
            (true, false) => Some(BindingSlot::DefaultWithoutArgs),
            (true, true) => Some(BindingSlot::DefaultWithArgs),
        }
    }
}

/// Kind of argument a command expects, shown in help output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ArgType {
    /// No argument (the default).
    #[default]
    None,
    /// File system path.
    Path,
    /// Phone number.
    PhoneNumber,
    /// Contact name.
    ContactName,
    /// Number.
    Number,
    /// Free text.
    Text,
    /// Anything else, described by name.
    Other(String),
}

/// A help line surfaced to users for one command (or sub-command).
///
/// # Examples
///
/// ```
/// use command_registry_core::{ArgType, CommandHelp};
///
/// let help = CommandHelp::new("wifi", ArgType::None, "Show the Wi-Fi state")
///     .with_sub_command("state");
/// assert_eq!(help.sub_command.as_deref(), Some("state"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandHelp {
    /// Command the help line refers to
    pub command: String,
    /// Sub-command the help line refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_command: Option<String>,
    /// Argument kind
    #[serde(default)]
    pub arg_type: ArgType,
    /// Human-readable description
    pub description: String,
}

impl CommandHelp {
    pub fn new(command: impl Into<String>, arg_type: ArgType, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            sub_command: None,
            arg_type,
            description: description.into(),
        }
    }

    pub fn with_sub_command(mut self, sub_command: impl Into<String>) -> Self {
        self.sub_command = Some(sub_command.into());
        self
    }
}

/// Immutable description of one installable module.
///
/// A module builds its descriptor once and hands it to the registry. A newer
/// descriptor from the same `package_id` supersedes the old one as a whole;
/// descriptors are never patched in place.
///
/// # Examples
///
/// ```
/// use command_registry_core::*;
///
/// let descriptor = ModuleDescriptor::new("org.example.wifi", "Wifi Module")
///     .with_command(CommandSpec::new("wifi").with_alias("wf").as_default())
///     .with_command(CommandSpec::new("wifi").with_sub_command("list"))
///     .with_help(CommandHelp::new("wifi", ArgType::None, "Show the Wi-Fi state"));
///
/// assert_eq!(descriptor.command_names(), vec!["wifi"]);
/// assert_eq!(descriptor.aliases(), vec!["wf"]);
/// assert!(descriptor.has_help());
/// assert!(validate_descriptor(&descriptor).is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Stable identity of the module (primary key)
    pub package_id: String,
    /// Human-readable module name
    pub display_name: String,
    /// Commands the module offers
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
    /// Help lines surfaced to users
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub help: Vec<CommandHelp>,
}

impl ModuleDescriptor {
    /// Creates a descriptor with no commands.
    pub fn new(package_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            display_name: display_name.into(),
            commands: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Adds a command spec. Identical specs are only kept once.
    pub fn with_command(mut self, spec: CommandSpec) -> Self {
        if !self.commands.contains(&spec) {
            self.commands.push(spec);
        }
        self
    }

    /// Adds a help line. Identical lines are only kept once.
    pub fn with_help(mut self, help: CommandHelp) -> Self {
        if !self.help.contains(&help) {
            self.help.push(help);
        }
        self
    }

    /// Distinct full command names, in first-seen order.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for spec in &self.commands {
            if !names.contains(&spec.full_name.as_str()) {
                names.push(&spec.full_name);
            }
        }
        names
    }

    /// Distinct short aliases, in first-seen order.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = Vec::new();
        for alias in self.commands.iter().filter_map(|c| c.short_alias.as_deref()) {
            if !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }
        aliases
    }

    /// Returns `true` if the descriptor carries help metadata.
    pub fn has_help(&self) -> bool {
        !self.help.is_empty()
    }

    /// Returns `true` if any spec uses `full_name`.
    pub fn offers(&self, full_name: &str) -> bool {
        self.commands.iter().any(|c| c.full_name == full_name)
    }

    /// Returns `true` if a spec offers `sub_command` under `full_name`.
    pub fn offers_sub_command(&self, full_name: &str, sub_command: &str) -> bool {
        self.commands
            .iter()
            .any(|c| c.full_name == full_name && c.sub_command.as_deref() == Some(sub_command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_slot() {
        assert_eq!(CommandSpec::new("a").binding_slot(), None);
        assert_eq!(CommandSpec::new("a").with_arguments().binding_slot(), None);
        assert_eq!(
            CommandSpec::new("a").as_default().binding_slot(),
            Some(BindingSlot::DefaultWithoutArgs)
        );
        assert_eq!(
            CommandSpec::new("a").as_default().with_arguments().binding_slot(),
            Some(BindingSlot::DefaultWithArgs)
        );
    }

    #[test]
    fn test_descriptor_dedupes_specs() {
        let descriptor = ModuleDescriptor::new("p", "P")
            .with_command(CommandSpec::new("sms").with_alias("s"))
            .with_command(CommandSpec::new("sms").with_alias("s"))
            .with_command(CommandSpec::new("call").with_alias("c"));

        assert_eq!(descriptor.commands.len(), 2);
        assert_eq!(descriptor.command_names(), vec!["sms", "call"]);
        assert_eq!(descriptor.aliases(), vec!["s", "c"]);
        assert!(descriptor.offers("call"));
        assert!(!descriptor.offers("wifi"));
    }

    #[test]
    fn test_descriptor_json_defaults() {
        let json = r#"{
            "package_id": "org.example.misc",
            "display_name": "Misc",
            "commands": [{ "full_name": "sysinfo", "is_default": true }]
        }"#;
        let descriptor: ModuleDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.commands[0].short_alias, None);
        assert!(descriptor.commands[0].is_default);
        assert!(!descriptor.commands[0].takes_arguments);
        assert!(!descriptor.has_help());
    }
}
