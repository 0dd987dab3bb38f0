//! Descriptor validation.
//!
//! Validates structural invariants of a [`ModuleDescriptor`], catching
//! errors such as empty package ids, malformed aliases and dangling help
//! lines before the registry indexes anything.
//!
//! # Examples
//!
//! ```
//! use command_registry_core::*;
//!
//! let good = ModuleDescriptor::new("org.example.sms", "Sms")
//!     .with_command(CommandSpec::new("sms").with_alias("s"));
//! assert!(validate_descriptor(&good).is_empty());
//!
//! // Invalid: alias contains whitespace
//! let bad = ModuleDescriptor::new("org.example.sms", "Sms")
//!     .with_command(CommandSpec::new("sms").with_alias("s m"));
//! assert!(!validate_descriptor(&bad).is_empty());
//! ```

use thiserror::Error;

use crate::{CommandSpec, ModuleDescriptor};

/// Descriptor validation errors.
///
/// Each variant describes a specific structural problem found during
/// validation. The `Display` impl provides a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Package id is empty or whitespace-only.
    #[error("package id cannot be empty")]
    EmptyPackageId,
    /// A command spec has an empty full name.
    #[error("command name cannot be empty")]
    EmptyCommandName,
    /// Command name contains whitespace and could never be looked up.
    #[error("invalid command name: {0:?}")]
    InvalidCommandName(String),
    /// Alias is empty or contains whitespace.
    #[error("invalid alias {alias:?} for command {command}")]
    InvalidAlias { command: String, alias: String },
    /// Sub-command is empty or contains whitespace.
    #[error("invalid sub-command {sub_command:?} for command {command}")]
    InvalidSubCommand { command: String, sub_command: String },
    /// A help line references a command the descriptor does not offer.
    #[error("help references unknown command: {0}")]
    HelpForUnknownCommand(String),
    /// A help line references a sub-command no spec of the command offers.
    #[error("help references unknown sub-command: {command} {sub_command}")]
    HelpForUnknownSubCommand { command: String, sub_command: String },
}

/// Validates a module descriptor.
///
/// Returns every problem found; an empty vector means the descriptor can be
/// handed to the registry.
///
/// # Examples
///
/// ```
/// use command_registry_core::*;
///
/// let descriptor = ModuleDescriptor::new("org.example.misc", "Misc")
///     .with_command(CommandSpec::new("sysinfo").as_default())
///     .with_help(CommandHelp::new("uptime", ArgType::None, "Show uptime"));
///
/// let errors = validate_descriptor(&descriptor);
/// assert_eq!(
///     errors,
///     vec![ValidationError::HelpForUnknownCommand("uptime".into())]
/// );
/// ```
pub fn validate_descriptor(descriptor: &ModuleDescriptor) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if descriptor.package_id.trim().is_empty() {
        errors.push(ValidationError::EmptyPackageId);
        return errors;
    }

    for spec in &descriptor.commands {
        errors.extend(validate_spec(spec));
    }

    for help in &descriptor.help {
        if !descriptor.offers(&help.command) {
            errors.push(ValidationError::HelpForUnknownCommand(help.command.clone()));
            continue;
        }
        if let Some(sub) = &help.sub_command {
            if !descriptor.offers_sub_command(&help.command, sub) {
                errors.push(ValidationError::HelpForUnknownSubCommand {
                    command: help.command.clone(),
                    sub_command: sub.clone(),
                });
            }
        }
    }

    errors
}

fn validate_spec(spec: &CommandSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let command = spec.full_name.as_str();

    if command.trim().is_empty() {
        errors.push(ValidationError::EmptyCommandName);
        return errors;
    }
    if !is_token(command) {
        errors.push(ValidationError::InvalidCommandName(command.to_string()));
    }

    if let Some(alias) = &spec.short_alias {
        if !is_token(alias) {
            errors.push(ValidationError::InvalidAlias {
                command: command.to_string(),
                alias: alias.clone(),
            });
        }
    }

    if let Some(sub) = &spec.sub_command {
        if !is_token(sub) {
            errors.push(ValidationError::InvalidSubCommand {
                command: command.to_string(),
                sub_command: sub.clone(),
            });
        }
    }

    errors
}

/// A lookup key: non-empty, no whitespace.
fn is_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use crate::{ArgType, CommandHelp};

    use super::*;

    #[test]
    fn test_rejects_empty_package_id() {
        let descriptor = ModuleDescriptor::new("  ", "Nameless")
            .with_command(CommandSpec::new("wifi"));
        assert_eq!(
            validate_descriptor(&descriptor),
            vec![ValidationError::EmptyPackageId]
        );
    }

    #[test]
    fn test_rejects_empty_command_and_bad_alias() {
        let descriptor = ModuleDescriptor::new("p", "P")
            .with_command(CommandSpec::new(""))
            .with_command(CommandSpec::new("wifi").with_alias(""));

        let errors = validate_descriptor(&descriptor);
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyCommandName,
                ValidationError::InvalidAlias {
                    command: "wifi".into(),
                    alias: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_rejects_whitespace_sub_command() {
        let descriptor = ModuleDescriptor::new("p", "P")
            .with_command(CommandSpec::new("rm").with_sub_command("the path"));
        assert!(matches!(
            validate_descriptor(&descriptor).as_slice(),
            [ValidationError::InvalidSubCommand { .. }]
        ));
    }

    #[test]
    fn test_rejects_help_for_unknown_sub_command() {
        let descriptor = ModuleDescriptor::new("p", "P")
            .with_command(CommandSpec::new("wifi").as_default())
            .with_command(CommandSpec::new("wifi").with_sub_command("list"))
            .with_help(CommandHelp::new("wifi", ArgType::None, "List networks").with_sub_command("list"))
            .with_help(CommandHelp::new("wifi", ArgType::None, "Scan").with_sub_command("scan"));

        assert_eq!(
            validate_descriptor(&descriptor),
            vec![ValidationError::HelpForUnknownSubCommand {
                command: "wifi".into(),
                sub_command: "scan".into(),
            }]
        );
    }

    #[test]
    fn test_accepts_valid_descriptor() {
        let descriptor = ModuleDescriptor::new("org.example.filewrite", "Filewrite")
            .with_command(CommandSpec::new("rm").with_sub_command("path").as_default().with_arguments())
            .with_help(
                CommandHelp::new("rm", ArgType::Path, "Delete the given path").with_sub_command("path"),
            );
        assert!(validate_descriptor(&descriptor).is_empty());
    }
}
