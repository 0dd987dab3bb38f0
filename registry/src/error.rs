//! Error types for registry operations.
//!
//! Clashes, descriptor validation failures, persistence failures and the
//! I/O and serialization failures of the loader and configuration layers all
//! surface through [`RegistryError`]. A not-found lookup is not an error; it
//! is an `Option::None`.

use std::path::PathBuf;

use command_registry_core::{BindingSlot, ValidationError};
use thiserror::Error;

/// Two providers claimed the same exclusive binding.
///
/// Returned from [`CommandEntry::add_provider`](crate::CommandEntry::add_provider)
/// and wrapped in [`RegistryError::Clash`] by
/// [`Registry::register_module`](crate::Registry::register_module). The
/// registry never decides whether a clash is fatal; the caller does.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Clash {
    /// A default slot of the command is already owned.
    #[error("command '{command}': {slot:?} binding is held by '{holder}', '{claimant}' cannot claim it")]
    DefaultBinding {
        command: String,
        slot: BindingSlot,
        holder: String,
        claimant: String,
    },

    /// The sub-command is already provided by another spec.
    #[error("sub-command '{command} {sub_command}' is held by '{holder}', '{claimant}' cannot claim it")]
    SubCommand {
        command: String,
        sub_command: String,
        holder: String,
        claimant: String,
    },

    /// The alias already resolves to a different command (only raised under
    /// [`AliasPolicy::Reject`](crate::AliasPolicy::Reject)).
    #[error("alias '{alias}' resolves to '{existing}', '{claimant}' cannot point it at '{command}'")]
    Alias {
        alias: String,
        existing: String,
        command: String,
        claimant: String,
    },

    /// The name is a full command name and also an alias of a different
    /// command, so one of them would be unreachable by lookup. Raised under
    /// every [`AliasPolicy`](crate::AliasPolicy).
    #[error("'{alias}' would be both a command name and an alias of '{command}', '{claimant}' cannot register it")]
    AliasShadowsCommand {
        alias: String,
        command: String,
        claimant: String,
    },
}

/// Errors raised by a [`ModuleStore`](crate::ModuleStore) or
/// [`HelpStore`](crate::HelpStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend-specific failure (database, network share, ...).
    #[error("store backend error: {0}")]
    Backend(String),

    /// A single persisted record could not be turned back into a descriptor.
    #[error("failed to decode stored module '{package_id}': {reason}")]
    Decode { package_id: String, reason: String },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Conflicting default or sub-command binding.
    #[error("command clash: {0}")]
    Clash(#[from] Clash),

    /// The descriptor failed structural validation.
    #[error("invalid module descriptor '{package_id}': {}", summarize(.errors))]
    Invalid {
        package_id: String,
        errors: Vec<ValidationError>,
    },

    /// The durable store rejected a write. The in-memory change stays applied.
    #[error("persistence error: {0}")]
    Store(#[from] StoreError),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A descriptor source could not be read or parsed.
    #[error("failed to load '{}': {source}", path.display())]
    Load {
        path: PathBuf,
        source: Box<RegistryError>,
    },

    /// Two descriptor files define the same package.
    #[error("package '{package_id}' is defined in both '{}' and '{}'", first.display(), second.display())]
    DuplicatePackage {
        package_id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A descriptor set was built without any source.
    #[error("no descriptor sources given")]
    NoSources,
}

impl RegistryError {
    /// Returns the clash details if this is a clash.
    pub fn as_clash(&self) -> Option<&Clash> {
        match self {
            Self::Clash(clash) => Some(clash),
            _ => None,
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_display_joins_errors() {
        let err = RegistryError::Invalid {
            package_id: "p".into(),
            errors: vec![
                ValidationError::EmptyCommandName,
                ValidationError::HelpForUnknownCommand("x".into()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid module descriptor 'p': command name cannot be empty; help references unknown command: x"
        );
    }

    #[test]
    fn test_as_clash() {
        let err = RegistryError::from(Clash::SubCommand {
            command: "wifi".into(),
            sub_command: "list".into(),
            holder: "a".into(),
            claimant: "b".into(),
        });
        assert!(err.as_clash().is_some());
        assert!(RegistryError::NoSources.as_clash().is_none());
    }
}
