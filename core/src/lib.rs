//! Module descriptor primitives for the command registry.
//!
//! This crate defines the values feature modules use to announce the
//! commands they can execute:
//!
//! - [`ModuleDescriptor`]: one installable module: package id, display name,
//!   command specs and help lines.
//! - [`CommandSpec`]: a full command name with optional short alias,
//!   sub-command and default-binding flags.
//! - [`CommandHelp`]: a user-facing help line with its [`ArgType`].
//! - [`ModuleBundle`]: a versioned bundle of descriptors for export.
//!
//! Validation ([`validate_descriptor`]) catches structural errors such as
//! empty names, malformed aliases and help lines for commands the module does
//! not offer.
//!
//! # Example
//!
//! ```
//! use command_registry_core::*;
//!
//! let descriptor = ModuleDescriptor::new("org.example.ringermode", "Ringermode")
//!     .with_command(CommandSpec::new("ringermode").with_alias("ringer").as_default())
//!     .with_command(CommandSpec::new("ringermode").with_sub_command("silent"))
//!     .with_help(
//!         CommandHelp::new("ringermode", ArgType::None, "Switch to silent mode")
//!             .with_sub_command("silent"),
//!     );
//!
//! assert_eq!(descriptor.command_names(), vec!["ringermode"]);
//! assert!(validate_descriptor(&descriptor).is_empty());
//! ```

mod package;
mod types;
mod validate;

pub use package::ModuleBundle;
pub use types::*;
pub use validate::{ValidationError, validate_descriptor};
