//! Command and module registry.
//!
//! Feature modules announce the commands they execute with a
//! [`ModuleDescriptor`](command_registry_core::ModuleDescriptor); transports
//! resolve an incoming command name or short alias to the module that owns
//! it. The [`Registry`] is the single source of truth connecting the two:
//!
//! - it resolves names and aliases ([`Registry::lookup`],
//!   [`Registry::resolve`]),
//! - it rejects conflicting default and sub-command bindings atomically
//!   ([`Clash`]),
//! - it mirrors descriptors into a [`ModuleStore`] and help lines into a
//!   [`HelpStore`], replaying the store at construction,
//! - it notifies [`ChangeListener`]s when modules come and go.
//!
//! # Quick start
//!
//! ```
//! use command_registry::Registry;
//! use command_registry_core::{CommandSpec, ModuleDescriptor};
//!
//! let registry = Registry::builder().build().unwrap();
//!
//! registry
//!     .register_module(
//!         ModuleDescriptor::new("org.example.status", "Status")
//!             .with_command(CommandSpec::new("status").as_default()),
//!     )
//!     .unwrap();
//!
//! // A second default binding for "status" is a clash and changes nothing
//! let err = registry
//!     .register_module(
//!         ModuleDescriptor::new("org.example.other", "Other")
//!             .with_command(CommandSpec::new("status").as_default()),
//!     )
//!     .unwrap_err();
//! assert!(err.as_clash().is_some());
//! assert_eq!(registry.module_packages(), vec!["org.example.status"]);
//! ```
//!
//! Descriptors can be staged from disk with [`DescriptorSet`] and the
//! registry tuned with a YAML [`RegistryConfig`].

mod config;
mod entry;
mod error;
mod listener;
mod loader;
mod registry;
mod store;

pub use config::{AliasPolicy, RegistryConfig, StorageConfig};
pub use entry::CommandEntry;
pub use error::{Clash, RegistryError, Result, StoreError};
pub use listener::{ChangeEvent, ChangeListener};
pub use loader::{DescriptorSet, DescriptorSetBuilder, DescriptorSource};
pub use registry::{LoadReport, Registry, RegistryBuilder, Resolution, SkippedRecord};
pub use store::{HelpStore, LoadedRecord, MemoryStore, ModuleStore};
