use serde::{Deserialize, Serialize};

use crate::ModuleDescriptor;

/// Serializable descriptor bundle used for export and bulk registration.
///
/// A bundle groups multiple [`ModuleDescriptor`] values with version
/// metadata, making it suitable for writing a registry snapshot to a single
/// JSON file and registering it elsewhere.
///
/// # Examples
///
/// ```
/// use command_registry_core::*;
///
/// let mut bundle = ModuleBundle::new("1.0.0", "2024-01-15T10:30:00Z");
/// bundle.modules.push(ModuleDescriptor::new("org.example.wifi", "Wifi"));
/// bundle.modules.push(ModuleDescriptor::new("org.example.sms", "Sms"));
///
/// assert_eq!(bundle.module_count(), 2);
/// assert_eq!(bundle.version, "1.0.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleBundle {
    /// Descriptor contract version (populated from
    /// [`DESCRIPTOR_CONTRACT_VERSION`](crate::DESCRIPTOR_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_version: Option<String>,
    /// Bundle format version (semver string).
    pub version: String,
    /// ISO-8601 timestamp for bundle creation.
    pub generated_at: String,
    /// Descriptors included in this bundle.
    pub modules: Vec<ModuleDescriptor>,
}

impl ModuleBundle {
    /// Creates an empty bundle.
    ///
    /// The `contract_version` is automatically set from
    /// [`DESCRIPTOR_CONTRACT_VERSION`](crate::DESCRIPTOR_CONTRACT_VERSION).
    pub fn new(version: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            contract_version: Some(crate::DESCRIPTOR_CONTRACT_VERSION.to_string()),
            version: version.into(),
            generated_at: generated_at.into(),
            modules: Vec::new(),
        }
    }

    /// Returns the number of descriptors in this bundle.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}
