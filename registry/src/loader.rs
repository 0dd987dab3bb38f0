//! Descriptor loading with a builder that combines sources.
//!
//! Provides [`DescriptorSet`] for reading module descriptors from disk and
//! [`DescriptorSetBuilder`] for merging several sources into one set. The
//! set is only a staging area; nothing is registered until the caller hands
//! each descriptor to [`Registry::register_module`](crate::Registry::register_module).
//!
//! Every failure names the file it came from, and a package id defined in
//! two places is an error rather than a silent replacement.
//!
//! # Loading patterns
//!
//! ```no_run
//! use command_registry::DescriptorSet;
//!
//! // A directory of one-descriptor JSON files
//! let set = DescriptorSet::from_dir("modules/").unwrap();
//!
//! // A single ModuleBundle JSON file
//! let set = DescriptorSet::from_bundle("modules.json").unwrap();
//!
//! // Every source is loaded and merged
//! let set = DescriptorSet::builder()
//!     .from_dir("modules/")
//!     .from_bundle("modules.json")
//!     .build()
//!     .unwrap();
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use command_registry_core::{ModuleBundle, ModuleDescriptor};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{RegistryError, Result};

/// Describes where a [`DescriptorSet`] was loaded from.
#[derive(Debug, Clone)]
pub enum DescriptorSource {
    /// A directory of individual JSON descriptor files.
    Directory(PathBuf),
    /// A single [`ModuleBundle`] JSON file.
    Bundle(PathBuf),
    /// A single descriptor JSON file.
    File(PathBuf),
    /// Several sources merged by a [`DescriptorSetBuilder`].
    Multiple(Vec<DescriptorSource>),
}

/// Descriptors keyed by package id, in package order.
#[derive(Debug)]
pub struct DescriptorSet {
    modules: BTreeMap<String, ModuleDescriptor>,
    /// Package id -> file the descriptor was read from
    origins: BTreeMap<String, PathBuf>,
    source: DescriptorSource,
}

impl DescriptorSet {
    /// Returns a new [`DescriptorSetBuilder`] for merging several sources.
    pub fn builder() -> DescriptorSetBuilder {
        DescriptorSetBuilder::new()
    }

    fn empty(source: DescriptorSource) -> Self {
        Self {
            modules: BTreeMap::new(),
            origins: BTreeMap::new(),
            source,
        }
    }

    /// Loads whatever `source` points at.
    pub fn load(source: &DescriptorSource) -> Result<Self> {
        match source {
            DescriptorSource::Directory(path) => Self::from_dir(path),
            DescriptorSource::Bundle(path) => Self::from_bundle(path),
            DescriptorSource::File(path) => Self::from_file(path),
            DescriptorSource::Multiple(sources) => DescriptorSetBuilder {
                sources: sources.clone(),
            }
            .build(),
        }
    }

    /// Loads descriptors from a directory of `*.json` files.
    ///
    /// Files are read in name order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Load`] naming the directory or file that
    /// could not be read or parsed, and [`RegistryError::DuplicatePackage`]
    /// if two files describe the same package.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path).map_err(|e| load_error(path, e))? {
            let file_path = entry.map_err(|e| load_error(path, e))?.path();
            if file_path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(file_path);
            }
        }
        files.sort();

        let mut set = Self::empty(DescriptorSource::Directory(path.to_path_buf()));
        for file_path in files {
            let descriptor: ModuleDescriptor = read_json(&file_path)?;
            debug!(file = %file_path.display(), package = %descriptor.package_id, "Loaded descriptor");
            set.insert(descriptor, file_path)?;
        }
        Ok(set)
    }

    /// Loads descriptors from a single [`ModuleBundle`] JSON file.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bundle: ModuleBundle = read_json(path)?;

        let mut set = Self::empty(DescriptorSource::Bundle(path.to_path_buf()));
        for descriptor in bundle.modules {
            set.insert(descriptor, path.to_path_buf())?;
        }
        Ok(set)
    }

    /// Loads a single descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let descriptor: ModuleDescriptor = read_json(path)?;

        let mut set = Self::empty(DescriptorSource::File(path.to_path_buf()));
        set.insert(descriptor, path.to_path_buf())?;
        Ok(set)
    }

    fn insert(&mut self, descriptor: ModuleDescriptor, origin: PathBuf) -> Result<()> {
        match self.origins.entry(descriptor.package_id.clone()) {
            Entry::Occupied(first) => Err(RegistryError::DuplicatePackage {
                package_id: descriptor.package_id,
                first: first.get().clone(),
                second: origin,
            }),
            Entry::Vacant(v) => {
                v.insert(origin);
                self.modules.insert(descriptor.package_id.clone(), descriptor);
                Ok(())
            }
        }
    }

    pub fn get(&self, package_id: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(package_id)
    }

    pub fn contains(&self, package_id: &str) -> bool {
        self.modules.contains_key(package_id)
    }

    /// File the descriptor of `package_id` was read from.
    pub fn origin(&self, package_id: &str) -> Option<&Path> {
        self.origins.get(package_id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterates descriptors in package id order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    /// Consumes the set, yielding descriptors in package id order.
    pub fn into_descriptors(self) -> Vec<ModuleDescriptor> {
        self.modules.into_values().collect()
    }

    pub fn source(&self) -> &DescriptorSource {
        &self.source
    }
}

/// Builder that merges several sources into one [`DescriptorSet`].
///
/// Every source must load. The first failure is returned with the path it
/// concerns, and a package id defined by two sources is an error.
pub struct DescriptorSetBuilder {
    sources: Vec<DescriptorSource>,
}

impl DescriptorSetBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a directory of JSON descriptor files as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DescriptorSource::Directory(path.into()));
        self
    }

    /// Adds a [`ModuleBundle`] file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DescriptorSource::Bundle(path.into()));
        self
    }

    /// Adds a single descriptor file as a source.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DescriptorSource::File(path.into()));
        self
    }

    /// Loads every configured source and merges the results.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoSources`] if no source was added, or the
    /// first load or duplicate-package error.
    pub fn build(self) -> Result<DescriptorSet> {
        if self.sources.is_empty() {
            return Err(RegistryError::NoSources);
        }

        let mut merged = DescriptorSet::empty(DescriptorSource::Multiple(self.sources.clone()));
        for source in &self.sources {
            let set = DescriptorSet::load(source)?;
            debug!(source = ?source, modules = set.len(), "Loaded descriptor source");

            let DescriptorSet {
                modules, mut origins, ..
            } = set;
            for (package_id, descriptor) in modules {
                let origin = origins.remove(&package_id).unwrap_or_default();
                merged.insert(descriptor, origin)?;
            }
        }

        Ok(merged)
    }
}

impl Default for DescriptorSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path).map_err(|e| load_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| load_error(path, e))
}

fn load_error(path: &Path, err: impl Into<RegistryError>) -> RegistryError {
    RegistryError::Load {
        path: path.to_path_buf(),
        source: Box::new(err.into()),
    }
}
