//! Model metadata: field descriptor tables and response mapping

mod builtin;
pub mod mapping;
pub mod models;

pub use mapping::{Record, deserialize_fragment, map_fragment};
pub use models::{CollectionInfo, FieldDescriptor, FieldKind, ModelDescriptor};

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Read-only source of descriptor tables, shared across concurrent callers
pub trait DescriptorProvider: Send + Sync {
    fn describe(&self, model: &str) -> Option<&ModelDescriptor>;
}

/// Descriptor tables keyed by model name
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    models: BTreeMap<String, ModelDescriptor>,
}

/// On-disk layout of a descriptor file: a list of `[[models]]` tables
#[derive(Debug, Deserialize)]
struct DescriptorFile {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the common SharePoint and Graph models
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for model in builtin::models() {
            registry.register(model);
        }
        registry
    }

    /// Add or replace a model table
    pub fn register(&mut self, model: ModelDescriptor) {
        if self.models.contains_key(&model.name) {
            log::debug!("Replacing descriptor table for model '{}'", model.name);
        }
        self.models.insert(model.name.clone(), model);
    }

    pub fn with(mut self, model: ModelDescriptor) -> Self {
        self.register(model);
        self
    }

    /// Parse `[[models]]` tables from TOML text and register them
    pub fn extend_from_toml(&mut self, text: &str) -> Result<usize> {
        let file: DescriptorFile =
            toml::from_str(text).context("Failed to parse model descriptor file")?;
        let count = file.models.len();
        for model in file.models {
            self.register(model);
        }
        Ok(count)
    }

    /// Load additional model tables from a TOML file
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read descriptor file: {}", path.display()))?;
        let count = self
            .extend_from_toml(&text)
            .with_context(|| format!("Invalid descriptor file: {}", path.display()))?;
        log::info!("Loaded {} model descriptors from {}", count, path.display());
        Ok(count)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl DescriptorProvider for DescriptorRegistry {
    fn describe(&self, model: &str) -> Option<&ModelDescriptor> {
        self.models.get(model)
    }
}
