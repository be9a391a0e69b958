//! Format registry for looking up strategies by name.

use std::collections::HashMap;

use crate::format::error::ConvertError;
use crate::format::formats::{
    DataloopFormat, GoogleCloudFormat, LabelboxFormat, SuperviselyFormat, VggFormat, VocFormat,
    VottFormat, YoloFormat,
};
use crate::format::traits::FormatStrategy;

/// Registry of available format strategies.
///
/// All built-in strategies are registered on creation. Further strategies can
/// be registered without touching the existing ones.
pub struct FormatRegistry {
    formats: HashMap<&'static str, Box<dyn FormatStrategy>>,
}

impl FormatRegistry {
    /// Create a new registry with all built-in strategies registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(Box::new(VocFormat));
        registry.register(Box::new(VggFormat::new()));
        registry.register(Box::new(DataloopFormat));
        registry.register(Box::new(VottFormat));
        registry.register(Box::new(GoogleCloudFormat));
        registry.register(Box::new(LabelboxFormat));
        registry.register(Box::new(SuperviselyFormat));
        registry.register(Box::new(YoloFormat));

        registry
    }

    /// Create a registry without any strategy.
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    /// Register a strategy, replacing one with the same id.
    pub fn register(&mut self, format: Box<dyn FormatStrategy>) {
        if self.formats.insert(format.id(), format).is_some() {
            log::debug!("Replaced a registered format strategy");
        }
    }

    /// Get a strategy by its id (case-insensitive).
    pub fn get(&self, id: &str) -> Option<&dyn FormatStrategy> {
        let id = id.trim().to_lowercase();
        self.formats.get(id.as_str()).map(|f| f.as_ref())
    }

    /// Get a strategy, failing with [`ConvertError::UnsupportedFormat`].
    pub fn resolve(&self, id: &str) -> Result<&dyn FormatStrategy, ConvertError> {
        self.get(id).ok_or_else(|| ConvertError::UnsupportedFormat {
            name: id.to_string(),
            available: self.ids(),
        })
    }

    /// Get all registered strategies, sorted by id.
    pub fn all(&self) -> Vec<&dyn FormatStrategy> {
        let mut all: Vec<&dyn FormatStrategy> = self.formats.values().map(|f| f.as_ref()).collect();
        all.sort_by_key(|f| f.id());
        all
    }

    /// Get all strategy ids, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.formats.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
