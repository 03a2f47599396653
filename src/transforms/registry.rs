// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use super::{ParameterSchema, TransformKind};
use crate::traits::{Transform, TransformStage};

/// Newtype wrapper for the name -> transform table.
///
/// Built once at startup and shared read-only with the rule engine and the
/// template validator.
#[derive(Clone, Default)]
pub struct TransformRegistry(pub HashMap<String, Arc<dyn Transform>>);

impl TransformRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Registry holding every built-in transform
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for kind in TransformKind::all() {
            registry.register(kind.create());
        }
        registry
    }

    /// Register a transform under its own name, replacing any previous entry
    pub fn register(&mut self, transform: Arc<dyn Transform>) {
        self.0.insert(transform.name().to_string(), transform);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Transform>> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn describe(&self, name: &str) -> Option<ParameterSchema> {
        self.get(name).map(|t| t.describe())
    }

    /// Schemas of every registered transform, sorted by name
    pub fn describe_all(&self) -> Vec<ParameterSchema> {
        let mut schemas: Vec<ParameterSchema> = self.0.values().map(|t| t.describe()).collect();
        schemas.sort_by_key(|s| s.transform);
        schemas
    }

    /// Names of transforms usable in `stage`, sorted
    pub fn names_for(&self, stage: TransformStage) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .0
            .values()
            .filter(|t| t.stage() == stage)
            .map(|t| t.name())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.0.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("transform_count", &self.0.len())
            .field("transform_names", &names)
            .finish()
    }
}

impl From<HashMap<String, Arc<dyn Transform>>> for TransformRegistry {
    fn from(map: HashMap<String, Arc<dyn Transform>>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_cover_every_stage() {
        let registry = TransformRegistry::with_builtins();

        assert_eq!(registry.len(), TransformKind::all().len());
        assert_eq!(registry.names_for(TransformStage::Filter), vec!["ButterLowpass", "WindowAverage"]);
        assert_eq!(registry.names_for(TransformStage::Detect), vec!["DetectThreshold"]);
        assert_eq!(registry.names_for(TransformStage::Derive).len(), 10);
        assert!(registry.contains("DeriveHeading"));
        assert!(registry.get("DeriveMagic").is_none());
    }

    #[test]
    fn test_describe_all_sorted() {
        let registry = TransformRegistry::with_builtins();
        let names: Vec<&str> = registry.describe_all().iter().map(|s| s.transform).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(registry.describe("DeriveScaled").unwrap().func_params[0].name, "scalar");
    }

    #[test]
    fn test_debug_lists_names() {
        let registry = TransformRegistry::with_builtins();
        let debug = format!("{:?}", registry);
        assert!(debug.contains("transform_count: 13"));
        assert!(debug.contains("DetectThreshold"));
    }
}
