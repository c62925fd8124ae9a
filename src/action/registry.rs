//! Action registry: name → factory.

use super::Action;
use crate::pipeline::{PipelineError, PipelineResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Creates a fresh action instance
pub type ActionFactory = fn() -> Arc<dyn Action>;

/// Explicit, injectable lookup table of actions.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    factories: BTreeMap<String, ActionFactory>,
}

impl ActionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in reference actions
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, factory) in crate::actions::BUILTIN {
            registry.register(*name, *factory);
        }
        registry
    }

    /// Register or replace an action
    pub fn register(&mut self, name: impl Into<String>, factory: ActionFactory) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate an action by name
    pub fn resolve(&self, name: &str) -> PipelineResult<Arc<dyn Action>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| PipelineError::UnknownAction(name.to_string()))
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
