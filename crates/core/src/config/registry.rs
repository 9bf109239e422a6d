// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor kinds available to configuration

use super::{ConfigError, ProcessorDef};
use crate::processor::Processor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a processor from its name and extra configuration keys
pub type ProcessorFactory =
    Box<dyn Fn(&str, &toml::Table) -> Result<Arc<dyn Processor>, ConfigError> + Send + Sync>;

/// Maps a processor `kind` to the factory that builds it
#[derive(Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind, replacing any previous factory for it
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&str, &toml::Table) -> Result<Arc<dyn Processor>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn with<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str, &toml::Table) -> Result<Arc<dyn Processor>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.register(kind, factory);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn create(&self, def: &ProcessorDef) -> Result<Arc<dyn Processor>, ConfigError> {
        let factory = self
            .factories
            .get(&def.kind)
            .ok_or_else(|| ConfigError::UnknownKind {
                processor: def.name.clone(),
                kind: def.kind.clone(),
            })?;
        factory(&def.name, &def.params)
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Deserialize a processor's extra keys into a typed parameter struct
pub fn params<T: serde::de::DeserializeOwned>(
    processor: &str,
    params: &toml::Table,
) -> Result<T, ConfigError> {
    toml::Value::Table(params.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidParams {
            processor: processor.to_string(),
            message: e.message().to_string(),
        })
}
