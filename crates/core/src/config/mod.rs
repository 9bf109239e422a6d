// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed scheduler configuration and the binding step
//!
//! A TOML document declares shared triggers and processors:
//!
//! ```toml
//! [trigger.nightly]
//! type = "schedule"
//! time = "02:30"
//! weekdays = ["mon", "wed"]
//!
//! [[processor]]
//! name = "backup"
//! kind = "shell"
//! command = "rsync -a /src /dst"
//! trigger = { type = "ref", name = "nightly" }
//! ```
//!
//! [`SchedulerConfig::bind`] turns it into [`ProcessorBinding`]s once,
//! resolving trigger references and building processors through a
//! [`ProcessorRegistry`].

mod registry;
mod trigger;




pub use registry::{params, ProcessorFactory, ProcessorRegistry};
pub use trigger::{time_of_day, TriggerDef};

use crate::clock::{Clock, SystemClock};
use crate::processor::ProcessorBinding;
use crate::trigger::TriggerError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading or binding configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("processor '{processor}': unknown kind '{kind}'")]
    UnknownKind { processor: String, kind: String },
    #[error("unknown trigger reference '{0}'")]
    UnknownReference(String),
    #[error("trigger reference cycle: {0}")]
    ReferenceCycle(String),
    #[error("duplicate processor name '{0}'")]
    DuplicateProcessor(String),
    #[error("processor '{processor}': {message}")]
    InvalidParams { processor: String, message: String },
    #[error(transparent)]
    Trigger(#[from] TriggerError),
}

/// One `[[processor]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorDef {
    pub name: String,
    pub kind: String,
    /// Absent means the processor only runs when forced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerDef>,
    /// Remaining keys, handed to the processor factory
    #[serde(flatten)]
    pub params: toml::Table,
}

/// Shared triggers plus processor definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default, rename = "trigger")]
    pub triggers: BTreeMap<String, TriggerDef>,
    #[serde(default, rename = "processor")]
    pub processors: Vec<ProcessorDef>,
}

impl FromStr for SchedulerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl SchedulerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    pub fn processor_names(&self) -> impl Iterator<Item = &str> {
        self.processors.iter().map(|p| p.name.as_str())
    }

    /// Check names and trigger definitions without building processors
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_unique_names()?;
        for def in &self.processors {
            if let Some(trigger) = &def.trigger {
                self.build_trigger(&def.name, trigger, &SystemClock)?;
            }
        }
        Ok(())
    }

    pub fn bind(&self, registry: &ProcessorRegistry) -> Result<Vec<ProcessorBinding>, ConfigError> {
        self.bind_with_clock(registry, &SystemClock)
    }

    /// Build every processor and a fresh trigger instance for each of them.
    ///
    /// Processors that reference the same shared trigger each get their own
    /// copy, so no trigger state is shared between runners.
    pub fn bind_with_clock<C: Clock>(
        &self,
        registry: &ProcessorRegistry,
        clock: &C,
    ) -> Result<Vec<ProcessorBinding>, ConfigError> {
        self.check_unique_names()?;
        self.processors
            .iter()
            .map(|def| {
                let trigger = def
                    .trigger
                    .as_ref()
                    .map(|t| self.build_trigger(&def.name, t, clock))
                    .transpose()?;
                let processor = registry.create(def)?;
                tracing::debug!(processor = %def.name, kind = %def.kind, "processor bound");
                Ok(ProcessorBinding::new(processor, trigger))
            })
            .collect()
    }

    fn check_unique_names(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for def in &self.processors {
            if def.name.is_empty() {
                return Err(ConfigError::InvalidParams {
                    processor: def.name.clone(),
                    message: "name must not be empty".to_string(),
                });
            }
            if !seen.insert(def.name.as_str()) {
                return Err(ConfigError::DuplicateProcessor(def.name.clone()));
            }
        }
        Ok(())
    }
}
