//! cgmman core library: domain types, translator registry, configuration.
//!
//! Public API surface:
//! - [`types`]: newtypes, translator rules, manager settings
//! - [`error`]: [`RegistryError`], [`ConfigError`]
//! - [`registry`]: the translator table and rule binding
//! - [`config`]: INI loaders for manager settings and translators

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{ConfigError, RegistryError};
pub use registry::TranslatorRegistry;
pub use types::{
    BoundRule, ConcreteCommand, Extension, LogLevel, ManagerSettings, TranslatorRule,
    DEFAULT_LOG_PREFIX, SOURCE_EXTENSION, STAGING_PREFIX, STOP_SENTINEL,
};
