//! Translator registry.
//!
//! # Binding model
//!
//! The registry is populated once at startup. Each tracked file takes a
//! snapshot through [`TranslatorRegistry::bind_all`], which resolves the
//! `{file}` and `{name}` placeholders into owned [`ConcreteCommand`]s. Later
//! calls to [`TranslatorRegistry::register`] therefore never reach files that
//! were already bound, and per-file overrides never reach the registry.

use std::collections::BTreeMap;

use crate::error::RegistryError;
use crate::types::{BoundRule, ConcreteCommand, Extension, TranslatorRule};

/// Placeholder replaced by the staged file name.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Placeholder replaced by the logical name (no prefix, no extension).
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Mapping from target extension to conversion rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslatorRegistry {
    rules: BTreeMap<Extension, TranslatorRule>,
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // 1. Registration
    // -----------------------------------------------------------------------

    /// Install or replace the rule for `extension`.
    ///
    /// Returns the rule previously registered under the same extension.
    pub fn register(
        &mut self,
        extension: &str,
        expected_exit_code: i32,
        command_template: Vec<String>,
    ) -> Result<Option<TranslatorRule>, RegistryError> {
        let extension = Extension::parse(extension)?;
        if command_template.is_empty() {
            return Err(RegistryError::EmptyTemplate {
                extension: extension.to_string(),
            });
        }
        let rule = TranslatorRule {
            extension: extension.clone(),
            expected_exit_code,
            command_template,
        };
        Ok(self.rules.insert(extension, rule))
    }

    pub fn get(&self, extension: &Extension) -> Option<&TranslatorRule> {
        self.rules.get(extension)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in extension order.
    pub fn iter(&self) -> impl Iterator<Item = &TranslatorRule> {
        self.rules.values()
    }

    // -----------------------------------------------------------------------
    // 2. Binding
    // -----------------------------------------------------------------------

    /// Resolve the command for one extension against a specific file.
    pub fn bind(
        &self,
        extension: &str,
        logical_name: &str,
        raw_filename: &str,
    ) -> Result<ConcreteCommand, RegistryError> {
        let unknown = || RegistryError::UnknownExtension {
            extension: extension.to_owned(),
        };
        let key = Extension::parse(extension).map_err(|_| unknown())?;
        let rule = self.rules.get(&key).ok_or_else(unknown)?;
        Ok(resolve(rule, logical_name, raw_filename))
    }

    /// Snapshot every rule, resolved for one file.
    pub fn bind_all(&self, logical_name: &str, raw_filename: &str) -> BTreeMap<Extension, BoundRule> {
        self.rules
            .iter()
            .map(|(ext, rule)| {
                let bound = BoundRule {
                    expected_exit_code: rule.expected_exit_code,
                    command: resolve(rule, logical_name, raw_filename),
                };
                (ext.clone(), bound)
            })
            .collect()
    }
}

/// Substitute placeholders in every token of `rule`'s template.
pub fn resolve(rule: &TranslatorRule, logical_name: &str, raw_filename: &str) -> ConcreteCommand {
    let mut tokens = rule
        .command_template
        .iter()
        .map(|token| substitute(token, logical_name, raw_filename));
    // register() rejects empty templates
    let program = tokens.next().unwrap_or_default();
    ConcreteCommand {
        program,
        args: tokens.collect(),
    }
}

/// Single left-to-right pass; inserted text is never scanned again.
fn substitute(token: &str, logical_name: &str, raw_filename: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    while let Some(idx) = rest.find('{') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if let Some(after) = tail.strip_prefix(FILE_PLACEHOLDER) {
            out.push_str(raw_filename);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(NAME_PLACEHOLDER) {
            out.push_str(logical_name);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
