//! Extra charset labels for mail that declares non-standard encodings.
//!
//! Some mailers label Windows or ISO code pages with names that are not in
//! the WHATWG label list (`ansi`, `iso8859-15`). The registry maps those labels
//! to a real encoding. It is built once before the session is used and then
//! shared read-only.

use std::collections::HashMap;

use encoding_rs::Encoding;

use super::error::{EmailError, Result};

#[derive(Debug, Clone, Default)]
pub struct CharsetRegistry {
    aliases: HashMap<String, &'static Encoding>,
}

impl CharsetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the aliases seen in the wild.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("ansi", encoding_rs::WINDOWS_1252);
        registry.register("iso8859-15", encoding_rs::ISO_8859_15);
        registry
    }

    pub fn register(&mut self, label: &str, encoding: &'static Encoding) {
        self.aliases
            .insert(label.trim().to_ascii_lowercase(), encoding);
    }

    /// Registers `alias` as another name for the encoding labelled `target`.
    pub fn register_label(&mut self, alias: &str, target: &str) -> Result<()> {
        let encoding = Encoding::for_label(target.trim().as_bytes()).ok_or_else(|| {
            EmailError::ConfigError(format!(
                "Unknown encoding '{}' for charset alias '{}'",
                target, alias
            ))
        })?;
        self.register(alias, encoding);
        Ok(())
    }

    /// Returns the encoding registered for `label`, if any.
    pub fn lookup(&self, label: &str) -> Option<&'static Encoding> {
        self.aliases
            .get(&label.trim().trim_matches('"').to_ascii_lowercase())
            .copied()
    }

    pub fn is_registered(&self, label: &str) -> bool {
        self.lookup(label).is_some()
    }

    /// Decodes `bytes` with the encoding registered for `label`.
    pub fn decode(&self, label: &str, bytes: &[u8]) -> Option<String> {
        let encoding = self.lookup(label)?;
        let (text, _, _) = encoding.decode(bytes);
        Some(text.into_owned())
    }
}
