//! The tuning session's configuration store.
//!
//! A flat string-to-string map with insertion order preserved for
//! serialization, typed accessors, and deferred registration of
//! per-component option descriptors (key, default, help text). Strategies
//! and pipeline stages read their tunables through this store rather than
//! through bespoke struct fields, so a client can override any of them from
//! a single `key=value` configuration file.

use std::collections::HashMap;

use crate::error::ModelError;

/// One registered option descriptor: a default value and a help string,
/// consulted by [`ConfigStore::get`] when the key was never explicitly set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionInfo {
    pub key: String,
    pub default: String,
    pub help: String,
}

impl OptionInfo {
    #[must_use]
    pub fn new(key: impl Into<String>, default: impl Into<String>, help: impl Into<String>) -> Self {
        Self { key: key.into(), default: default.into(), help: help.into() }
    }
}

/// Flat, insertion-ordered key/value configuration with registered defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    values: HashMap<String, String>,
    order: Vec<String>,
    defaults: HashMap<String, String>,
}

impl ConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch of option descriptors. Registering an already-set
    /// key does not overwrite its value; it only supplies a fallback default
    /// for callers who never set it.
    pub fn register(&mut self, info: &[OptionInfo]) {
        for opt in info {
            self.defaults.insert(opt.key.clone(), opt.default.clone());
        }
    }

    /// Set `key` to `value`, recording insertion order on first write.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.insert(key, value.into());
    }

    /// Look up a raw string value, falling back to a registered default.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigMissing`] if the key was neither set nor
    /// registered.
    pub fn get(&self, key: &str) -> Result<&str, ModelError> {
        if let Some(v) = self.values.get(key) {
            return Ok(v.as_str());
        }
        self.defaults
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ModelError::ConfigMissing { key: key.to_string() })
    }

    /// Like [`Self::get`], but returns `default` instead of erroring when
    /// the key is entirely unknown (neither set, nor registered).
    #[must_use]
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).map(str::to_string).unwrap_or_else(|_| default.to_string())
    }

    /// Parse the value as a boolean. Recognizes (case-insensitively)
    /// `1/true/yes/on` and `0/false/no/off`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigMissing`] or [`ModelError::ConfigInvalid`].
    pub fn bool(&self, key: &str) -> Result<bool, ModelError> {
        let raw = self.get(key)?;
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ModelError::ConfigInvalid { key: key.to_string(), raw: raw.to_string(), want: "bool" }),
        }
    }

    /// Parse the value as a base-10 integer.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigMissing`] or [`ModelError::ConfigInvalid`].
    pub fn int(&self, key: &str) -> Result<i64, ModelError> {
        let raw = self.get(key)?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| ModelError::ConfigInvalid { key: key.to_string(), raw: raw.to_string(), want: "int" })
    }

    /// Parse the value as a real number.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigMissing`] or [`ModelError::ConfigInvalid`].
    pub fn real(&self, key: &str) -> Result<f64, ModelError> {
        let raw = self.get(key)?;
        raw.trim()
            .parse::<f64>()
            .map_err(|_| ModelError::ConfigInvalid { key: key.to_string(), raw: raw.to_string(), want: "real" })
    }

    /// Split the value on commas or whitespace and return the element count.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigMissing`] if the key is unknown.
    pub fn array_len(&self, key: &str) -> Result<usize, ModelError> {
        Ok(self.array_items(key)?.len())
    }

    /// Return the `i`-th comma/whitespace separated element of the value.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigMissing`] if the key is unknown, or
    /// [`ModelError::ConfigInvalid`] if `i` is out of range.
    pub fn array_item(&self, key: &str, i: usize) -> Result<String, ModelError> {
        let items = self.array_items(key)?;
        items.get(i).cloned().ok_or_else(|| ModelError::ConfigInvalid {
            key: key.to_string(),
            raw: i.to_string(),
            want: "array index in range",
        })
    }

    fn array_items(&self, key: &str) -> Result<Vec<String>, ModelError> {
        let raw = self.get(key)?;
        Ok(raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Load `key=value` lines from `text`. `#` starts a comment to end of
    /// line; blank lines are skipped. A key repeated later in the text wins.
    pub fn load_str(&mut self, text: &str) {
        for line in text.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((k, v)) = line.split_once('=') {
                self.set(k.trim(), v.trim());
            }
        }
    }

    /// Serialize back to `key=value` lines in insertion order.
    #[must_use]
    pub fn to_string_lines(&self) -> String {
        self.order
            .iter()
            .map(|k| format!("{k}={}", self.values[k]))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut c = ConfigStore::new();
        c.set("STRATEGY", "pro");
        assert_eq!(c.get("STRATEGY").unwrap(), "pro");
    }

    #[test]
    fn registered_default_used_when_unset() {
        let mut c = ConfigStore::new();
        c.register(&[OptionInfo::new("REFLECT", "1.0", "reflection coefficient")]);
        assert_eq!(c.get("REFLECT").unwrap(), "1.0");
    }

    #[test]
    fn explicit_value_overrides_default() {
        let mut c = ConfigStore::new();
        c.register(&[OptionInfo::new("REFLECT", "1.0", "reflection coefficient")]);
        c.set("REFLECT", "1.5");
        assert_eq!(c.get("REFLECT").unwrap(), "1.5");
    }

    #[test]
    fn unknown_key_errors() {
        let c = ConfigStore::new();
        assert!(matches!(c.get("NOPE"), Err(ModelError::ConfigMissing { .. })));
    }

    #[test]
    fn bool_recognizes_aliases() {
        let mut c = ConfigStore::new();
        for (raw, expected) in [("1", true), ("true", true), ("YES", true), ("on", true), ("0", false), ("no", false), ("OFF", false)] {
            c.set("FLAG", raw);
            assert_eq!(c.bool("FLAG").unwrap(), expected, "raw={raw}");
        }
    }

    #[test]
    fn load_str_respects_comments_and_later_wins() {
        let mut c = ConfigStore::new();
        c.load_str("# comment\nSTRATEGY=pro\n\nCONVERGE_FV=1e-4 # inline comment\nSTRATEGY=angel\n");
        assert_eq!(c.get("STRATEGY").unwrap(), "angel");
        assert_eq!(c.real("CONVERGE_FV").unwrap(), 1e-4);
    }

    #[test]
    fn array_item_splits_on_comma_or_whitespace() {
        let mut c = ConfigStore::new();
        c.set("LEEWAY", "0.1, 0.2 0.3");
        assert_eq!(c.array_len("LEEWAY").unwrap(), 3);
        assert_eq!(c.array_item("LEEWAY", 1).unwrap(), "0.2");
    }

    #[test]
    fn serialization_preserves_insertion_order() {
        let mut c = ConfigStore::new();
        c.set("B", "2");
        c.set("A", "1");
        assert_eq!(c.to_string_lines(), "B=2\nA=1");
    }
}
