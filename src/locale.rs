// MIT License - Copyright (c) 2021 TJForc
// Locale lookups used to render event records

use std::collections::HashMap;

use serde_json::Value;

use crate::error::Result;

/// Source of translated strings.
///
/// Keys are flat dotted strings (`logbook.logEvent.36`); some keys hold a
/// second level addressed by `sub_key` (`label1`, `deviceType3`). A missing
/// key yields `None`, never an error.
pub trait Locale {
    fn translate(&self, key: &str, sub_key: Option<&str>) -> Option<String>;
}

/// In-memory locale built from the vendor's JSON locale file.
#[derive(Debug, Clone, Default)]
pub struct LocaleMap {
    entries: HashMap<String, Value>,
}

impl LocaleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a locale file: a JSON object of strings or objects of strings.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let entries: HashMap<String, Value> = serde_json::from_str(text)?;
        Ok(Self { entries })
    }

    /// Add or replace a plain string entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), Value::String(value.into()));
    }

    /// Add or replace a second-level entry.
    pub fn insert_sub(
        &mut self,
        key: impl Into<String>,
        sub_key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let entry = self
            .entries
            .entry(key.into())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(sub_key.into(), Value::String(value.into()));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Locale for LocaleMap {
    fn translate(&self, key: &str, sub_key: Option<&str>) -> Option<String> {
        let entry = self.entries.get(key)?;
        let value = match sub_key {
            None => entry,
            Some(sub) => entry.get(sub)?,
        };
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
