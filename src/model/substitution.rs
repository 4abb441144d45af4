// src/model/substitution.rs

//! `${key}` placeholder substitution.
//!
//! Lookup order for every placeholder:
//! 1. caller-supplied properties
//! 2. [`SystemProperties`] (configured values, then the process environment
//!    when enabled)
//! 3. otherwise the placeholder is kept literally.
//!
//! Substitution is a single pass. Replacement values are never scanned
//! again, and input without any match is returned borrowed.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is a valid regex")
    });

/// Fallback properties consulted when the caller did not supply a key.
#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    values: BTreeMap<String, String>,
    environment: bool,
}

impl SystemProperties {
    /// No system properties and no environment fallback.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(values: BTreeMap<String, String>, environment: bool) -> Self {
        Self {
            values,
            environment,
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        if let Some(v) = self.values.get(key) {
            return Some(v.clone());
        }
        if self.environment {
            return std::env::var(key).ok();
        }
        None
    }
}

/// Replace every `${key}` in `text`.
pub fn substitute<'a>(
    text: &'a str,
    properties: &BTreeMap<String, String>,
    system: &SystemProperties,
) -> Cow<'a, str> {
    PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        let key = &caps[1];
        match properties.get(key) {
            Some(v) => v.clone(),
            None => system
                .lookup(key)
                .unwrap_or_else(|| caps[0].to_string()),
        }
    })
}

/// Substitute every value of a configuration map in place.
pub fn substitute_values(
    values: &mut BTreeMap<String, String>,
    properties: &BTreeMap<String, String>,
    system: &SystemProperties,
) {
    for value in values.values_mut() {
        if let Cow::Owned(replaced) = substitute(value, properties, system) {
            *value = replaced;
        }
    }
}
