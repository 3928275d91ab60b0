#![forbid(unsafe_code)]

//! Key-based string catalog with locale fallback and `{var}` interpolation.
//!
//! # Lookup order
//!
//! For a request `(locale, key)` the catalog tries, in order:
//!
//! 1. the exact locale (`"pt-BR"`)
//! 2. its base language (`"pt"`)
//! 3. each locale of the fallback chain, in order
//!
//! and returns the first hit. A miss everywhere is `None`; callers decide
//! what to show instead (usually the key itself).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Errors produced while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I18nError {
    /// Locale tag is empty or contains characters outside `[A-Za-z0-9_-]`.
    InvalidLocale(String),
    /// Key is empty.
    EmptyKey,
}

impl fmt::Display for I18nError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLocale(tag) => write!(f, "invalid locale tag: {tag:?}"),
            Self::EmptyKey => write!(f, "catalog keys must not be empty"),
        }
    }
}

impl std::error::Error for I18nError {}

/// Strings for a single locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleStrings {
    strings: HashMap<String, String>,
}

impl LocaleStrings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one string.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.strings.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.strings.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Coverage of one locale against the union of all keys.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleCoverage {
    pub locale: String,
    pub present: usize,
    pub missing: Vec<String>,
    pub coverage_percent: f64,
}

/// Per-locale coverage for a whole catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoverageReport {
    pub total_keys: usize,
    pub locales: Vec<LocaleCoverage>,
}

impl CoverageReport {
    /// Coverage entry for `locale`.
    #[must_use]
    pub fn locale(&self, locale: &str) -> Option<&LocaleCoverage> {
        self.locales.iter().find(|c| c.locale == locale)
    }
}

/// Externalized strings for every supported locale.
#[derive(Debug, Clone, Default)]
pub struct StringCatalog {
    locales: BTreeMap<String, LocaleStrings>,
    fallback_chain: Vec<String>,
}

impl StringCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the strings of `locale`.
    pub fn add_locale(
        &mut self,
        locale: impl Into<String>,
        strings: LocaleStrings,
    ) -> Result<(), I18nError> {
        let locale = locale.into();
        validate_locale(&locale)?;
        if strings.keys().any(str::is_empty) {
            return Err(I18nError::EmptyKey);
        }
        self.locales.insert(locale, strings);
        Ok(())
    }

    /// Add one string to `locale`, creating the locale if needed.
    pub fn insert(
        &mut self,
        locale: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), I18nError> {
        validate_locale(locale)?;
        let key = key.into();
        if key.is_empty() {
            return Err(I18nError::EmptyKey);
        }
        self.locales
            .entry(locale.to_owned())
            .or_default()
            .insert(key, value);
        Ok(())
    }

    /// Set the locales consulted after the requested one misses.
    pub fn set_fallback_chain<I, S>(&mut self, chain: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_chain = chain.into_iter().map(Into::into).collect();
    }

    #[must_use]
    pub fn fallback_chain(&self) -> &[String] {
        &self.fallback_chain
    }

    /// Registered locale tags, sorted.
    pub fn locales(&self) -> impl Iterator<Item = &str> + '_ {
        self.locales.keys().map(String::as_str)
    }

    /// Look up `key` for `locale`, following the fallback order.
    #[must_use]
    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        self.for_locale(locale)
            .into_iter()
            .find_map(|tag| self.locales.get(tag).and_then(|s| s.get(key)))
    }

    /// Look up `key` and substitute `{name}` placeholders from `args`.
    ///
    /// Placeholders without a matching argument are left as-is.
    #[must_use]
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> Option<String> {
        self.get(locale, key).map(|template| interpolate(template, args))
    }

    /// The ordered list of locale tags consulted for `locale`.
    ///
    /// Never panics, whatever the input.
    #[must_use]
    pub fn for_locale<'a>(&'a self, locale: &'a str) -> Vec<&'a str> {
        let mut chain: Vec<&str> = Vec::with_capacity(2 + self.fallback_chain.len());
        let mut push = |tag: &'a str| {
            if !tag.is_empty() && !chain.contains(&tag) {
                chain.push(tag);
            }
        };
        push(locale);
        if let Some((base, _)) = locale.split_once(['-', '_']) {
            push(base);
        }
        for tag in &self.fallback_chain {
            push(tag.as_str());
        }
        chain
    }

    /// Coverage of every locale against the union of all keys.
    #[must_use]
    pub fn coverage_report(&self) -> CoverageReport {
        let all: BTreeSet<&str> = self.locales.values().flat_map(LocaleStrings::keys).collect();
        let total_keys = all.len();
        let locales = self
            .locales
            .iter()
            .map(|(locale, strings)| {
                let missing: Vec<String> = all
                    .iter()
                    .filter(|k| strings.get(k).is_none())
                    .map(|k| (*k).to_owned())
                    .collect();
                let present = total_keys - missing.len();
                let coverage_percent = if total_keys == 0 {
                    100.0
                } else {
                    present as f64 * 100.0 / total_keys as f64
                };
                LocaleCoverage {
                    locale: locale.clone(),
                    present,
                    missing,
                    coverage_percent,
                }
            })
            .collect();
        CoverageReport {
            total_keys,
            locales,
        }
    }
}

fn validate_locale(tag: &str) -> Result<(), I18nError> {
    let ok = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(I18nError::InvalidLocale(tag.to_owned()))
    }
}

/// Replace `{name}` placeholders in `template` with values from `args`.
///
/// Substituted values are not rescanned, so a value containing `{x}` stays
/// literal.
#[must_use]
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match args.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
