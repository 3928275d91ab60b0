#![forbid(unsafe_code)]

//! Localization catalog for Tracery.
//!
//! Provides externalized string storage with key-based lookup, locale
//! fallback chains, and variable interpolation.
//!
//! # Role in Tracery
//! `tracery-i18n` isolates localization so the history engine can present
//! transaction names ("Move Selection", "Resize", ...) in the user's
//! language without knowing anything about languages itself.
//!
//! # How it fits in the system
//! `tracery-history` resolves presentation names through a
//! [`StringCatalog`]. This crate has no dependencies and does not depend on
//! the engine, keeping the localization layer reusable and testable.

pub mod catalog;

pub use catalog::{
    CoverageReport, I18nError, LocaleCoverage, LocaleStrings, StringCatalog, interpolate,
};
