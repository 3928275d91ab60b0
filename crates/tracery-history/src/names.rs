#![forbid(unsafe_code)]

//! Transaction names and their localized presentation.
//!
//! Tools end a transaction with a name token such as [`MOVE_SELECTION`]. The
//! engine stores the token with the committed edit and resolves it through a
//! [`StringCatalog`] only when a UI asks for the label of the next undo or
//! redo. A token with no catalog entry is shown as-is.

use tracery_i18n::{I18nError, LocaleStrings, StringCatalog};

pub const MOVE_SELECTION: &str = "Move Selection";
pub const COPY_SELECTION: &str = "Copy Selection";
pub const DELETE_SELECTION: &str = "Delete Selection";
pub const CUT: &str = "Cut";
pub const PASTE: &str = "Paste";
pub const DRAG_DROP: &str = "Drag/Drop";
pub const NEW_LINK: &str = "New Link";
pub const RELINK: &str = "Relink";
pub const RESIZE: &str = "Resize";
pub const TEXT_EDIT: &str = "Text Edit";
pub const INSERT: &str = "Insert";
pub const GROUP: &str = "Group";
pub const UNGROUP: &str = "Ungroup";

/// Every built-in transaction name.
pub const ALL: &[&str] = &[
    MOVE_SELECTION,
    COPY_SELECTION,
    DELETE_SELECTION,
    CUT,
    PASTE,
    DRAG_DROP,
    NEW_LINK,
    RELINK,
    RESIZE,
    TEXT_EDIT,
    INSERT,
    GROUP,
    UNGROUP,
];

/// Resolves transaction names to user-facing labels for one locale.
#[derive(Debug, Clone)]
pub struct PresentationNames {
    catalog: StringCatalog,
    locale: String,
}

impl Default for PresentationNames {
    fn default() -> Self {
        Self::english()
    }
}

impl PresentationNames {
    /// Resolve through `catalog` for `locale`.
    #[must_use]
    pub fn new(catalog: StringCatalog, locale: impl Into<String>) -> Self {
        Self {
            catalog,
            locale: locale.into(),
        }
    }

    /// The built-in names mapped to themselves under `"en"`, with `"en"` as
    /// the fallback locale.
    #[must_use]
    pub fn english() -> Self {
        let strings = ALL
            .iter()
            .fold(LocaleStrings::new(), |strings, name| strings.with(*name, *name));
        let mut catalog = StringCatalog::new();
        if let Err(err) = catalog.add_locale("en", strings) {
            // Names still resolve to the raw token without the catalog.
            tracing::error!(target: "tracery.history", error = %err, "built-in names rejected");
        }
        catalog.set_fallback_chain(["en"]);
        Self::new(catalog, "en")
    }

    /// Add or replace translations for `locale`.
    pub fn add_locale(&mut self, locale: &str, strings: LocaleStrings) -> Result<(), I18nError> {
        self.catalog.add_locale(locale, strings)
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    #[must_use]
    pub fn catalog(&self) -> &StringCatalog {
        &self.catalog
    }

    /// The label for `name`, if the catalog has one.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.catalog.get(&self.locale, name)
    }

    /// The label for `name`; `name` itself when no translation exists.
    #[must_use]
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.lookup(name).unwrap_or(name)
    }
}
