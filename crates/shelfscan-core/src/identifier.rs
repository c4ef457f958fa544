//! Row identifiers and the column-alias normalization applied at ingestion.
//!
//! Input sheets name their columns inconsistently ("UPC Code", "Origin(UPC)",
//! "Lookup Code", ...). [`ColumnMap`] resolves the aliases once per sheet so
//! everything downstream works with a plain [`Identifier`].

use serde::Serialize;

use crate::sites::ColumnOverrides;
use crate::ConfigError;

pub const CODE_ALIASES: &[&str] = &[
    "UPC Code",
    "Origin(UPC)",
    "Lookup Code",
    "Origin Code",
    "Code",
    "UPC",
    "SKU",
];
pub const NAME_ALIASES: &[&str] = &["Name(En)", "Item Name", "Product Name", "Name"];
pub const NUMBER_ALIASES: &[&str] = &["Number", "Item Number", "Item No"];

/// Codes shorter than this are sheet noise ("N/A", "0", row numbers).
const MIN_CODE_LEN: usize = 5;
const MAX_SLUG_LEN: usize = 80;
const MAX_FILE_STEM_LEN: usize = 200;

/// One sheet row, reduced to the fields the resolver consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identifier {
    /// UPC, SKU or lookup code. Empty when absent or too short to be real.
    pub code: String,
    pub name: String,
    /// Vendor item number, used by some URL templates.
    pub number: String,
    /// Explicit product URL from the sheet, tried before any strategy.
    pub product_url: String,
}

impl Identifier {
    #[must_use]
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: normalize_code(code),
            name: collapse_whitespace(name),
            ..Self::default()
        }
    }

    /// A row is processable when it carries a code, a name or a direct URL.
    #[must_use]
    pub fn is_processable(&self) -> bool {
        !self.code.is_empty() || !self.name.is_empty() || !self.product_url.is_empty()
    }

    /// Stable key for output rows, snapshots and image files.
    ///
    /// `row_number` is 1-based and only used when the row has no code or number.
    #[must_use]
    pub fn product_id(&self, row_number: usize) -> String {
        if !self.code.is_empty() {
            self.code.clone()
        } else if !self.number.is_empty() {
            self.number.clone()
        } else {
            format!("row-{row_number}")
        }
    }

    /// Text used for search and name matching: the name, else the code.
    #[must_use]
    pub fn query(&self) -> &str {
        if self.name.is_empty() {
            &self.code
        } else {
            &self.name
        }
    }
}

fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    // Spreadsheet exports turn numeric UPCs into floats ("12345678905.0").
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    if trimmed.chars().count() < MIN_CODE_LEN {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Column positions for one sheet, resolved from its header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub code: Option<usize>,
    pub name: Option<usize>,
    pub number: Option<usize>,
    pub product_url: Option<usize>,
}

impl ColumnMap {
    /// Resolve columns from `headers`, preferring explicit overrides and then
    /// the alias lists in order. Header comparison is trimmed and case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when an override names a missing column
    /// or when neither a code nor a name column can be found.
    pub fn resolve(headers: &[&str], overrides: &ColumnOverrides) -> Result<Self, ConfigError> {
        let position = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(wanted.trim()))
        };

        let pick = |override_name: Option<&String>,
                    aliases: &[&str]|
         -> Result<Option<usize>, ConfigError> {
            if let Some(name) = override_name {
                return position(name).map(Some).ok_or_else(|| {
                    ConfigError::Validation(format!("column override '{name}' not found in sheet"))
                });
            }
            Ok(aliases.iter().find_map(|alias| position(alias)))
        };

        let map = Self {
            code: pick(overrides.code.as_ref(), CODE_ALIASES)?,
            name: pick(overrides.name.as_ref(), NAME_ALIASES)?,
            number: pick(overrides.number.as_ref(), NUMBER_ALIASES)?,
            product_url: pick(overrides.product_url.as_ref(), &[])?,
        };

        if map.code.is_none() && map.name.is_none() {
            return Err(ConfigError::Validation(format!(
                "sheet has no identifier or name column (headers: {})",
                headers.join(", ")
            )));
        }

        Ok(map)
    }

    /// Build the identifier for one data row.
    #[must_use]
    pub fn identifier(&self, fields: &[&str]) -> Identifier {
        let get = |idx: Option<usize>| {
            idx.and_then(|i| fields.get(i))
                .map_or("", |v| v.trim())
        };
        Identifier {
            code: normalize_code(get(self.code)),
            name: collapse_whitespace(get(self.name)),
            number: get(self.number).to_string(),
            product_url: get(self.product_url).to_string(),
        }
    }
}

/// URL slug for a product name: word characters kept, whitespace and dashes
/// collapsed to a single `-`, lowercased, capped at 80 characters.
#[must_use]
pub fn slugify(name: &str) -> String {
    let kept: String = name
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut pending_dash = false;
    for c in kept.chars() {
        if c == '-' || c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.extend(c.to_lowercase());
    }
    if pending_dash && !slug.is_empty() {
        slug.push('-');
    }

    slug.chars().take(MAX_SLUG_LEN).collect()
}

/// File-name-safe form of a product id. Reserved path characters and
/// whitespace become `_`; the result is capped at 200 characters.
#[must_use]
pub fn sanitize_file_stem(product_id: &str) -> String {
    let mut out = String::with_capacity(product_id.len());
    let mut in_space = false;
    for c in product_id.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    if out.is_empty() {
        return "unknown".to_string();
    }
    out.chars().take(MAX_FILE_STEM_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_codes_are_dropped() {
        let id = Identifier::new("N/A", "Blue Widget");
        assert!(id.code.is_empty());
        assert!(id.is_processable());
        assert_eq!(id.query(), "Blue Widget");
    }

    #[test]
    fn float_exported_codes_are_repaired() {
        let id = Identifier::new("12345678905.0", "");
        assert_eq!(id.code, "12345678905");
    }

    #[test]
    fn empty_row_is_not_processable() {
        assert!(!Identifier::new("  ", "  ").is_processable());
    }

    #[test]
    fn product_id_prefers_code_then_number_then_row() {
        let mut id = Identifier::new("012345678905", "Widget");
        assert_eq!(id.product_id(3), "012345678905");
        id.code.clear();
        id.number = "W-17".to_string();
        assert_eq!(id.product_id(3), "W-17");
        id.number.clear();
        assert_eq!(id.product_id(3), "row-3");
    }

    #[test]
    fn resolves_first_matching_alias_case_insensitively() {
        let headers = ["Number", "name(en)", "origin(upc)", "Price"];
        let map = ColumnMap::resolve(&headers, &ColumnOverrides::default()).unwrap();
        assert_eq!(map.code, Some(2));
        assert_eq!(map.name, Some(1));
        assert_eq!(map.number, Some(0));
        assert_eq!(map.product_url, None);
    }

    #[test]
    fn override_wins_over_alias() {
        let headers = ["UPC Code", "Barcode", "Item Name"];
        let overrides = ColumnOverrides {
            code: Some("Barcode".to_string()),
            ..ColumnOverrides::default()
        };
        let map = ColumnMap::resolve(&headers, &overrides).unwrap();
        assert_eq!(map.code, Some(1));
    }

    #[test]
    fn missing_override_column_is_an_error() {
        let overrides = ColumnOverrides {
            product_url: Some("Link".to_string()),
            ..ColumnOverrides::default()
        };
        let err = ColumnMap::resolve(&["Code", "Name"], &overrides).unwrap_err();
        assert!(err.to_string().contains("'Link'"), "{err}");
    }

    #[test]
    fn sheet_without_identifier_columns_is_an_error() {
        let err = ColumnMap::resolve(&["Price", "Qty"], &ColumnOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("no identifier or name column"));
    }

    #[test]
    fn identifier_reads_fields_by_position() {
        let map = ColumnMap::resolve(&["Lookup Code", "Item Name"], &ColumnOverrides::default())
            .unwrap();
        let id = map.identifier(&[" 0123456 ", "  Red   Dragon Puzzle "]);
        assert_eq!(id.code, "0123456");
        assert_eq!(id.name, "Red Dragon Puzzle");
        // Short rows simply yield empty fields.
        let partial = map.identifier(&["0123456"]);
        assert!(partial.name.is_empty());
    }

    #[test]
    fn slugify_matches_storefront_handles() {
        assert_eq!(slugify("Blue Widget 3-Pack"), "blue-widget-3-pack");
        assert_eq!(slugify("  Uncle Arnie's  Fun - Set "), "uncle-arnies-fun-set");
        assert_eq!(slugify(""), "");
        assert_eq!(slugify(&"a".repeat(120)).len(), 80);
    }

    #[test]
    fn sanitize_file_stem_replaces_reserved_characters() {
        assert_eq!(sanitize_file_stem("AB/12:34 x"), "AB_12_34_x");
        assert_eq!(sanitize_file_stem("a   b"), "a_b");
        assert_eq!(sanitize_file_stem("   "), "unknown");
        assert_eq!(sanitize_file_stem(&"9".repeat(300)).len(), 200);
    }
}
