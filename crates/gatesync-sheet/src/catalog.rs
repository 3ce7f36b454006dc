//! Standards catalog lookup
//!
//! Resolves a standard code (or catalog id) to its description when the
//! editor submitted a code without one.

use crate::error::DocumentError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable catalog id
    #[serde(default)]
    pub id: String,
    /// Standard code
    pub code: String,
    /// Description written into the document
    #[serde(default)]
    pub description: String,
}

impl CatalogEntry {
    /// Create new entry
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            description: description.into(),
        }
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

/// Catalog indexed by code and by id (case-insensitive)
#[derive(Debug, Clone, Default)]
pub struct StandardCatalog {
    by_code: IndexMap<String, CatalogEntry>,
    id_to_code: HashMap<String, String>,
}

impl StandardCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build catalog from entries; later entries win on duplicate codes
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    /// Load a JSON array of entries
    ///
    /// # Errors
    /// - [`DocumentError::Io`] if the file cannot be read
    /// - [`DocumentError::Serialization`] if it is not a list of entries
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| DocumentError::io_error(path, e))?;
        let entries: Vec<CatalogEntry> = serde_json::from_slice(&bytes)?;
        Ok(Self::from_entries(entries))
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, entry: CatalogEntry) {
        let code = normalize(&entry.code);
        if !entry.id.trim().is_empty() {
            self.id_to_code.insert(normalize(&entry.id), code.clone());
        }
        self.by_code.insert(code, entry);
    }

    /// Resolve by code first, then by id
    #[must_use]
    pub fn resolve(&self, code_or_id: &str) -> Option<&CatalogEntry> {
        let key = normalize(code_or_id);
        if key.is_empty() {
            return None;
        }
        self.by_code.get(&key).or_else(|| {
            self.id_to_code
                .get(&key)
                .and_then(|code| self.by_code.get(code))
        })
    }

    /// Resolve to a description
    ///
    /// # Errors
    /// [`DocumentError::MissingCatalogEntry`] if nothing matches
    pub fn describe(&self, code_or_id: &str) -> Result<&str, DocumentError> {
        self.resolve(code_or_id)
            .map(|entry| entry.description.as_str())
            .ok_or_else(|| DocumentError::MissingCatalogEntry {
                code: code_or_id.to_string(),
            })
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.by_code.values()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// True if the catalog has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StandardCatalog {
        StandardCatalog::from_entries([
            CatalogEntry::new("std-001", "ISO-9001", "Quality management"),
            CatalogEntry::new("std-002", "IEC-61508", "Functional safety"),
        ])
    }

    #[test]
    fn resolves_by_code_case_insensitively() {
        let catalog = catalog();
        assert_eq!(
            catalog.resolve(" iso-9001 ").map(|e| e.description.as_str()),
            Some("Quality management")
        );
    }

    #[test]
    fn resolves_by_id() {
        assert_eq!(catalog().describe("STD-002").unwrap(), "Functional safety");
    }

    #[test]
    fn missing_code_is_reported() {
        let err = catalog().describe("NOPE").unwrap_err();
        assert!(matches!(err, DocumentError::MissingCatalogEntry { code } if code == "NOPE"));
        assert!(catalog().resolve("").is_none());
    }

    #[test]
    fn entries_keep_insertion_order() {
        let codes: Vec<_> = catalog().entries().map(|e| e.code.clone()).collect();
        assert_eq!(codes, vec!["ISO-9001", "IEC-61508"]);
        assert_eq!(catalog().len(), 2);
    }
}
