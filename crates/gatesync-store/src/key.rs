//! Checklist keys
//!
//! Provides [`ChecklistKey`], the composite identifier under which a single
//! checklist's selection and metadata are stored, and [`ChecklistContext`],
//! the `(gate, checklist)` pair it is derived from.

use crate::error::KeyError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Delimiter between the gate id and the checklist title
pub const KEY_DELIMITER: &str = "::";

/// Gate + checklist pair selected in the panel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistContext {
    /// Gate identifier (gate number or gate title)
    pub gate_id: String,
    /// Checklist title within the gate
    pub checklist_title: String,
}

impl ChecklistContext {
    /// Create new context
    #[inline]
    #[must_use]
    pub fn new(gate_id: impl Into<String>, checklist_title: impl Into<String>) -> Self {
        Self {
            gate_id: gate_id.into(),
            checklist_title: checklist_title.into(),
        }
    }

    /// Derive the store key for this context
    ///
    /// # Errors
    /// Returns [`KeyError::EmptyComponent`] if either part is blank, or
    /// [`KeyError::DelimiterInGate`] if the gate id contains `::`
    pub fn key(&self) -> Result<ChecklistKey, KeyError> {
        ChecklistKey::derive(&self.gate_id, &self.checklist_title)
    }
}

/// Composite store key: `"{gate}::{title}"` with both parts trimmed
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistKey(String);

impl ChecklistKey {
    /// Derive key from gate id and checklist title
    ///
    /// # Errors
    /// Returns [`KeyError::EmptyComponent`] if either part is blank, or
    /// [`KeyError::DelimiterInGate`] if the gate id contains `::`
    pub fn derive(gate_id: &str, checklist_title: &str) -> Result<Self, KeyError> {
        let gate = gate_id.trim();
        let title = checklist_title.trim();

        if gate.is_empty() {
            return Err(KeyError::EmptyComponent("gate id"));
        }
        if title.is_empty() {
            return Err(KeyError::EmptyComponent("checklist title"));
        }
        if gate.contains(KEY_DELIMITER) {
            return Err(KeyError::DelimiterInGate(gate.to_string()));
        }

        Ok(Self(format!("{gate}{KEY_DELIMITER}{title}")))
    }

    /// Wrap an already-encoded key (as received over the RPC surface)
    #[inline]
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(gate, title)` if the key uses the standard encoding
    #[must_use]
    pub fn parts(&self) -> Option<(&str, &str)> {
        self.0.split_once(KEY_DELIMITER)
    }
}

impl Display for ChecklistKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChecklistKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
