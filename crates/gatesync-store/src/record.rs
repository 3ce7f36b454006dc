//! Record types stored under checklist keys
//!
//! - [`StandardRef`]: one coded standard with its weight percentage
//! - [`ChecklistMeta`]: per-checklist status, assignee, due date and feedback
//! - [`ChecklistMetaPatch`]: partial metadata update merged field-by-field

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Upper bound of a weight percentage
pub const MAX_PERCENT: f64 = 100.0;

/// Clamp a percentage into `0..=100`, mapping NaN to 0
#[inline]
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_PERCENT)
    }
}

/// Coerce an arbitrary JSON value into a clamped percentage
///
/// Numbers are clamped, numeric strings are parsed then clamped, anything
/// else (including non-numeric strings and `null`) becomes 0.
#[must_use]
pub fn percent_from_json(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    clamp_percent(raw)
}

fn deserialize_percent<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(percent_from_json(&value))
}

fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// A coded standard selected for a checklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardRef {
    /// Standard code
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub code: String,
    /// Human-readable description (may be empty until resolved)
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub description: String,
    /// Weight percentage, always within `0..=100`
    #[serde(default, deserialize_with = "deserialize_percent")]
    pub percent: f64,
}

impl StandardRef {
    /// Create new standard reference (percent is clamped)
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>, description: impl Into<String>, percent: f64) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            percent: clamp_percent(percent),
        }
    }

    /// Create reference with only a code (description resolved later)
    #[inline]
    #[must_use]
    pub fn code_only(code: impl Into<String>, percent: f64) -> Self {
        Self::new(code, String::new(), percent)
    }

    /// Set percentage (clamped)
    #[inline]
    pub fn set_percent(&mut self, percent: f64) {
        self.percent = clamp_percent(percent);
    }

    /// Percentage as a fraction of one
    #[inline]
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.percent / MAX_PERCENT
    }
}

/// Review status of a checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecklistStatus {
    /// No status set (`""`)
    #[default]
    Unset,
    /// Awaiting approval
    PendingApproval,
    /// Approved
    Approved,
    /// Rejected
    Rejected,
}

impl ChecklistStatus {
    /// Wire label
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::PendingApproval => "Pending Approval",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// Parse a label, mapping unknown labels to [`ChecklistStatus::Unset`]
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl FromStr for ChecklistStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Self::Unset),
            s if s.eq_ignore_ascii_case("pending approval") => Ok(Self::PendingApproval),
            s if s.eq_ignore_ascii_case("approved") => Ok(Self::Approved),
            s if s.eq_ignore_ascii_case("rejected") => Ok(Self::Rejected),
            other => Err(format!("unknown checklist status: {other}")),
        }
    }
}

impl Display for ChecklistStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChecklistStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChecklistStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = deserialize_lenient_string(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// Per-checklist metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistMeta {
    /// Review status
    pub status: ChecklistStatus,
    /// Assigned reviewer
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub assignee: String,
    /// Due date as entered (ISO `YYYY-MM-DD` expected, not enforced)
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub due_date: String,
    /// Reviewer feedback
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub feedback: String,
}

impl ChecklistMeta {
    /// Merge a partial update; absent fields keep their current value
    pub fn apply(&mut self, patch: &ChecklistMetaPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(assignee) = &patch.assignee {
            self.assignee.clone_from(assignee);
        }
        if let Some(due_date) = &patch.due_date {
            self.due_date.clone_from(due_date);
        }
        if let Some(feedback) = &patch.feedback {
            self.feedback.clone_from(feedback);
        }
    }

    /// Merged copy
    #[must_use]
    pub fn merged(mut self, patch: &ChecklistMetaPatch) -> Self {
        self.apply(patch);
        self
    }

    /// Due date parsed as ISO date, if well-formed
    #[must_use]
    pub fn due_date_parsed(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.due_date.trim(), "%Y-%m-%d").ok()
    }
}

/// Metadata field identifier, used to key independent debounced edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetaField {
    /// `status`
    Status,
    /// `assignee`
    Assignee,
    /// `dueDate`
    DueDate,
    /// `feedback`
    Feedback,
}

/// Partial metadata update
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistMetaPatch {
    /// New status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ChecklistStatus>,
    /// New assignee
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// New due date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// New feedback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ChecklistMetaPatch {
    /// Create empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch touching a single field; `value` is parsed for [`MetaField::Status`]
    #[must_use]
    pub fn field(field: MetaField, value: impl Into<String>) -> Self {
        let value = value.into();
        let mut patch = Self::default();
        match field {
            MetaField::Status => patch.status = Some(ChecklistStatus::from_label(&value)),
            MetaField::Assignee => patch.assignee = Some(value),
            MetaField::DueDate => patch.due_date = Some(value),
            MetaField::Feedback => patch.feedback = Some(value),
        }
        patch
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: ChecklistStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// With assignee
    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// With due date
    #[inline]
    #[must_use]
    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// With feedback
    #[inline]
    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    /// True if no field is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.assignee.is_none()
            && self.due_date.is_none()
            && self.feedback.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn percent_clamping_table() {
        let inputs = [json!(-5), json!(0), json!(57.5), json!(100), json!(150), json!("abc")];
        let expected = [0.0, 0.0, 57.5, 100.0, 100.0, 0.0];

        for (input, want) in inputs.iter().zip(expected) {
            assert_eq!(percent_from_json(input), want, "input {input}");
        }
    }

    #[test]
    fn percent_nan_maps_to_zero() {
        assert_eq!(clamp_percent(f64::NAN), 0.0);
    }

    #[test]
    fn percent_numeric_string_parses() {
        assert_eq!(percent_from_json(&json!("40")), 40.0);
        assert_eq!(percent_from_json(&json!(" 12.5% ")), 12.5);
        assert_eq!(percent_from_json(&Value::Null), 0.0);
    }

    #[test]
    fn standard_ref_decodes_leniently() {
        let item: StandardRef =
            serde_json::from_value(json!({"code": "ISO-9001", "percent": "abc"})).unwrap();
        assert_eq!(item.code, "ISO-9001");
        assert_eq!(item.description, "");
        assert_eq!(item.percent, 0.0);

        let item: StandardRef =
            serde_json::from_value(json!({"code": 42, "description": null, "percent": 150}))
                .unwrap();
        assert_eq!(item.code, "42");
        assert_eq!(item.percent, 100.0);
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            ChecklistStatus::Unset,
            ChecklistStatus::PendingApproval,
            ChecklistStatus::Approved,
            ChecklistStatus::Rejected,
        ] {
            let json = serde_json::to_value(status).unwrap();
            let back: ChecklistStatus = serde_json::from_value(json).unwrap();
            assert_eq!(back, status);
        }
        assert_eq!(ChecklistStatus::from_label("approved"), ChecklistStatus::Approved);
        assert_eq!(ChecklistStatus::from_label("On Hold"), ChecklistStatus::Unset);
    }

    #[test]
    fn meta_patch_preserves_absent_fields() {
        let meta = ChecklistMeta {
            status: ChecklistStatus::PendingApproval,
            assignee: "dana".to_string(),
            due_date: "2026-11-01".to_string(),
            feedback: String::new(),
        };

        let merged = meta.merged(&ChecklistMetaPatch::new().with_feedback("looks good"));
        assert_eq!(merged.status, ChecklistStatus::PendingApproval);
        assert_eq!(merged.assignee, "dana");
        assert_eq!(merged.feedback, "looks good");
    }

    #[test]
    fn meta_patch_serializes_only_set_fields() {
        let patch = ChecklistMetaPatch::field(MetaField::Status, "Approved");
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, json!({"status": "Approved"}));
    }

    #[test]
    fn due_date_parses_iso() {
        let meta = ChecklistMeta {
            due_date: "2026-10-31".to_string(),
            ..ChecklistMeta::default()
        };
        assert_eq!(meta.due_date_parsed(), NaiveDate::from_ymd_opt(2026, 10, 31));

        let meta = ChecklistMeta {
            due_date: "next week".to_string(),
            ..ChecklistMeta::default()
        };
        assert!(meta.due_date_parsed().is_none());
    }

    proptest! {
        #[test]
        fn clamped_percent_stays_in_range(value in proptest::num::f64::ANY) {
            let clamped = clamp_percent(value);
            prop_assert!((0.0..=MAX_PERCENT).contains(&clamped));
        }
    }
}
