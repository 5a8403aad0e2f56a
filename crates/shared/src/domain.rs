use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Number of classifications a session keeps, newest first.
pub const HISTORY_CAPACITY: usize = 5;

/// Shown in place of an absent label or an empty supplier.
pub const PLACEHOLDER: &str = "-";

pub const EXAMPLE_DESCRIPTIONS: [&str; 3] = [
    "Annual maintenance for HVAC systems across HQ campus",
    "Bulk purchase of laptop docking stations and 24-inch monitors",
    "Janitorial services for warehouse facilities (night shift)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A PO description and supplier with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub description: String,
    pub supplier: String,
}

impl ClassificationRequest {
    pub fn new(description: &str, supplier: &str) -> Self {
        Self {
            description: description.trim().to_string(),
            supplier: supplier.trim().to_string(),
        }
    }

    pub fn is_classifiable(&self) -> bool {
        !self.description.is_empty()
    }

    pub fn supplier_or_placeholder(&self) -> &str {
        if self.supplier.is_empty() {
            PLACEHOLDER
        } else {
            &self.supplier
        }
    }
}

/// Parsed collaborator output. Usually an object carrying L1/L2/L3 labels,
/// but any JSON value is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationResult(pub Value);

impl ClassificationResult {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Extracts the category labels. `None` unless the result is an object
    /// with at least one label present.
    pub fn summary(&self) -> Option<CategorySummary> {
        let object = self.0.as_object()?;
        let label = |upper: &str, lower: &str| {
            [upper, lower]
                .into_iter()
                .filter_map(|key| object.get(key))
                .find(|value| is_present(value))
                .map(render_label)
        };
        let summary = CategorySummary {
            l1: label("L1", "l1"),
            l2: label("L2", "l2"),
            l3: label("L3", "l3"),
        };
        summary.has_any().then_some(summary)
    }

    /// Pretty JSON with two-space indentation, as offered for download.
    pub fn to_pretty_json(&self) -> String {
        // Serializing a `Value` cannot fail.
        serde_json::to_string_pretty(&self.0).unwrap_or_default()
    }
}

// Null, false, zero and empty strings/containers count as missing labels.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn render_label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub l1: Option<String>,
    pub l2: Option<String>,
    pub l3: Option<String>,
}

impl CategorySummary {
    pub fn has_any(&self) -> bool {
        self.l1.is_some() || self.l2.is_some() || self.l3.is_some()
    }

    pub fn lines(&self) -> [String; 3] {
        let show = |label: &Option<String>| label.as_deref().unwrap_or(PLACEHOLDER).to_string();
        [
            format!("L1: {}", show(&self.l1)),
            format!("L2: {}", show(&self.l2)),
            format!("L3: {}", show(&self.l3)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub description: String,
    pub supplier: String,
    pub result: ClassificationResult,
    pub classified_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(request: &ClassificationRequest, result: ClassificationResult) -> Self {
        Self {
            description: request.description.clone(),
            supplier: request.supplier_or_placeholder().to_string(),
            result,
            classified_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
