//! Query Part Model
//!
//! Defines the structured form of a Flux query: an ordered list of parts,
//! or raw text when the query is outside the supported subset.
//!
//! # JSON Shape
//!
//! ```text
//! {
//!   "parts": [
//!     { "type": "bucket", "id": "0a1b", "name": "metrics" },
//!     { "type": "dateRange", "start": "-1h" },
//!     { "type": "filter", "kind": "field", "value": ["temp", "humidity"] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// The structured query being built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    /// Parts in pipeline order
    #[serde(default)]
    pub parts: Vec<QueryPart>,
    /// Verbatim query text when the parser could not decompose it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl QueryModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model from parts
    pub fn from_parts(parts: Vec<QueryPart>) -> Self {
        Self {
            parts,
            raw_text: None,
        }
    }

    /// Create a raw-text model
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            raw_text: Some(text.into()),
        }
    }

    /// True when the textual form is authoritative
    pub fn is_raw(&self) -> bool {
        self.raw_text.is_some()
    }

    /// True when there are no parts and no raw text
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.raw_text.is_none()
    }

    /// First bucket part, if any
    pub fn bucket(&self) -> Option<&Bucket> {
        self.parts.iter().find_map(|part| match part {
            QueryPart::Bucket(bucket) => Some(bucket),
            _ => None,
        })
    }

    /// First date range part, if any
    pub fn date_range(&self) -> Option<&DateRange> {
        self.parts.iter().find_map(|part| match part {
            QueryPart::DateRange(range) => Some(range),
            _ => None,
        })
    }

    /// First filter of the given kind, if any
    pub fn filter(&self, kind: FilterKind) -> Option<&Filter> {
        self.parts.iter().find_map(|part| match part {
            QueryPart::Filter(filter) if filter.kind == kind => Some(filter),
            _ => None,
        })
    }

    /// Position of the first part matching the predicate
    pub fn position(&self, pred: impl Fn(&QueryPart) -> bool) -> Option<usize> {
        self.parts.iter().position(pred)
    }
}

/// One structured unit of the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryPart {
    /// `from(bucket: ...)`
    Bucket(Bucket),
    /// `|> range(...)`
    DateRange(DateRange),
    /// `|> filter(...)`
    Filter(Filter),
}

impl QueryPart {
    /// True for a filter of the given kind
    pub fn is_filter(&self, kind: FilterKind) -> bool {
        matches!(self, QueryPart::Filter(filter) if filter.kind == kind)
    }

    /// True for a bucket part
    pub fn is_bucket(&self) -> bool {
        matches!(self, QueryPart::Bucket(_))
    }

    /// True for a date range part
    pub fn is_date_range(&self) -> bool {
        matches!(self, QueryPart::DateRange(_))
    }
}

/// A bucket selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Stable identifier (equal to the name when recovered from text)
    pub id: String,
    /// Bucket name as used in `from(bucket: ...)`
    pub name: String,
}

impl Bucket {
    /// Create a bucket with an explicit id
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Create a bucket whose id is its name
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
        }
    }
}

/// A time range; start and stop are opaque Flux literals (`-1h`, RFC 3339, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
}

impl DateRange {
    /// Open-ended range starting at `start`
    pub fn since(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            stop: None,
        }
    }

    /// Range with both bounds
    pub fn between(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            stop: Some(stop.into()),
        }
    }
}

/// A column equality filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub kind: FilterKind,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(kind: FilterKind, value: impl Into<FilterValue>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Which record column a filter compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Measurement,
    Field,
}

impl FilterKind {
    /// Flux record column name
    pub fn column(&self) -> &'static str {
        match self {
            Self::Measurement => "_measurement",
            Self::Field => "_field",
        }
    }

    /// Parse from a Flux record column name
    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "_measurement" => Some(Self::Measurement),
            "_field" => Some(Self::Field),
            _ => None,
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Measurement => write!(f, "measurement"),
            Self::Field => write!(f, "field"),
        }
    }
}

/// Filter operand: one value, or several meaning "match any"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Many(Vec<String>),
}

impl FilterValue {
    /// Values as a slice-like list, in stored order
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// First value, if any
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Many(values) if values.is_empty())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}
