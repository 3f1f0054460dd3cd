//! # Core Data Model
//!
//! Transient records that flow through one request: the request itself, the
//! parsed line items and the final result. Nothing here outlives a response.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of input being processed. Selects prompts, upload directory and
/// response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Receipt,
    Voice,
}

impl SourceKind {
    /// The name of the configured task used for structured extraction.
    pub fn task_name(self) -> &'static str {
        match self {
            SourceKind::Receipt => "receipt_extraction",
            SourceKind::Voice => "voice_extraction",
        }
    }

    /// The directory, relative to the upload root, that holds uploads of this kind.
    pub fn upload_category(self) -> &'static str {
        match self {
            SourceKind::Receipt => "ocr_images",
            SourceKind::Voice => "voice_uploads",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Receipt => write!(f, "receipt"),
            SourceKind::Voice => write!(f, "voice"),
        }
    }
}

/// One parsed purchase entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item: String,
    #[serde(
        default = "default_quantity",
        deserialize_with = "deserialize_quantity",
        serialize_with = "serialize_quantity"
    )]
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<f64>,
}

impl LineItem {
    pub fn new(item: impl Into<String>, quantity: f64, price: Option<f64>) -> Self {
        Self {
            item: item.into(),
            quantity,
            unit: None,
            price,
        }
    }
}

fn default_quantity() -> f64 {
    1.0
}

/// Reads a number that may arrive as a JSON number or as a decorated string
/// such as `"$1,299.50"`.
pub fn lenient_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decorated_number(s),
        _ => None,
    }
}

fn parse_decorated_number(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let normalized = match (kept.rfind(','), kept.rfind('.')) {
        (None, None) => kept,
        // Both present: the last one is the decimal separator.
        (Some(comma), Some(dot)) => {
            let (decimal, grouping) = if comma > dot { (',', '.') } else { ('.', ',') };
            let (int_part, fraction) = kept.rsplit_once(decimal)?;
            if int_part.contains(decimal) {
                return None;
            }
            format!("{}.{fraction}", ungroup(int_part, grouping)?)
        }
        // "1,5" and "1,50" use a decimal comma; "1,299" groups thousands.
        (Some(_), None) => match kept.rsplit_once(',') {
            Some((int_part, tail)) if !int_part.contains(',') && matches!(tail.len(), 1 | 2) => {
                format!("{int_part}.{tail}")
            }
            _ => ungroup(&kept, ',')?,
        },
        (None, Some(_)) if kept.matches('.').count() == 1 => kept,
        (None, Some(_)) => ungroup(&kept, '.')?,
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Drops thousands separators from an integer part. Anything but a 1 to 3
/// digit head followed by 3 digit groups is ambiguous and yields `None`.
fn ungroup(int_part: &str, separator: char) -> Option<String> {
    if !int_part.contains(separator) {
        return Some(int_part.to_string());
    }
    let mut groups = int_part.split(separator);
    let head = groups.next()?;
    let head_digits = head.trim_start_matches('-');
    if head_digits.is_empty() || head_digits.len() > 3 {
        return None;
    }
    let mut joined = head.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        joined.push_str(group);
    }
    Some(joined)
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value).unwrap_or_else(default_quantity))
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value))
}

// Whole quantities go out as integers so clients see `2`, not `2.0`.
fn serialize_quantity<S>(quantity: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if quantity.fract() == 0.0 && quantity.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*quantity as i64)
    } else {
        serializer.serialize_f64(*quantity)
    }
}

/// The input of one extraction, alive for a single HTTP call.
#[derive(Debug, Clone)]
pub enum RawInput {
    /// Text supplied directly by the caller.
    Text(String),
    /// An upload already persisted by the upload store.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub source_kind: SourceKind,
    pub raw_input: RawInput,
}

impl ExtractionRequest {
    pub fn receipt(saved_path: PathBuf) -> Self {
        Self {
            source_kind: SourceKind::Receipt,
            raw_input: RawInput::File(saved_path),
        }
    }

    pub fn voice_audio(saved_path: PathBuf) -> Self {
        Self {
            source_kind: SourceKind::Voice,
            raw_input: RawInput::File(saved_path),
        }
    }

    pub fn voice_text(text: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::Voice,
            raw_input: RawInput::Text(text.into()),
        }
    }

    pub fn saved_path(&self) -> Option<&Path> {
        match &self.raw_input {
            RawInput::File(path) => Some(path),
            RawInput::Text(_) => None,
        }
    }
}

/// The outcome of structured extraction.
///
/// `Degraded` replaces a silent empty list: the caller still gets an empty,
/// valid item list, but also learns why.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Ok(Vec<LineItem>),
    Degraded { reason: String },
}

impl Extraction {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Extraction::Degraded {
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Extraction::Degraded { .. })
    }

    /// Splits the outcome into the items to return and the status to report.
    pub fn into_parts(self) -> (Vec<LineItem>, ExtractionStatus) {
        match self {
            Extraction::Ok(items) => (items, ExtractionStatus::Ok),
            Extraction::Degraded { reason } => (Vec::new(), ExtractionStatus::Degraded { reason }),
        }
    }
}

/// The serializable status reported alongside every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionStatus {
    Ok,
    Degraded { reason: String },
}

/// Raw text, parsed items and their total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub raw_text: String,
    pub items: Vec<LineItem>,
    pub total: f64,
    pub extraction: ExtractionStatus,
}
