//! Protocol templates and the typed field model.
//!
//! A protocol is a named, coded template for one type of study. It carries
//! an ordered list of fields, and each field declares its kind as a closed
//! tagged variant: free text, a decimal number (optionally with a reference
//! range), or a selection from a fixed option list. The kind drives both the
//! result-entry control and the report flagging rules, and because the enum
//! is closed the dispatch is checked exhaustively at compile time. A payload
//! with an unrecognised kind fails deserialisation outright rather than
//! being guessed at.

use lis_types::{NonEmptyText, ProtocolCode};
use serde::{Deserialize, Serialize};

/// Placeholder shown wherever a value was never entered.
pub const ABSENT_VALUE: &str = "-";

/// A numeric reference interval. Either bound may be missing; out-of-range
/// evaluation only applies when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ReferenceRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
}

impl ReferenceRange {
    /// Both bounds, when both are declared.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.low, self.high) {
            (Some(low), Some(high)) => Some((low, high)),
            _ => None,
        }
    }

    /// Human-readable interval, e.g. `12 - 16`, or `-` when incomplete.
    pub fn display(&self) -> String {
        match self.bounds() {
            Some((low, high)) => format!("{} - {}", low, high),
            None => ABSENT_VALUE.to_string(),
        }
    }
}

/// Direction of an out-of-range result value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFlag {
    /// Strictly below the declared low bound.
    Low,
    /// Strictly above the declared high bound.
    High,
}

impl RangeFlag {
    /// Single-character marker used in report cells.
    pub fn marker(&self) -> &'static str {
        match self {
            RangeFlag::Low => "↓",
            RangeFlag::High => "↑",
        }
    }
}

/// A value entered for one field of one study.
///
/// Numbers and text share the same wire slot (`values` is a plain JSON
/// object), so this is untagged: a JSON number becomes `Number`, anything
/// else a `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Number(f64),
    Text(String),
}

impl ResultValue {
    /// The value as a float, if it is one or parses as one.
    ///
    /// Unparseable text is "not evaluable" and never flags out of range.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ResultValue::Number(n) => Some(*n),
            ResultValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl std::fmt::Display for ResultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultValue::Number(n) => write!(f, "{}", n),
            ResultValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The closed set of field kinds a protocol may declare.
///
/// The `type` tag and the kind-specific attributes sit at the same level as
/// the rest of the field record on the wire, hence the internally tagged
/// representation flattened into [`Field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Multi-line free text.
    Text,
    /// Decimal input, optionally constrained by a reference interval.
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<ReferenceRange>,
    },
    /// One value drawn from a fixed option list.
    Select {
        #[serde(default)]
        options: Vec<String>,
    },
}

/// The input control a field presents during result entry.
///
/// Derived exhaustively from [`FieldKind`]; there is no fallback arm, so an
/// unknown kind cannot reach rendering in the first place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputControl<'a> {
    /// Multi-line text area.
    MultilineText,
    /// Decimal input; empty input means the value stays absent.
    DecimalInput,
    /// Single choice from the listed options, or left unselected.
    SelectOne(&'a [String]),
}

/// One field definition within a protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Machine identifier, unique within the protocol by data-entry
    /// convention (the backend is expected to validate this).
    pub key: String,
    /// Display name.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    /// The display unit, treating an empty string as no unit.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// The declared reference interval, for number fields that carry one.
    pub fn reference(&self) -> Option<&ReferenceRange> {
        match &self.kind {
            FieldKind::Number { reference } => reference.as_ref(),
            _ => None,
        }
    }

    /// The input control this field presents.
    pub fn control(&self) -> InputControl<'_> {
        match &self.kind {
            FieldKind::Text => InputControl::MultilineText,
            FieldKind::Number { .. } => InputControl::DecimalInput,
            FieldKind::Select { options } => InputControl::SelectOne(options),
        }
    }

    /// Evaluates a value against this field's reference interval.
    ///
    /// Returns `None` when the field has no complete interval, when the
    /// value does not parse as a number, or when the value sits inside the
    /// interval. Boundary values are in range; the comparison is strict.
    pub fn flag(&self, value: &ResultValue) -> Option<RangeFlag> {
        let (low, high) = self.reference()?.bounds()?;
        let candidate = value.as_f64()?;
        if candidate < low {
            Some(RangeFlag::Low)
        } else if candidate > high {
            Some(RangeFlag::High)
        } else {
            None
        }
    }

    /// Checks an entered value against this field's declared kind, before
    /// anything is recorded: number fields must receive something that
    /// evaluates as a decimal, and select fields only accept one of their
    /// declared options. Text fields accept anything.
    ///
    /// # Errors
    ///
    /// Returns `LabError::Validation` naming the field and the offending
    /// value.
    pub fn validate_entry(&self, value: &ResultValue) -> crate::LabResult<()> {
        match &self.kind {
            FieldKind::Text => Ok(()),
            FieldKind::Number { .. } => {
                if value.as_f64().is_some() {
                    Ok(())
                } else {
                    Err(crate::LabError::Validation(format!(
                        "'{}' is not a decimal value for field '{}'",
                        value, self.key
                    )))
                }
            }
            FieldKind::Select { options } => match value {
                ResultValue::Text(s) if options.iter().any(|o| o == s) => Ok(()),
                _ => Err(crate::LabError::Validation(format!(
                    "'{}' is not an option of field '{}'",
                    value, self.key
                ))),
            },
        }
    }

    /// Parses raw decimal input for a number field: empty input means the
    /// value is absent, anything else must be a decimal.
    pub fn parse_decimal(input: &str) -> crate::LabResult<Option<ResultValue>> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse::<f64>()
            .map(|n| Some(ResultValue::Number(n)))
            .map_err(|_| crate::LabError::Validation(format!("'{}' is not a decimal", trimmed)))
    }
}

/// Formats a value for display: the value suffixed by its unit when one is
/// present, or the absence placeholder.
pub fn display_value(value: Option<&ResultValue>, unit: Option<&str>) -> String {
    match value {
        Some(value) => match unit {
            Some(unit) => format!("{} {}", value, unit),
            None => value.to_string(),
        },
        None => ABSENT_VALUE.to_string(),
    }
}

/// A study template as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub code: ProtocolCode,
    pub fields: Vec<Field>,
}

/// Payload for creating or updating a protocol. The id is assigned (or
/// already owned) by the backend; name and code cannot be blank, which the
/// wrapper types enforce at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProtocol {
    pub name: NonEmptyText,
    pub code: ProtocolCode,
    pub fields: Vec<Field>,
}
