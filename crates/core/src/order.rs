//! Orders: a patient, a set of study snapshots, and a forward-only status.

use chrono::{DateTime, Utc};
use lis_types::ProtocolCode;
use serde::{Deserialize, Serialize};

use crate::protocol::Protocol;

/// Lifecycle of an order. Transitions only ever move forward; nothing in
/// this client reverses a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-process")]
    InProcess,
    #[serde(rename = "completed")]
    Completed,
}

impl OrderStatus {
    /// Whether moving to `next` is a legal forward step.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::InProcess)
                | (OrderStatus::InProcess, OrderStatus::Completed)
        )
    }

    /// Wire name, also used for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProcess => "in-process",
            OrderStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = crate::LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(OrderStatus::Pending),
            "in-process" => Ok(OrderStatus::InProcess),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(crate::LabError::Validation(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

/// A study selected on an order: a snapshot of the protocol's identity taken
/// at selection time.
///
/// The code and display name are copied, not referenced, so later edits or
/// deletion of the protocol never rewrite what an existing order says was
/// requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySnapshot {
    pub protocol_id: String,
    pub protocol_code: ProtocolCode,
    pub display_name: String,
}

impl StudySnapshot {
    /// Takes a snapshot of a protocol's identity.
    pub fn of(protocol: &Protocol) -> Self {
        Self {
            protocol_id: protocol.id.clone(),
            protocol_code: protocol.code.clone(),
            display_name: protocol.name.clone(),
        }
    }
}

/// An order as stored by the backend. The patient record comes back
/// embedded so the worklist can show identity without extra fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub patient: crate::patient::Patient,
    pub studies: Vec<StudySnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_number: Option<String>,
    #[serde(default)]
    pub authorized: bool,
    #[serde(default)]
    pub sample_taken: bool,
    pub status: OrderStatus,
    pub scheduled_at: DateTime<Utc>,
}

impl Order {
    /// Comma-separated study names for list views.
    pub fn study_names(&self) -> String {
        self.studies
            .iter()
            .map(|s| s.display_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Creation payload. The backend assigns the id, the initial `pending`
/// status, and the unset sample flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub patient_id: String,
    pub studies: Vec<StudySnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_number: Option<String>,
    pub authorized: bool,
    pub scheduled_at: DateTime<Utc>,
}

/// Partial update issued by the worklist: a status step, a sample-flag
/// toggle, or both. Absent members are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_taken: Option<bool>,
}

impl OrderUpdate {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn sample_taken(sample_taken: bool) -> Self {
        Self {
            sample_taken: Some(sample_taken),
            ..Default::default()
        }
    }
}
