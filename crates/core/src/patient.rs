//! Patient identity records and registration validation.

use serde::{Deserialize, Serialize};

use crate::{LabError, LabResult};

/// A registered patient. Patients are created through registration and then
/// only referenced; nothing in this client deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// National identity number, the human lookup key.
    pub dni: String,
    /// Date of birth, `YYYY-MM-DD` on the wire.
    pub dob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurer: Option<String>,
}

impl Patient {
    /// Display name, given name first.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Registration payload. The backend assigns the id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub dni: String,
    pub dob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurer: Option<String>,
}

impl NewPatient {
    /// Required fields that are currently blank, in form order. Used to
    /// surface inline messages next to the offending inputs.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.first_name.trim().is_empty() {
            missing.push("first name");
        }
        if self.last_name.trim().is_empty() {
            missing.push("last name");
        }
        if self.dni.trim().is_empty() {
            missing.push("dni");
        }
        if self.dob.trim().is_empty() {
            missing.push("date of birth");
        }
        missing
    }

    /// Validates the registration before any request is issued.
    ///
    /// # Errors
    ///
    /// Returns `LabError::Validation` naming every missing required field.
    pub fn validate(&self) -> LabResult<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LabError::Validation(format!(
                "required: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Pure, side-effect-free filter over an already loaded patient list.
///
/// Matches case-insensitively against first or last name, and by substring
/// against the DNI. An empty query matches everyone. No server round-trip
/// happens here; the search input filters the list the caller last fetched.
pub fn filter_patients<'a>(patients: &'a [Patient], query: &str) -> Vec<&'a Patient> {
    let needle = query.trim().to_lowercase();
    patients
        .iter()
        .filter(|p| {
            needle.is_empty()
                || p.dni.contains(&needle)
                || p.first_name.to_lowercase().contains(&needle)
                || p.last_name.to_lowercase().contains(&needle)
        })
        .collect()
}
