//! Order composition: a selected patient plus a set of study snapshots.

use chrono::Utc;

use crate::backend::Backend;
use crate::order::{NewOrder, Order, StudySnapshot};
use crate::patient::Patient;
use crate::protocol::Protocol;
use crate::{LabError, LabResult};

/// A draft order under composition.
///
/// Studies are snapshots of the protocols as they were at selection time;
/// the draft never holds live protocol references. Submission validates
/// locally first, so an incomplete draft costs no network traffic.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    patient: Option<Patient>,
    studies: Vec<StudySnapshot>,
    pub insurer: Option<String>,
    pub auth_number: Option<String>,
    pub authorized: bool,
}

impl OrderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the patient the order is for. When the draft has no insurer
    /// yet, the patient's own insurer is copied in as the starting value.
    pub fn select_patient(&mut self, patient: Patient) {
        if self.insurer.is_none() {
            self.insurer = patient.insurer.clone();
        }
        self.patient = Some(patient);
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    /// Adds a study snapshot for the given protocol. Adding a protocol that
    /// is already selected is a no-op, so the selected count always equals
    /// the number of distinct protocols added.
    pub fn add_study(&mut self, protocol: &Protocol) {
        if self.studies.iter().any(|s| s.protocol_id == protocol.id) {
            return;
        }
        self.studies.push(StudySnapshot::of(protocol));
    }

    /// Removes the study for the given protocol id, if selected.
    pub fn remove_study(&mut self, protocol_id: &str) {
        self.studies.retain(|s| s.protocol_id != protocol_id);
    }

    pub fn studies(&self) -> &[StudySnapshot] {
        &self.studies
    }

    /// Checks the pre-submit invariants: a patient must be selected and at
    /// least one study added. Runs before any request is issued.
    pub fn validate(&self) -> LabResult<()> {
        if self.patient.is_none() {
            return Err(LabError::Validation("a patient must be selected".into()));
        }
        if self.studies.is_empty() {
            return Err(LabError::Validation(
                "at least one study must be added".into(),
            ));
        }
        Ok(())
    }

    /// Validates the draft, stamps the scheduling time, and hands creation
    /// to the backend. Server rejections come back with the server's own
    /// message; nothing local changes when that happens.
    pub async fn submit<B: Backend>(&self, backend: &B) -> LabResult<Order> {
        self.validate()?;
        // validate() guarantees the patient is present.
        let patient = self.patient.as_ref().ok_or_else(|| {
            LabError::Validation("a patient must be selected".into())
        })?;

        let order = NewOrder {
            patient_id: patient.id.clone(),
            studies: self.studies.clone(),
            insurer: self.insurer.clone(),
            auth_number: self.auth_number.clone(),
            authorized: self.authorized,
            scheduled_at: Utc::now(),
        };
        let created = backend.create_order(&order).await?;
        tracing::info!(order = %created.id, patient = %patient.dni, "order created");
        Ok(created)
    }
}
