//! Result entry: one value map per study, submitted sequentially.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::order::{Order, OrderStatus, OrderUpdate};
use crate::protocol::ResultValue;
use crate::{LabError, LabResult};

/// Field values collected for one study, keyed by field key.
pub type ValueMap = BTreeMap<String, ResultValue>;

/// A recorded result as stored by the backend: the values for one study
/// within one order, with back-references by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub id: String,
    pub order_id: String,
    pub patient_id: String,
    pub protocol_id: String,
    #[serde(default)]
    pub values: ValueMap,
    #[serde(default)]
    pub comments: String,
}

/// Creation payload for one study's result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResult {
    pub order_id: String,
    pub patient_id: String,
    pub protocol_id: String,
    pub values: ValueMap,
    pub comments: String,
}

/// The result-entry form for one order.
///
/// On construction there is one empty value map per study, keyed by
/// protocol id. Values are filled in per field; a field never written stays
/// out of the map entirely, so blank inputs and absent values are the same
/// thing downstream.
#[derive(Debug, Clone)]
pub struct ResultEntry {
    order_id: String,
    patient_id: String,
    protocol_ids: Vec<String>,
    values: BTreeMap<String, ValueMap>,
    comments: String,
}

impl ResultEntry {
    /// Initialises the form from an order: one empty map per study.
    pub fn new(order: &Order) -> Self {
        let protocol_ids: Vec<String> = order
            .studies
            .iter()
            .map(|s| s.protocol_id.clone())
            .collect();
        let values = protocol_ids
            .iter()
            .map(|id| (id.clone(), ValueMap::new()))
            .collect();
        Self {
            order_id: order.id.clone(),
            patient_id: order.patient.id.clone(),
            protocol_ids,
            values,
            comments: String::new(),
        }
    }

    /// Records a value for one field of one study.
    ///
    /// # Errors
    ///
    /// Returns `LabError::NotFound` when the protocol is not part of the
    /// order this form was initialised from.
    pub fn set_value(
        &mut self,
        protocol_id: &str,
        field_key: &str,
        value: ResultValue,
    ) -> LabResult<()> {
        let map = self
            .values
            .get_mut(protocol_id)
            .ok_or_else(|| LabError::NotFound {
                kind: "protocol",
                id: protocol_id.to_string(),
            })?;
        map.insert(field_key.to_string(), value);
        Ok(())
    }

    /// Sets the comments shared by every result of this order.
    pub fn set_comments(&mut self, comments: impl Into<String>) {
        self.comments = comments.into();
    }

    /// The values collected so far for one study.
    pub fn values_for(&self, protocol_id: &str) -> Option<&ValueMap> {
        self.values.get(protocol_id)
    }

    /// Submits one result record per study, sequentially and in study
    /// order, then advances the order to `completed`.
    ///
    /// There is deliberately no compensation logic: if a create fails
    /// mid-sequence, the results already persisted stay persisted, the
    /// remaining studies are not attempted, and the order status is left
    /// untouched. The operator re-triggers entry after fixing the cause.
    /// Only when every per-study create has succeeded is the order moved to
    /// `completed`.
    pub async fn submit<B: Backend>(&self, backend: &B) -> LabResult<Order> {
        for protocol_id in &self.protocol_ids {
            let values = self
                .values
                .get(protocol_id)
                .cloned()
                .unwrap_or_default();
            let record = NewResult {
                order_id: self.order_id.clone(),
                patient_id: self.patient_id.clone(),
                protocol_id: protocol_id.clone(),
                values,
                comments: self.comments.clone(),
            };
            backend.create_result(&record).await?;
            tracing::debug!(order = %self.order_id, protocol = %protocol_id, "result recorded");
        }

        let completed = backend
            .update_order(&self.order_id, &OrderUpdate::status(OrderStatus::Completed))
            .await?;
        tracing::info!(order = %self.order_id, "order completed");
        Ok(completed)
    }
}
