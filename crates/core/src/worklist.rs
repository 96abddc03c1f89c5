//! The worklist: orders in flight, their filters, and their mutations.
//!
//! Filtering is a pure projection over the last fetched list. Mutations go
//! to the backend and are always followed by a full authoritative re-read;
//! when a mutation fails, the local list is left exactly as it was.

use crate::backend::Backend;
use crate::order::{Order, OrderStatus, OrderUpdate};
use crate::{LabError, LabResult};

/// Status filter for the worklist view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl std::str::FromStr for StatusFilter {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(StatusFilter::All),
            other => other.parse::<OrderStatus>().map(StatusFilter::Only),
        }
    }
}

/// Projects the order list through a status filter. Pure; never mutates.
pub fn filter<'a>(orders: &'a [Order], filter: StatusFilter) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|o| match filter {
            StatusFilter::All => true,
            StatusFilter::Only(status) => o.status == status,
        })
        .collect()
}

/// Actions the worklist offers for one order, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    /// Begin work: pending → in-process.
    Start,
    /// Open the result-entry form.
    EnterResults,
    /// Open the finished report.
    ViewReport,
}

/// The actions available for an order given its status. A completed order
/// never offers `Start` or `EnterResults`.
pub fn available_actions(order: &Order) -> Vec<OrderAction> {
    let mut actions = Vec::new();
    if order.status == OrderStatus::Pending {
        actions.push(OrderAction::Start);
    }
    if order.status != OrderStatus::Completed {
        actions.push(OrderAction::EnterResults);
    }
    if order.status == OrderStatus::Completed {
        actions.push(OrderAction::ViewReport);
    }
    actions
}

/// Drives worklist mutations against a backend.
pub struct WorklistService<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> WorklistService<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Fetches the authoritative order list.
    pub async fn refresh(&self) -> LabResult<Vec<Order>> {
        self.backend.list_orders().await
    }

    /// Moves a pending order to in-process, then re-reads the list.
    ///
    /// # Errors
    ///
    /// Returns `LabError::InvalidTransition` without touching the backend
    /// when the order is not pending.
    pub async fn start(&self, order: &Order) -> LabResult<Vec<Order>> {
        if !order.status.can_advance_to(OrderStatus::InProcess) {
            return Err(LabError::InvalidTransition {
                from: order.status,
                to: OrderStatus::InProcess,
            });
        }
        self.backend
            .update_order(&order.id, &OrderUpdate::status(OrderStatus::InProcess))
            .await?;
        tracing::info!(order = %order.id, "order started");
        self.refresh().await
    }

    /// Flips the sample-taken flag, then re-reads the list. The flag is
    /// independent of the status machine but frozen once the order is
    /// completed.
    pub async fn toggle_sample(&self, order: &Order) -> LabResult<Vec<Order>> {
        if order.status == OrderStatus::Completed {
            return Err(LabError::Validation(
                "completed orders can no longer be modified".into(),
            ));
        }
        self.backend
            .update_order(&order.id, &OrderUpdate::sample_taken(!order.sample_taken))
            .await?;
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::Patient;

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.into(),
            patient: Patient {
                id: "p1".into(),
                first_name: "Ana".into(),
                last_name: "Gomez".into(),
                dni: "30111222".into(),
                dob: "1990-01-01".into(),
                phone: None,
                insurer: None,
            },
            studies: vec![],
            insurer: None,
            auth_number: None,
            authorized: false,
            sample_taken: false,
            status,
            scheduled_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn filtering_is_a_pure_projection() {
        let orders = vec![
            order("o1", OrderStatus::Pending),
            order("o2", OrderStatus::InProcess),
            order("o3", OrderStatus::Completed),
        ];

        assert_eq!(filter(&orders, StatusFilter::All).len(), 3);
        let pending = filter(&orders, StatusFilter::Only(OrderStatus::Pending));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "o1");
        // The source list is untouched.
        assert_eq!(orders.len(), 3);
    }

    #[test]
    fn status_filter_parses_wire_names() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "in-process".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(OrderStatus::InProcess)
        );
        assert!("done".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn start_is_only_offered_while_pending() {
        assert_eq!(
            available_actions(&order("o1", OrderStatus::Pending)),
            vec![OrderAction::Start, OrderAction::EnterResults]
        );
        assert_eq!(
            available_actions(&order("o2", OrderStatus::InProcess)),
            vec![OrderAction::EnterResults]
        );
        assert_eq!(
            available_actions(&order("o3", OrderStatus::Completed)),
            vec![OrderAction::ViewReport]
        );
    }
}
