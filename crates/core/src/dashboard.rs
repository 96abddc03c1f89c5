//! Headline counts for the landing view.

use chrono::NaiveDate;

use crate::order::{Order, OrderStatus};
use crate::patient::Patient;

/// The counts shown when the client opens: registry size, today's
/// scheduled orders, and the pending backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_patients: usize,
    pub orders_today: usize,
    pub pending_orders: usize,
}

impl DashboardStats {
    /// Derives the counts from already fetched lists. `today` is passed in
    /// rather than read from the clock, so the projection stays pure.
    pub fn derive(patients: &[Patient], orders: &[Order], today: NaiveDate) -> Self {
        Self {
            total_patients: patients.len(),
            orders_today: orders
                .iter()
                .filter(|o| o.scheduled_at.date_naive() == today)
                .count(),
            pending_orders: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
        }
    }
}
