//! The seam between client-side logic and the REST backend.
//!
//! Core flows (order submission, worklist mutation, result entry) talk to
//! the backend only through this trait. The production implementation lives
//! in `lis-api`; tests drive the same flows against an in-memory fake.
//!
//! Every mutation here is followed by an authoritative re-read on the
//! caller's side rather than an optimistic local patch: the server's
//! response is ground truth, and this client keeps no cache of mutable
//! entities.

use crate::order::{NewOrder, Order, OrderUpdate};
use crate::results::{NewResult, ResultRecord};
use crate::LabResult;

/// Order and result operations the core flows depend on.
///
/// Used generically rather than as a trait object, so implementors may use
/// `async fn` directly.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Fetches the full, authoritative order list.
    async fn list_orders(&self) -> LabResult<Vec<Order>>;

    /// Fetches one order by id.
    async fn get_order(&self, id: &str) -> LabResult<Order>;

    /// Creates an order; the backend assigns id and initial status.
    async fn create_order(&self, order: &NewOrder) -> LabResult<Order>;

    /// Applies a partial update (status step or sample flag) to an order.
    async fn update_order(&self, id: &str, update: &OrderUpdate) -> LabResult<Order>;

    /// Records the result for one study of one order. There is no update or
    /// delete counterpart; a result is written exactly once.
    async fn create_result(&self, result: &NewResult) -> LabResult<ResultRecord>;

    /// Fetches all results recorded against an order.
    async fn results_for_order(&self, order_id: &str) -> LabResult<Vec<ResultRecord>>;
}
