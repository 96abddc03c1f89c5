//! # LIS Core
//!
//! Domain model and pure client-side logic for the laboratory information
//! system:
//! - Protocol templates with typed fields and reference ranges
//! - Order composition from a patient and selected studies
//! - The worklist status machine (pending → in-process → completed)
//! - Per-study result entry and sequential submission
//!
//! **No transport concerns**: HTTP, session persistence, and the concrete
//! backend client live in `lis-api`. This crate talks to the backend only
//! through the [`Backend`] trait so the logic can be exercised against an
//! in-memory fake.

pub mod backend;
pub mod composer;
pub mod dashboard;
pub mod error;
pub mod order;
pub mod patient;
pub mod protocol;
pub mod results;
pub mod worklist;

pub use backend::Backend;
pub use composer::OrderDraft;
pub use dashboard::DashboardStats;
pub use error::{LabError, LabResult};
pub use order::{NewOrder, Order, OrderStatus, OrderUpdate, StudySnapshot};
pub use patient::{filter_patients, NewPatient, Patient};
pub use protocol::{
    display_value, Field, FieldKind, InputControl, NewProtocol, Protocol, RangeFlag,
    ReferenceRange, ResultValue,
};
pub use results::{NewResult, ResultEntry, ResultRecord};
pub use worklist::{available_actions, OrderAction, StatusFilter, WorklistService};
