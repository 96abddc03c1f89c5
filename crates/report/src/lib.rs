//! # LIS Report
//!
//! Report rendering for completed orders. A single [`ReportBody`] is
//! derived from an order, its results, and the protocol definitions; both
//! the on-screen text table and the paginated export layout are produced
//! from that one body, so field filtering and out-of-range flagging cannot
//! drift between the two renderings.
//!
//! Actual print/PDF rasterisation is an external capability: the export
//! side of this crate stops at a laid-out page model with stamped footers.

pub mod body;
pub mod layout;
pub mod text;

pub use body::{ReportBody, ReportHeader, ReportRow, ReportSection, OBSERVATIONS_KEY};
pub use layout::{Document, Element, Page, PlacedElement};
pub use text::render_text;
