//! Error taxonomy for the LIS client.
//!
//! Three kinds of failure exist (and nothing here is fatal to the process):
//! validation errors caught before any network call, backend errors carrying
//! the server's own message verbatim, and explicit not-found states. Every
//! failure is reported at the boundary of the action that triggered it.

#[derive(Debug, thiserror::Error)]
pub enum LabError {
    /// Rejected locally before any request was issued.
    #[error("{0}")]
    Validation(String),
    /// The backend answered with a non-2xx status; the message is the
    /// server's own, or a generic fallback when the body was unreadable.
    #[error("{0}")]
    Backend(String),
    /// A referenced entity does not exist on this client's view.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    /// A status change that would move the order backwards or skip a state.
    #[error("order cannot move from {from} to {to}")]
    InvalidTransition {
        from: crate::order::OrderStatus,
        to: crate::order::OrderStatus,
    },
    #[error("invalid text: {0}")]
    Text(#[from] lis_types::TextError),
}

pub type LabResult<T> = std::result::Result<T, LabError>;
