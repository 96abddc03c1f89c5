//! # LIS API
//!
//! The HTTP side of the LIS client: a reqwest-based [`ApiClient`] for the
//! laboratory backend's REST contract, the [`SessionStore`] that holds the
//! authenticated identity (persisting only the bearer token across
//! invocations), and the [`ClientConfig`] resolved once at startup.
//!
//! Domain logic lives in `lis-core`; this crate only moves records over
//! the wire and normalises failures into a single error shape.

pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use client::{ApiClient, LoginResponse};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use session::{Session, SessionStore, User};
