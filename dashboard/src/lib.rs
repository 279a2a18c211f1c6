//! Intern dashboard core
//!
//! Session handling, role-gated routing and the domain services backing the intern, SPOC and
//! manager dashboards. The crate has no UI of its own: views subscribe to the state streams exposed
//! by the services and drive them through their async operations.

pub mod api;
pub mod auth;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod router;
pub mod service;
pub mod state;
pub mod storage;

pub use auth::{AuthError, AuthService, Session};
pub use model::role::Role;
pub use router::{Navigation, Router, View};
