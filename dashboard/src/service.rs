//! Domain services
//!
//! Every service owns its collection as a `Subject`, so views get notified on every mutation.
//! Failures are both returned and published to the shared `Notifications`.

use thiserror::Error;

use crate::model::ValidationError;
use crate::model::report::ExportFormat;
use crate::model::role::Role;
use crate::notify::Notifications;

pub mod interns;
pub mod performance;
pub mod reports;
pub mod system;

pub use interns::InternService;
pub use performance::{InternPerformanceService, PerformanceStore};
pub use reports::ReportService;
pub use system::SystemService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Only the {required} role is allowed to do this")]
    PermissionDenied { required: Role },
    #[error("Export as {0} is not supported")]
    UnsupportedFormat(ExportFormat),
    #[error("Invalid value for {id}: {reason}")]
    InvalidConfig { id: String, reason: String },
    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Publishes the outcome of an operation, passing the result through
///
/// Errors show up as error notifications, success as the given message.
pub(crate) async fn settle<T>(
    notifications: &Notifications,
    result: ServiceResult<T>,
    success: impl FnOnce(&T) -> Option<String>,
) -> ServiceResult<T> {
    match &result {
        Ok(value) => {
            if let Some(message) = success(value) {
                notifications.success(message).await;
            }
        }
        Err(err) => notifications.error(err.to_string()).await,
    }
    notifications.set_loading(false).await;
    result
}
