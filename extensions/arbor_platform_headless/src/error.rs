//! Headless platform error types

use arbor_core::ReconcileError;
use thiserror::Error;

use crate::backend::ViewId;

/// Errors raised by the headless platform
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// The view was never created or has been removed
    #[error("View {0:?} does not exist")]
    UnknownView(ViewId),

    /// Neither the view nor any ancestor handles taps
    #[error("View {0:?} does not handle taps")]
    NotTappable(ViewId),

    /// The view handling the tap is disabled
    #[error("View {0:?} is disabled")]
    Disabled(ViewId),

    /// No live view displays the given text
    #[error("No view displays {0:?}")]
    TextNotFound(String),

    /// Reconciliation failed
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Result type for headless platform operations
pub type Result<T> = std::result::Result<T, HeadlessError>;
