//! Reconciler error types
//!
//! Every variant is a configuration or contract error. None of them is
//! recoverable: continuing after one would leave the host tree out of sync
//! with the declared element tree.

use thiserror::Error;

use crate::tree::HostId;

/// Errors raised while mounting, updating or dismantling the host tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The rendering backend returned no handle for a primitive
    #[error("Rendering backend does not recognize primitive `{0}`")]
    UnrecognizedPrimitive(&'static str),

    /// A modified element kept expanding past the configured depth
    #[error("Modifier chain did not terminate after {0} expansions")]
    UnterminatedModifierChain(usize),

    /// A storage slot holds a value of another type than the one declared
    #[error("Storage slot {slot} of `{component}` does not hold a `{expected}`")]
    PropertyTypeMismatch {
        component: &'static str,
        slot: usize,
        expected: &'static str,
    },

    /// A `State` handle is already bound to another mounted host
    #[error("State in slot {slot} of `{component}` is owned by another mounted host")]
    StateAlreadyOwned {
        component: &'static str,
        slot: usize,
    },

    /// A host was handed an element of a different kind
    #[error("{host} host cannot take element `{element}`")]
    KindMismatch {
        host: &'static str,
        element: &'static str,
    },

    /// A primitive host lost its platform handle before an update
    #[error("Primitive `{0}` has no platform handle to update")]
    MissingHandle(&'static str),

    /// A host id that is not mounted was used where a live host is required
    #[error("Host {0:?} is not mounted")]
    UnknownHost(HostId),

    /// A flush started while another pass was running
    #[error("Reconciler re-entered while a pass was in progress")]
    Reentrant,

    /// Configuration could not be parsed
    #[error("Invalid reconciler configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for reconciler operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Stop the process on an error that has nowhere to propagate to.
///
/// Used by the scheduled flush closure, which is invoked by the platform
/// hook and cannot return a `Result`.
pub(crate) fn fatal(err: &ReconcileError) -> ! {
    tracing::error!("fatal reconciler error: {}", err);
    panic!("arbor: {err}");
}
