use crate::provider::{ProviderError, Resources};
use reconcile_model::clients::Error as ClientError;
use reconcile_model::{NaturalKey, ProvisioningState, ValidationReport};
use snafu::Snafu;
use std::time::Duration;

/// The result type returned by a [`Reconciler`](crate::Reconciler).
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by a [`Reconciler`](crate::Reconciler). Each variant belongs to exactly
/// one [`ErrorKind`] so that callers can pick a retry policy without matching on messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid {} document: {}", kind, report))]
    Validation {
        kind: &'static str,
        report: ValidationReport,
    },

    #[snafu(display("Invalid {} id: {}", kind, source))]
    InvalidId {
        kind: &'static str,
        source: reconcile_model::Error,
    },

    #[snafu(display("Id '{}' does not refer to a {}", id, kind))]
    WrongType { kind: &'static str, id: String },

    #[snafu(display(
        "Id '{}' refers to {} but the document describes {}",
        id,
        id_key,
        document_key
    ))]
    KeyMismatch {
        id: String,
        id_key: NaturalKey,
        document_key: NaturalKey,
    },

    #[snafu(display("A {} cannot be updated in place, it must be replaced", kind))]
    UpdateNotSupported { kind: &'static str },

    #[snafu(display(
        "A {} named {} already exists with id '{}', import it instead of creating it",
        kind,
        key,
        id
    ))]
    AlreadyExists {
        kind: &'static str,
        key: NaturalKey,
        id: String,
    },

    #[snafu(display("Unable to {} {} {}: {}", operation, kind, key, source))]
    Remote {
        kind: &'static str,
        key: NaturalKey,
        operation: &'static str,
        source: ClientError,
    },

    #[snafu(display("Unable to {} {} {}: {}", operation, kind, key, source))]
    Provider {
        kind: &'static str,
        key: NaturalKey,
        operation: &'static str,
        source: ProviderError,
    },

    #[snafu(display(
        "The {} {} reached provisioning state '{}' while waiting for one of [{}]",
        kind,
        key,
        state,
        expected
    ))]
    ProvisioningFailed {
        kind: &'static str,
        key: NaturalKey,
        state: ProvisioningState,
        expected: String,
    },

    #[snafu(display(
        "Timed out after {:?} waiting for {} {} to {}, last observed state: {}",
        timeout,
        kind,
        key,
        operation,
        last_state.as_ref().map(|s| s.as_str()).unwrap_or("none")
    ))]
    Timeout {
        kind: &'static str,
        key: NaturalKey,
        operation: &'static str,
        timeout: Duration,
        last_state: Option<ProvisioningState>,
    },

    #[snafu(display("The {} {} was written but the API returned no id for it", kind, key))]
    MissingId { kind: &'static str, key: NaturalKey },

    #[snafu(display("The {} {} could not be read back after it was written", kind, key))]
    Vanished { kind: &'static str, key: NaturalKey },
}

/// The broad classes of failure a caller needs to tell apart.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The document or id is malformed or incomplete. Nothing was sent to the remote API.
    Validation,
    /// A create found an object with the same natural key. The caller may import it instead.
    Conflict,
    /// A call to the remote API failed.
    Remote,
    /// The remote object reported a failed provisioning state. Retrying the same request will not
    /// help.
    TerminalFailure,
    /// The deadline passed before the remote object reached a terminal state. The operation may
    /// still complete.
    Timeout,
    /// The remote API behaved in a way that breaks an assumption of the reconciler.
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. }
            | Error::InvalidId { .. }
            | Error::WrongType { .. }
            | Error::KeyMismatch { .. }
            | Error::UpdateNotSupported { .. } => ErrorKind::Validation,
            Error::AlreadyExists { .. } => ErrorKind::Conflict,
            Error::Remote { .. } => ErrorKind::Remote,
            Error::Provider { .. } => ErrorKind::Internal,
            Error::ProvisioningFailed { .. } => ErrorKind::TerminalFailure,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::MissingId { .. } | Error::Vanished { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the failed operation may have left a remote object behind.
    pub fn resources(&self) -> Resources {
        match self {
            Error::Validation { .. }
            | Error::InvalidId { .. }
            | Error::WrongType { .. }
            | Error::KeyMismatch { .. }
            | Error::UpdateNotSupported { .. }
            | Error::AlreadyExists { .. } => Resources::Clear,
            Error::Provider { source, .. } => source.resources(),
            Error::ProvisioningFailed { .. } | Error::Timeout { .. } | Error::MissingId { .. } => {
                Resources::Remaining
            }
            Error::Remote { .. } | Error::Vanished { .. } => Resources::Unknown,
        }
    }
}
