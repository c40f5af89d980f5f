use crate::clients::{HttpStatusCode, StatusCode};
use snafu::Snafu;

/// The `Result` type returned by `clients`.
pub type Result<T> = std::result::Result<T, Error>;

/// The public error type returned by `clients`.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

/// The private error type returned by `clients`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub(crate) enum InnerError {
    #[snafu(display("Error initializing the HTTP client: {}", source))]
    Initialization { source: reqwest::Error },

    #[snafu(display("Unable to read environment variable '{}': {}", key, source))]
    EnvRead {
        key: String,
        source: std::env::VarError,
    },

    #[snafu(display("Unable to {} {}: {}", method, what, source))]
    ApiCall {
        method: String,
        what: String,
        source: reqwest::Error,
    },

    #[snafu(display("Unable to {} {}: the API responded {}: {}", method, what, status, body))]
    ApiStatus {
        method: String,
        what: String,
        status: StatusCode,
        body: String,
    },

    #[snafu(display("Unable to {} {}: the request was rejected: {}", method, what, message))]
    Rejected {
        method: String,
        what: String,
        message: String,
    },

    #[snafu(display("{} was not found", what))]
    NotFound { what: String },

    #[snafu(display("Error deserializing {}: {}", what, source))]
    Serde {
        what: String,
        source: serde_json::Error,
    },
}

impl HttpStatusCode for InnerError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            InnerError::Initialization { .. }
            | InnerError::EnvRead { .. }
            | InnerError::Serde { .. } => None,
            InnerError::ApiCall { source, .. } => source.status(),
            InnerError::ApiStatus { status, .. } => Some(*status),
            InnerError::Rejected { .. } => Some(StatusCode::BAD_REQUEST),
            InnerError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
        }
    }
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        self.0.status_code()
    }
}

impl Error {
    /// Whether the management API reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.is_status_code(StatusCode::NOT_FOUND)
    }
}
