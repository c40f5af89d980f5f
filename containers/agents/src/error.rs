use resource_agent::provider::{ProviderError, Resources};
use snafu::Snafu;
use std::num::TryFromIntError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Port {} of container '{}' is out of range: {}", port, container, source))]
    PortRange {
        container: String,
        port: u32,
        source: TryFromIntError,
    },

    #[snafu(display("The management API response is missing '{}'", field))]
    MissingField { field: String },

    #[snafu(display("The management API returned an unrecognized {}: {}", what, source))]
    UnknownValue {
        what: String,
        source: container_types::ParseError,
    },
}

impl Error {
    /// Expanding fails before anything is written. Flattening fails after the object exists.
    fn resources(&self) -> Resources {
        match self {
            Error::PortRange { .. } => Resources::Clear,
            Error::MissingField { .. } | Error::UnknownValue { .. } => Resources::Remaining,
        }
    }
}

impl From<Error> for ProviderError {
    fn from(e: Error) -> Self {
        ProviderError::new_with_source(e.resources(), e)
    }
}
