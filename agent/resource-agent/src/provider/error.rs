use std::fmt::{Display, Formatter};

/// What a failed operation left in the management plane. The CLI uses it to tell the user whether
/// there is anything to clean up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resources {
    /// Nothing was written.
    Clear,

    /// The remote object exists and can be deleted by its natural key.
    Remaining,

    /// A write was attempted and its outcome is not known.
    Unknown,
}

impl Resources {
    pub fn hint(&self) -> &'static str {
        match self {
            Resources::Clear => "nothing was written",
            Resources::Remaining => "the remote object exists and must be deleted or imported",
            Resources::Unknown => "the remote object may or may not exist",
        }
    }
}

impl Display for Resources {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.hint())
    }
}

/// The error returned by [`Provider`](crate::provider::Provider) operations.
#[derive(Debug)]
pub struct ProviderError {
    resources: Resources,
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// `source` may be any error, or a plain message.
    pub fn new_with_source<E>(resources: Resources, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            resources,
            source: source.into(),
        }
    }

    pub fn resources(&self) -> Resources {
        self.resources
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.source, f)
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::{ProviderError, Resources};

    #[test]
    fn message_is_the_source() {
        let e = ProviderError::new_with_source(Resources::Clear, "port out of range");
        assert_eq!(e.to_string(), "port out of range");
        assert_eq!(e.resources(), Resources::Clear);
        assert!(std::error::Error::source(&e).is_some());
    }
}
