use crate::error::{self, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use snafu::ResultExt;
use std::fmt::Debug;

/// The `Configuration` trait is for the typed documents that describe a resource, both the desired
/// document that a user writes and the canonical document that is read back from the remote API.
/// On the way in, a document is an untyped mapping of field names to values, for example:
///
/// ```yaml
/// name: my-group
/// resource_group_name: my-rg
/// os_type: Linux
/// container:
///   - name: web
///     image: nginx
///     cpu: 0.5
///     memory: 1.5
/// ```
///
/// The traits aggregated by `Configuration` are typical of "plain old data" types and give the
/// mapping a strong type. A mapping that is missing a required field or carries a value of the
/// wrong type fails in `from_map`/`from_value`, before anything is sent to the remote API.
///
pub trait Configuration:
    Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync + Sized + 'static
{
    /// Convert the `Configuration` object to a serde `Map`.
    fn into_map(self) -> Result<Map<String, Value>> {
        match self.into_value()? {
            Value::Object(map) => Ok(map),
            _ => Err(error::ConfigWrongValueTypeSnafu {}.build().into()),
        }
    }

    /// Convert the `Configuration` object to a serde `Value`.
    fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self).context(error::ConfigSerializationSnafu)?)
    }

    /// Deserialize the `Configuration` object from a serde `Map`.
    fn from_map(map: Map<String, Value>) -> Result<Self> {
        Self::from_value(Value::Object(map))
    }

    /// Deserialize the `Configuration` object from a serde `Value`.
    fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value).context(error::ConfigDeserializationSnafu)?)
    }
}
