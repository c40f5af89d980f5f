/*!

`container-types` holds the typed documents for the container bindings: what a user declares for a
container group or a container service, and what is read back from the management API in the same
shape. Each document has a standalone `validate` function.

!*/

use std::fmt::{Display, Formatter};

/// An error that can occur when parsing a string into one of the enums in this crate.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseError {
    what: &'static str,
    value: String,
    expected: &'static [&'static str],
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' is not a valid {}, expected one of: {}",
            self.value,
            self.what,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for ParseError {}

/// Define a string-like enum whose values parse without regard to case and always display in the
/// management API's casing. Serde goes through `FromStr` and `Display` via `serde_plain`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal, default = $default:ident,
        { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($label),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($label) {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::ParseError {
                    what: $what,
                    value: s.to_string(),
                    expected: Self::VALUES,
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(self.as_str(), f)
            }
        }

        serde_plain::derive_deserialize_from_fromstr!($name, $what);
        serde_plain::derive_serialize_from_display!($name);
    };
}

pub(crate) use string_enum;

pub mod container_group;
pub mod container_service;
