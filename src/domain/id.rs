//! Entity identifiers
//!
//! Every persisted entity is keyed by a UUID v4 string wrapped in its own
//! newtype so that a `CuyId` can never be passed where a `CageId` is expected.

/// Declares a UUID-backed identifier newtype implementing [`StorageKey`].
///
/// [`StorageKey`]: crate::domain::storage::StorageKey
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Parse an identifier, rejecting anything that is not a UUID
            pub fn parse(value: &str) -> Result<Self, $crate::domain::DomainError> {
                uuid::Uuid::parse_str(value.trim())
                    .map(|uuid| Self(uuid.to_string()))
                    .map_err(|_| {
                        $crate::domain::DomainError::invalid_id(format!(
                            "'{}' is not a valid {} id",
                            value, $label
                        ))
                    })
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::domain::DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl $crate::domain::storage::StorageKey for $name {
            fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

pub(crate) use entity_id;
