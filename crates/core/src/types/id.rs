//! Newtype IDs for type-safe references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing a catalog item id with a user identity.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `Borrow<str>` so maps keyed by the ID can be queried with a `&str`
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use sake_passport_core::define_id;
/// define_id!(BoothId);
/// define_id!(GuestId);
///
/// let booth = BoothId::new("booth-a1");
/// let guest = GuestId::new("booth-a1");
///
/// // These are different types, so this won't compile:
/// // let _: BoothId = guest;
/// assert_eq!(booth.as_str(), guest.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Catalog item identifiers, e.g. `sake-3`.
define_id!(ItemId);

// Opaque identity of a passport owner.
define_id!(Identity);

impl Identity {
    /// Generate a fresh random identity (UUID v4).
    ///
    /// Used both for anonymous sign-in and as the fallback when no identity
    /// can be obtained from the session.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_item_id_display_and_str() {
        let id = ItemId::new("sake-3");
        assert_eq!(id.to_string(), "sake-3");
        assert_eq!(id.as_str(), "sake-3");
        assert_eq!(String::from(id), "sake-3");
    }

    #[test]
    fn test_item_id_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(ItemId::new("sake-1"), 1);
        assert_eq!(map.get("sake-1"), Some(&1));
        assert_eq!(map.get("sake-2"), None);
    }

    #[test]
    fn test_identity_serde_transparent() {
        let identity = Identity::new("abc123");
        let json = serde_json::to_string(&identity).unwrap_or_default();
        assert_eq!(json, "\"abc123\"");
    }

    #[test]
    fn test_generated_identities_are_unique() {
        let a = Identity::generate();
        let b = Identity::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
