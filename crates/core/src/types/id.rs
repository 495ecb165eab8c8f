//! Integer ID newtypes.
//!
//! The remote API hands out integer primary keys for users, products, cart
//! lines, orders, places and reviews. Each gets its own type so a product id
//! can't be passed where an order id is expected.

/// Declares an `i64` newtype with serde, `Display`, `FromStr` and the `From`
/// conversions both ways.
///
/// ```rust
/// # use gb_green_guide_core::define_id;
/// define_id!(TrailId);
///
/// let trail = TrailId::new(12);
/// assert_eq!(i64::from(trail), 12);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(PlaceId);
define_id!(ImageId);
define_id!(ReviewId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_parse() {
        let id: ProductId = " 42 ".parse().unwrap();
        assert_eq!(id, ProductId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id: OrderId = serde_json::from_str("123").unwrap();
        assert_eq!(id.as_i64(), 123);
        assert_eq!(serde_json::to_string(&id).unwrap(), "123");
    }
}
