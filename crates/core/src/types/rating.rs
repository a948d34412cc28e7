//! Star rating type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// The value is above the five-star maximum.
    #[error("rating must be between 0 and {max} (got {value})")]
    OutOfRange {
        /// The rejected value.
        value: i64,
        /// Maximum allowed rating.
        max: u8,
    },
}

/// A star rating from 0 to 5, where 0 means "not rated yet".
///
/// ## Examples
///
/// ```
/// use sake_passport_core::Rating;
///
/// assert!(Rating::new(5).is_ok());
/// assert!(Rating::new(6).is_err());
/// assert!(!Rating::UNRATED.is_rated());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Highest possible rating.
    pub const MAX: u8 = 5;

    /// The rating of an item nobody has scored yet.
    pub const UNRATED: Self = Self(0);

    /// A neutral middle-of-the-scale rating.
    pub const NEUTRAL: Self = Self(3);

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] if `value` is above [`Rating::MAX`].
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if value > Self::MAX {
            return Err(RatingError::OutOfRange {
                value: i64::from(value),
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    /// The numeric value (0-5).
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether the item has been given at least one star.
    #[must_use]
    pub const fn is_rated(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Self)
            .ok_or(RatingError::OutOfRange {
                value,
                max: Self::MAX,
            })
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_zero_through_five() {
        for v in 0..=5 {
            assert_eq!(Rating::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn test_new_rejects_above_max() {
        assert!(matches!(
            Rating::new(6),
            Err(RatingError::OutOfRange { value: 6, max: 5 })
        ));
    }

    #[test]
    fn test_try_from_negative() {
        assert!(Rating::try_from(-1_i64).is_err());
    }

    #[test]
    fn test_is_rated() {
        assert!(!Rating::UNRATED.is_rated());
        assert!(Rating::NEUTRAL.is_rated());
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Rating::new(4).unwrap()).unwrap();
        assert_eq!(json, "4");
    }
}
