//! Stamp decisions for scanned booth codes.
//!
//! Turning raw decoder output into a decision is pure: normalize the text,
//! look it up in the catalog, consult the read model. Timers, cooldown and
//! the actual write belong to the caller.

use std::time::Duration;

use crate::catalog::{Catalog, CatalogItem};
use crate::ranking::{RankingUpdate, ReadModel};
use crate::types::Rating;

/// Rating given to an item stamped by scan when it has no rating yet.
///
/// A scan proves the attendee tasted the item but says nothing about how
/// they liked it, so the middle of the scale is used.
pub const DEFAULT_STAMP_RATING: Rating = Rating::NEUTRAL;

/// How long scans are ignored after one has been handled.
pub const SCAN_COOLDOWN: Duration = Duration::from_secs(3);

/// Message shown when the camera cannot be used.
pub const CAMERA_ERROR_MESSAGE: &str =
    "Error accessing camera. Please ensure camera permissions are granted.";

/// Case-fold and trim decoded text into a candidate item id.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.to_lowercase().trim().to_owned()
}

/// What to do with a scanned code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDecision {
    /// The code matches no catalog item. Nothing is written.
    Unrecognized {
        /// The normalized code.
        code: String,
    },
    /// The item already carries a stamp. Nothing is written.
    AlreadyStamped {
        /// The matched item.
        item: CatalogItem,
    },
    /// Stamp the item by writing `update`.
    Stamp {
        /// The matched item.
        item: CatalogItem,
        /// Partial update to apply.
        update: RankingUpdate,
    },
}

impl ScanDecision {
    /// Decide how to handle raw decoder text for the given passport.
    #[must_use]
    pub fn decide(catalog: &Catalog, model: &ReadModel, raw: &str) -> Self {
        let code = normalize_code(raw);

        let Some(item) = catalog.find(&code) else {
            return Self::Unrecognized { code };
        };

        let existing = model.get(&code);
        if existing.is_some_and(|r| r.tasted) {
            return Self::AlreadyStamped { item: item.clone() };
        }

        let has_rating = existing.is_some_and(|r| r.rating.is_rated());
        let update = RankingUpdate {
            rating: (!has_rating).then_some(DEFAULT_STAMP_RATING),
            tasted: Some(true),
            notes: None,
        };

        Self::Stamp {
            item: item.clone(),
            update,
        }
    }

    /// Human-readable status for the scanner view.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Unrecognized { code } => format!("Error: Code \"{code}\" not recognized."),
            Self::AlreadyStamped { item } => {
                format!("Success! You already stamped {}.", item.name)
            }
            Self::Stamp { item, .. } => {
                format!("STAMPED! You collected the stamp for {}!", item.name)
            }
        }
    }

    /// Whether the status should be shown as a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Unrecognized { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ranking::RankingRecord;
    use crate::types::ItemId;

    fn model_with(id: &str, stars: u8, tasted: bool) -> ReadModel {
        ReadModel::from_records(vec![RankingRecord {
            sake_id: ItemId::new(id),
            rating: Rating::new(stars).unwrap(),
            tasted,
            notes: String::new(),
            timestamp: 1,
        }])
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  SAKE-3 \n"), "sake-3");
        assert_eq!(normalize_code("sake-1"), "sake-1");
    }

    #[test]
    fn test_unknown_code() {
        let decision = ScanDecision::decide(&Catalog::bundled(), &ReadModel::default(), "beer-1");
        assert_eq!(
            decision,
            ScanDecision::Unrecognized {
                code: "beer-1".to_owned()
            }
        );
        assert_eq!(decision.message(), "Error: Code \"beer-1\" not recognized.");
        assert!(!decision.is_success());
    }

    #[test]
    fn test_untasted_without_rating_gets_default() {
        let decision = ScanDecision::decide(&Catalog::bundled(), &ReadModel::default(), "SAKE-3");
        let ScanDecision::Stamp { item, update } = &decision else {
            panic!("expected stamp, got {decision:?}");
        };
        assert_eq!(item.id.as_str(), "sake-3");
        assert_eq!(update.tasted, Some(true));
        assert_eq!(update.rating, Some(Rating::NEUTRAL));
        assert_eq!(
            decision.message(),
            "STAMPED! You collected the stamp for Hakkaisan!"
        );
    }

    #[test]
    fn test_untasted_with_rating_keeps_rating() {
        // A record can be rated but untasted only if written by another client.
        let model = model_with("sake-2", 4, false);
        let decision = ScanDecision::decide(&Catalog::bundled(), &model, "sake-2");
        let ScanDecision::Stamp { update, .. } = decision else {
            panic!("expected stamp");
        };
        assert_eq!(update.rating, None);
        assert_eq!(update.tasted, Some(true));
    }

    #[test]
    fn test_already_stamped() {
        let model = model_with("sake-1", 0, true);
        let decision = ScanDecision::decide(&Catalog::bundled(), &model, "sake-1");
        assert!(matches!(decision, ScanDecision::AlreadyStamped { .. }));
        assert_eq!(decision.message(), "Success! You already stamped Dassai 45.");
        assert!(decision.is_success());
    }
}
