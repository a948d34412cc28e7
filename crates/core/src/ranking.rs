//! Ranking records and the partial-update merge policy.
//!
//! A [`RankingRecord`] holds one identity's opinion of one catalog item. Edits
//! arrive as a [`RankingUpdate`] naming only the fields that change; the
//! merge is done here, in application code, so the result never depends on
//! how a particular store treats partial writes.
//!
//! # Invariants
//!
//! - A record with `rating > 0` is always `tasted`. The merge enforces this.
//! - A missing record reads as `{rating: 0, tasted: false, notes: ""}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ItemId, Rating};

/// Stored document field names.
pub mod fields {
    pub const SAKE_ID: &str = "sakeId";
    pub const RATING: &str = "rating";
    pub const TASTED: &str = "tasted";
    pub const NOTES: &str = "notes";
    pub const TIMESTAMP: &str = "timestamp";
}

/// One identity's rating, stamp and notes for one catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRecord {
    /// Catalog item this record belongs to.
    pub sake_id: ItemId,
    /// Star rating, `0` when unrated.
    #[serde(default)]
    pub rating: Rating,
    /// Whether the passport holds a stamp for this item.
    #[serde(default)]
    pub tasted: bool,
    /// Free-text tasting notes.
    #[serde(default)]
    pub notes: String,
    /// Milliseconds since the Unix epoch of the last write.
    #[serde(default)]
    pub timestamp: i64,
}

impl RankingRecord {
    /// The record every item has before anybody touches it.
    #[must_use]
    pub fn unrated(sake_id: ItemId) -> Self {
        Self {
            sake_id,
            rating: Rating::UNRATED,
            tasted: false,
            notes: String::new(),
            timestamp: 0,
        }
    }

    /// Apply a partial update on top of this record.
    ///
    /// Fields absent from `update` keep their current value. The result always
    /// satisfies the rating/tasted invariant: giving stars stamps the item,
    /// and an explicit un-stamp (with no new rating) clears the stars.
    #[must_use]
    pub fn merged(&self, update: &RankingUpdate, timestamp: i64) -> Self {
        let mut rating = update.rating.unwrap_or(self.rating);
        let mut tasted = update.tasted.unwrap_or(self.tasted);
        let notes = update
            .notes
            .clone()
            .unwrap_or_else(|| self.notes.clone());

        if rating.is_rated() && !tasted {
            if update.tasted == Some(false) && update.rating.is_none() {
                rating = Rating::UNRATED;
            } else {
                tasted = true;
            }
        }

        Self {
            sake_id: self.sake_id.clone(),
            rating,
            tasted,
            notes,
            timestamp,
        }
    }

    /// Decode a stored document.
    ///
    /// The document id is authoritative for `sakeId`; documents written
    /// without that field are still accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if a field has the wrong type or the rating is out
    /// of range.
    pub fn from_document(
        document_id: &str,
        mut document: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        document.insert(
            fields::SAKE_ID.to_owned(),
            Value::String(document_id.to_owned()),
        );
        serde_json::from_value(Value::Object(document))
    }

    /// Encode as the full set of stored document fields.
    #[must_use]
    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = Map::new();
        document.insert(
            fields::SAKE_ID.to_owned(),
            Value::String(self.sake_id.to_string()),
        );
        document.insert(
            fields::RATING.to_owned(),
            Value::from(self.rating.value()),
        );
        document.insert(fields::TASTED.to_owned(), Value::Bool(self.tasted));
        document.insert(fields::NOTES.to_owned(), Value::String(self.notes.clone()));
        document.insert(fields::TIMESTAMP.to_owned(), Value::from(self.timestamp));
        document
    }
}

/// A partial edit to a ranking record. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingUpdate {
    /// New star rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    /// New stamp state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasted: Option<bool>,
    /// New notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RankingUpdate {
    /// Give stars. Rating an item implies having tasted it.
    #[must_use]
    pub const fn rate(rating: Rating) -> Self {
        Self {
            rating: Some(rating),
            tasted: Some(true),
            notes: None,
        }
    }

    /// Flip the stamp relative to the currently displayed state.
    #[must_use]
    pub const fn toggle_stamp(currently_tasted: bool) -> Self {
        Self {
            rating: None,
            tasted: Some(!currently_tasted),
            notes: None,
        }
    }

    /// Save notes. Writing notes implies having tasted the item.
    #[must_use]
    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            rating: None,
            tasted: Some(true),
            notes: Some(notes.into()),
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rating.is_none() && self.tasted.is_none() && self.notes.is_none()
    }
}

/// All ranking records of one identity, keyed by item id.
///
/// Rebuilt wholesale from every store snapshot and never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReadModel {
    records: BTreeMap<ItemId, RankingRecord>,
}

impl ReadModel {
    /// Build a read model from decoded records.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = RankingRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.sake_id.clone(), record))
                .collect(),
        }
    }

    /// The stored record for an item, if one exists.
    #[must_use]
    pub fn get(&self, item_id: &str) -> Option<&RankingRecord> {
        self.records.get(item_id)
    }

    /// The stored record for an item, or the unrated default.
    #[must_use]
    pub fn effective(&self, item_id: &ItemId) -> RankingRecord {
        self.records
            .get(item_id.as_str())
            .cloned()
            .unwrap_or_else(|| RankingRecord::unrated(item_id.clone()))
    }

    /// Whether the item carries a stamp.
    #[must_use]
    pub fn is_tasted(&self, item_id: &str) -> bool {
        self.get(item_id).is_some_and(|r| r.tasted)
    }

    /// Iterate records in item id order.
    pub fn iter(&self) -> impl Iterator<Item = &RankingRecord> {
        self.records.values()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rating(v: u8) -> Rating {
        Rating::new(v).unwrap()
    }

    fn record(id: &str, stars: u8, tasted: bool, notes: &str) -> RankingRecord {
        RankingRecord {
            sake_id: ItemId::new(id),
            rating: rating(stars),
            tasted,
            notes: notes.to_owned(),
            timestamp: 1,
        }
    }

    #[test]
    fn test_missing_record_is_default() {
        let model = ReadModel::default();
        let effective = model.effective(&ItemId::new("sake-1"));
        assert_eq!(effective.rating, Rating::UNRATED);
        assert!(!effective.tasted);
        assert_eq!(effective.notes, "");
        assert!(!model.is_tasted("sake-1"));
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let current = record("sake-1", 2, true, "sweet");
        let update = RankingUpdate {
            notes: Some("dry".to_owned()),
            ..RankingUpdate::default()
        };
        let merged = current.merged(&update, 10);
        assert_eq!(merged.rating, rating(2));
        assert!(merged.tasted);
        assert_eq!(merged.notes, "dry");
        assert_eq!(merged.timestamp, 10);
    }

    #[test]
    fn test_rating_implies_tasted_regardless_of_prior_state() {
        let untasted = RankingRecord::unrated(ItemId::new("sake-2"));
        let update = RankingUpdate {
            rating: Some(rating(4)),
            ..RankingUpdate::default()
        };
        let merged = untasted.merged(&update, 5);
        assert!(merged.tasted);
        assert_eq!(merged.rating, rating(4));

        let contradictory = RankingUpdate {
            rating: Some(rating(4)),
            tasted: Some(false),
            notes: None,
        };
        assert!(untasted.merged(&contradictory, 6).tasted);
    }

    #[test]
    fn test_unstamp_clears_rating() {
        let current = record("sake-1", 4, true, "");
        let merged = current.merged(&RankingUpdate::toggle_stamp(true), 7);
        assert!(!merged.tasted);
        assert_eq!(merged.rating, Rating::UNRATED);
    }

    #[test]
    fn test_merge_is_idempotent_except_timestamp() {
        let current = record("sake-3", 0, false, "");
        let update = RankingUpdate::rate(rating(5));
        let once = current.merged(&update, 100);
        let twice = once.merged(&update, 200);
        assert_eq!(once.rating, twice.rating);
        assert_eq!(once.tasted, twice.tasted);
        assert_eq!(once.notes, twice.notes);
        assert_ne!(once.timestamp, twice.timestamp);
    }

    #[test]
    fn test_notes_update_marks_tasted() {
        let update = RankingUpdate::notes("melon");
        assert_eq!(update.tasted, Some(true));
        assert!(!update.is_empty());
        assert!(RankingUpdate::default().is_empty());
    }

    #[test]
    fn test_document_encoding_uses_stored_field_names() {
        let doc = record("sake-4", 3, true, "bold").to_document();
        assert_eq!(doc.get("sakeId"), Some(&Value::from("sake-4")));
        assert_eq!(doc.get("rating"), Some(&Value::from(3)));
        assert_eq!(doc.get("tasted"), Some(&Value::Bool(true)));
        assert_eq!(doc.get("notes"), Some(&Value::from("bold")));
        assert_eq!(doc.get("timestamp"), Some(&Value::from(1)));
    }

    #[test]
    fn test_from_document_fills_defaults_and_id() {
        let mut doc = Map::new();
        doc.insert("tasted".to_owned(), Value::Bool(true));
        let decoded = RankingRecord::from_document("sake-5", doc).unwrap();
        assert_eq!(decoded.sake_id, ItemId::new("sake-5"));
        assert!(decoded.tasted);
        assert_eq!(decoded.rating, Rating::UNRATED);
        assert_eq!(decoded.notes, "");
    }

    #[test]
    fn test_from_document_rejects_bad_rating() {
        let mut doc = Map::new();
        doc.insert("rating".to_owned(), Value::from(11));
        assert!(RankingRecord::from_document("sake-5", doc).is_err());
    }

    #[test]
    fn test_read_model_keys_by_sake_id() {
        let model = ReadModel::from_records(vec![
            record("sake-2", 1, true, ""),
            record("sake-1", 0, false, ""),
        ]);
        assert_eq!(model.len(), 2);
        assert!(model.is_tasted("sake-2"));
        let ids: Vec<_> = model.iter().map(|r| r.sake_id.as_str()).collect();
        assert_eq!(ids, vec!["sake-1", "sake-2"]);
    }
}
