//! Derived view models.
//!
//! Each view is a pure function of the catalog and the current read model.
//! Nothing here is stored; recompute on every snapshot.

use serde::Serialize;

use crate::catalog::{Catalog, CatalogItem};
use crate::ranking::{RankingRecord, ReadModel};

/// Markers per row on the conceptual venue map.
const MAP_COLUMNS: usize = 3;

/// A booth marker on the venue map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoothMarker {
    /// Booth label without the `Booth ` prefix.
    pub label: String,
    /// Horizontal position, percent of map width.
    pub x_percent: usize,
    /// Vertical position, percent of map height.
    pub y_percent: usize,
    /// Whether the booth's item is stamped.
    pub tasted: bool,
}

/// Stamp collection progress over the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapProgress {
    /// Catalog items carrying a stamp.
    pub tasted_count: usize,
    /// Catalog size.
    pub total_count: usize,
    /// `tasted_count / total_count` as a percentage, `0` for an empty catalog.
    pub percent: f64,
    /// One marker per catalog item, in catalog order.
    pub booths: Vec<BoothMarker>,
}

impl MapProgress {
    /// Compute progress for a passport.
    #[must_use]
    pub fn compute(catalog: &Catalog, model: &ReadModel) -> Self {
        let booths: Vec<BoothMarker> = catalog
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| BoothMarker {
                label: item.booth_label().to_owned(),
                x_percent: (index % MAP_COLUMNS) * 30 + 15,
                y_percent: (index / MAP_COLUMNS) * 35 + 15,
                tasted: model.is_tasted(item.id.as_str()),
            })
            .collect();

        let tasted_count = booths.iter().filter(|b| b.tasted).count();
        let total_count = catalog.len();
        let percent = if total_count > 0 {
            ratio(tasted_count, total_count) * 100.0
        } else {
            0.0
        };

        Self {
            tasted_count,
            total_count,
            percent,
            booths,
        }
    }

    /// Percentage rounded to a whole number for display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // 0..=100
    pub fn rounded_percent(&self) -> u32 {
        self.percent.round() as u32
    }
}

/// One catalog item together with the passport's record for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// The catalog item.
    pub item: CatalogItem,
    /// The effective record (default when none is stored).
    pub record: RankingRecord,
}

impl CatalogEntry {
    /// Notes can be edited once the item is stamped or rated.
    #[must_use]
    pub const fn notes_enabled(&self) -> bool {
        self.record.tasted || self.record.rating.is_rated()
    }
}

/// Pair every catalog item with its effective record, in catalog order.
#[must_use]
pub fn catalog_entries(catalog: &Catalog, model: &ReadModel) -> Vec<CatalogEntry> {
    catalog
        .items()
        .iter()
        .map(|item| CatalogEntry {
            item: item.clone(),
            record: model.effective(&item.id),
        })
        .collect()
}

/// The passport history: stamped items and rating statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassportSummary {
    /// Stamped items, highest rating first.
    pub entries: Vec<CatalogEntry>,
    /// Catalog size.
    pub total_count: usize,
    /// Stamped items with at least one star.
    pub rated_count: usize,
    /// Mean rating over rated items, `None` when nothing is rated.
    pub average_rating: Option<f64>,
}

impl PassportSummary {
    /// Compute the passport history.
    ///
    /// Ties in rating keep catalog order.
    #[must_use]
    pub fn compute(catalog: &Catalog, model: &ReadModel) -> Self {
        let mut entries: Vec<CatalogEntry> = catalog_entries(catalog, model)
            .into_iter()
            .filter(|entry| entry.record.tasted)
            .collect();
        entries.sort_by(|a, b| b.record.rating.cmp(&a.record.rating));

        let rated: Vec<u32> = entries
            .iter()
            .map(|entry| u32::from(entry.record.rating.value()))
            .filter(|stars| *stars > 0)
            .collect();
        let rated_count = rated.len();
        let average_rating = (rated_count > 0)
            .then(|| f64::from(rated.iter().sum::<u32>()) / as_f64(rated_count));

        Self {
            entries,
            total_count: catalog.len(),
            rated_count,
            average_rating,
        }
    }

    /// Number of stamped items.
    #[must_use]
    pub fn stamped_count(&self) -> usize {
        self.entries.len()
    }

    /// Average rating with one decimal, or `N/A`.
    #[must_use]
    pub fn average_display(&self) -> String {
        self.average_rating
            .map_or_else(|| "N/A".to_owned(), |avg| format!("{avg:.1}"))
    }
}

#[allow(clippy::cast_precision_loss)] // Catalog sizes are tiny
fn as_f64(n: usize) -> f64 {
    n as f64
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    as_f64(numerator) / as_f64(denominator)
}
