//! The bundled tasting catalog.
//!
//! The catalog is fixed at build time. Items are never created, mutated or
//! deleted at runtime; every other component treats it as read-only.

use serde::{Deserialize, Serialize};

use crate::types::ItemId;

/// One tasting item served at the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier, also the text encoded in the booth QR code.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Producer.
    pub brewery: String,
    /// Region of origin.
    pub region: String,
    /// Category (e.g. "Junmai Daiginjo").
    pub style: String,
    /// Booth label on the venue map (e.g. "Booth A1").
    pub location: String,
    /// Official flavor profile.
    pub flavor: String,
}

impl CatalogItem {
    /// The booth label without its `Booth ` prefix, as printed on map markers.
    #[must_use]
    pub fn booth_label(&self) -> &str {
        self.location
            .strip_prefix("Booth ")
            .unwrap_or(&self.location)
    }
}

/// Raw catalog row: id, name, brewery, region, style, location, flavor.
type Row = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

const BUNDLED: &[Row] = &[
    (
        "sake-1",
        "Dassai 45",
        "Asahi Shuzo",
        "Yamaguchi",
        "Junmai Daiginjo",
        "Booth A1",
        "Fruity, elegant, clean finish.",
    ),
    (
        "sake-2",
        "Kubota Senju",
        "Asahi Shuzo",
        "Niigata",
        "Ginjo",
        "Booth A2",
        "Light, crisp, and dry with a hint of sweetness.",
    ),
    (
        "sake-3",
        "Hakkaisan",
        "Hakkaisan Brewery",
        "Niigata",
        "Junmai Ginjo",
        "Booth B1",
        "Clean, smooth, subtle aroma. Excellent food pairing.",
    ),
    (
        "sake-4",
        "Wakatake Onikoroshi",
        "Ohmuraya Shuzo",
        "Shizuoka",
        "Junmai",
        "Booth B2",
        "Bold and dry, strong flavor profile, masculine sake.",
    ),
    (
        "sake-5",
        "Tamagawa Ice Breaker",
        "Tamagawa",
        "Kyoto",
        "Junmai Namazake",
        "Booth C1",
        "Unpasteurized and vibrant. Best served chilled or on the rocks.",
    ),
    (
        "sake-6",
        "Tatenokawa 50",
        "Tatenokawa Shuzo",
        "Yamagata",
        "Junmai Daiginjo",
        "Booth C2",
        "Soft, well-rounded, notes of pear and melon.",
    ),
];

/// An ordered, immutable list of catalog items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Build a catalog from items, in display order.
    #[must_use]
    pub const fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// The catalog shipped with the application.
    #[must_use]
    pub fn bundled() -> Self {
        let items = BUNDLED
            .iter()
            .map(
                |&(id, name, brewery, region, style, location, flavor)| CatalogItem {
                    id: ItemId::new(id),
                    name: name.to_owned(),
                    brewery: brewery.to_owned(),
                    region: region.to_owned(),
                    style: style.to_owned(),
                    location: location.to_owned(),
                    flavor: flavor.to_owned(),
                },
            )
            .collect();
        Self::new(items)
    }

    /// All items in display order.
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Look up an item by its exact identifier.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id.as_str() == id)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
