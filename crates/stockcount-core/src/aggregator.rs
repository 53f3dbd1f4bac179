//! # Event Aggregator
//!
//! Folds the ordered event log of one session into per-item counts.
//!
//! ## Fold
//! ```text
//! events (append order)                      SessionTally
//! ┌──────────────────────────────┐          ┌────────────────────────────┐
//! │ SCAN_ADD   p1        +1      │          │ p1    qty 3   events 3     │
//! │ SCAN_ADD   p1        +1      │  fold    │ 789   qty 1   events 1     │
//! │ PENDING_UNKNOWN 789  +1      │ ───────► │ p2    qty 0   events 2     │ hidden
//! │ COUNT_SET  p1 (abs 3) +1     │          └────────────────────────────┘
//! │ SCAN_ADD   p2        +1      │
//! │ ADJUST     p2        -1      │          key = product_id, else barcode
//! └──────────────────────────────┘          qty = Σ qty_delta (no clamping)
//! ```
//!
//! The fold is pure: the same events always yield the same tally, and
//! nothing here mutates an event. Products are looked up through a
//! [`ProductResolver`] for display only; an item keyed by a raw barcode
//! keeps that key even after a product with the barcode is created.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::types::{InventoryEvent, Product};

// =============================================================================
// Product Resolution
// =============================================================================

/// Looks up products for display while folding.
pub trait ProductResolver {
    fn by_id(&self, id: &str) -> Option<&Product>;
    fn by_barcode(&self, barcode: &str) -> Option<&Product>;
}

/// Resolver that knows no products. Every item stays unresolved.
pub struct NoProducts;

impl ProductResolver for NoProducts {
    fn by_id(&self, _id: &str) -> Option<&Product> {
        None
    }

    fn by_barcode(&self, _barcode: &str) -> Option<&Product> {
        None
    }
}

/// In-memory product catalog indexed by id and barcode.
#[derive(Debug, Default, Clone)]
pub struct ProductCatalog {
    products: HashMap<String, Product>,
    barcodes: HashMap<String, String>,
}

impl ProductCatalog {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = ProductCatalog::default();
        for product in products {
            catalog.insert(product);
        }
        catalog
    }

    pub fn insert(&mut self, product: Product) {
        if let Some(barcode) = product.barcode.as_ref().filter(|b| !b.is_empty()) {
            self.barcodes.insert(barcode.clone(), product.id.clone());
        }
        self.products.insert(product.id.clone(), product);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductResolver for ProductCatalog {
    fn by_id(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    fn by_barcode(&self, barcode: &str) -> Option<&Product> {
        self.barcodes
            .get(barcode)
            .and_then(|id| self.products.get(id))
    }
}

// =============================================================================
// Tally
// =============================================================================

/// Running count of one item within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CountedItem {
    /// Product id if the events carried one, else the raw barcode.
    pub key: String,
    pub product_id: Option<String>,
    pub barcode: Option<String>,
    /// Display reference, `None` while the barcode is unknown.
    pub product: Option<Product>,
    /// Σ qty_delta. May be zero or negative.
    pub quantity: i64,
    pub event_count: usize,
}

impl CountedItem {
    fn new(key: &str) -> Self {
        CountedItem {
            key: key.to_string(),
            product_id: None,
            barcode: None,
            product: None,
            quantity: 0,
            event_count: 0,
        }
    }

    /// Items at or below zero are hidden from the counting screen.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.quantity > 0
    }

    /// Label for lists and reports.
    pub fn display_name(&self) -> &str {
        self.product
            .as_ref()
            .map(|p| p.name.as_str())
            .or(self.barcode.as_deref())
            .unwrap_or(&self.key)
    }
}

/// Result of folding a session's events.
///
/// Items keep the order in which their key first appeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SessionTally {
    items: Vec<CountedItem>,
    #[serde(skip)]
    #[ts(skip)]
    index: HashMap<String, usize>,
    /// Every folded event, including ones without an item key.
    pub total_scans: usize,
}

// The key index is not serialized; it is rebuilt from the items.
impl<'de> Deserialize<'de> for SessionTally {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Stored {
            items: Vec<CountedItem>,
            #[serde(default)]
            total_scans: usize,
        }

        let stored = Stored::deserialize(deserializer)?;
        let index = stored
            .items
            .iter()
            .enumerate()
            .map(|(slot, item)| (item.key.clone(), slot))
            .collect();

        Ok(SessionTally {
            items: stored.items,
            index,
            total_scans: stored.total_scans,
        })
    }
}

impl SessionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Events without an item key count as scans only.
    pub fn apply(&mut self, event: &InventoryEvent) {
        self.total_scans += 1;

        let Some(key) = event.item_key() else {
            return;
        };

        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.items.push(CountedItem::new(key));
                self.index.insert(key.to_string(), self.items.len() - 1);
                self.items.len() - 1
            }
        };

        let item = &mut self.items[slot];
        item.quantity += event.qty_delta;
        item.event_count += 1;
        if item.product_id.is_none() {
            item.product_id = event.product_id.clone();
        }
        if item.barcode.is_none() {
            item.barcode = event.barcode.clone();
        }
    }

    /// Attaches display products: by product id, else by barcode.
    pub fn resolve(&mut self, resolver: &impl ProductResolver) {
        for item in &mut self.items {
            let by_id = item.product_id.as_deref().and_then(|id| resolver.by_id(id));
            let found = by_id.or_else(|| {
                item.barcode
                    .as_deref()
                    .and_then(|barcode| resolver.by_barcode(barcode))
            });
            item.product = found.cloned();
        }
    }

    /// Full item map, hidden items included.
    pub fn items(&self) -> &[CountedItem] {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&CountedItem> {
        self.index.get(key).map(|&slot| &self.items[slot])
    }

    /// Current quantity of an item, zero if it was never counted.
    pub fn quantity_of(&self, key: &str) -> i64 {
        self.get(key).map(|item| item.quantity).unwrap_or(0)
    }

    /// Items with a positive quantity.
    pub fn visible(&self) -> impl Iterator<Item = &CountedItem> {
        self.items.iter().filter(|item| item.is_visible())
    }

    pub fn visible_item_count(&self) -> usize {
        self.visible().count()
    }

    pub fn visible_quantity(&self) -> i64 {
        self.visible().map(|item| item.quantity).sum()
    }
}

/// Folds `events` in the given order and resolves display products.
pub fn aggregate<'a>(
    events: impl IntoIterator<Item = &'a InventoryEvent>,
    resolver: &impl ProductResolver,
) -> SessionTally {
    let mut tally = SessionTally::new();
    for event in events {
        tally.apply(event);
    }
    tally.resolve(resolver);
    tally
}

// =============================================================================
// Unit Tests
// =============================================================================
