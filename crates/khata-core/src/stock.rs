//! Inventory stock adjustments
//!
//! Products are matched to line items by name, case-insensitively. Only the
//! first tracked product with a matching name moves; items with no match are
//! services or ad-hoc lines and leave stock alone.

use serde::Serialize;
use tracing::debug;

use crate::models::{LineItem, Product};

/// Which way stock moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    /// Sales and recurring invoices
    Decrement,
    /// Purchases
    Increment,
}

impl StockDirection {
    fn sign(self) -> f64 {
        match self {
            Self::Decrement => -1.0,
            Self::Increment => 1.0,
        }
    }
}

/// Net stock movement for one product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockDelta {
    pub product_id: String,
    pub change: f64,
}

/// Apply a list of items to a product list, returning the updated list
///
/// There is no floor: stock can go negative. Items with a non-finite quantity
/// are ignored.
pub fn apply_stock_delta(
    products: &[Product],
    items: &[LineItem],
    direction: StockDirection,
) -> Vec<Product> {
    let mut updated = products.to_vec();
    for delta in stock_deltas(products, items, direction) {
        if let Some(product) = updated.iter_mut().find(|p| p.id == delta.product_id) {
            product.stock += delta.change;
        }
    }
    updated
}

/// Movements `apply_stock_delta` would make, merged per product in first-touched order
pub fn stock_deltas(
    products: &[Product],
    items: &[LineItem],
    direction: StockDirection,
) -> Vec<StockDelta> {
    let mut deltas: Vec<StockDelta> = Vec::new();

    for item in items {
        if !item.quantity.is_finite() {
            continue;
        }
        let Some(product) = products
            .iter()
            .find(|p| p.matches_description(&item.description))
        else {
            continue;
        };

        let change = direction.sign() * item.quantity;
        debug!("Stock {} {:+} ({})", product.name, change, item.description);

        match deltas.iter_mut().find(|d| d.product_id == product.id) {
            Some(delta) => delta.change += change,
            None => deltas.push(StockDelta {
                product_id: product.id.clone(),
                change,
            }),
        }
    }

    deltas
}

/// Stock classification shown on the dashboard and stock report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    Low,
    Out,
    /// Services and other untracked products
    Untracked,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in stock",
            Self::Low => "low",
            Self::Out => "out of stock",
            Self::Untracked => "untracked",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn stock_status(product: &Product) -> StockStatus {
    if !product.track_stock {
        StockStatus::Untracked
    } else if product.stock <= 0.0 {
        StockStatus::Out
    } else if product.stock <= product.low_stock_threshold {
        StockStatus::Low
    } else {
        StockStatus::InStock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::new_id;

    fn product(name: &str, track_stock: bool, stock: f64) -> Product {
        Product {
            id: new_id(),
            name: name.to_string(),
            hsn: String::new(),
            price: 100.0,
            gst_rate: 18.0,
            track_stock,
            stock,
            low_stock_threshold: 5.0,
        }
    }

    #[test]
    fn test_decrement_by_case_insensitive_name() {
        let products = vec![product("Widget", true, 10.0), product("Gadget", true, 4.0)];
        let items = vec![LineItem::new("wIdGeT", 3.0, 100.0, 18.0)];

        let updated = apply_stock_delta(&products, &items, StockDirection::Decrement);
        assert_eq!(updated[0].stock, 7.0);
        assert_eq!(updated[1].stock, 4.0);
        // Inputs untouched
        assert_eq!(products[0].stock, 10.0);
    }

    #[test]
    fn test_untracked_and_unmatched_are_never_adjusted() {
        let products = vec![product("Consulting", false, 0.0), product("Widget", true, 1.0)];
        let items = vec![
            LineItem::new("Consulting", 5.0, 100.0, 18.0),
            LineItem::new("Widget Pro", 5.0, 100.0, 18.0),
        ];

        let updated = apply_stock_delta(&products, &items, StockDirection::Decrement);
        assert_eq!(updated, products);
    }

    #[test]
    fn test_multiple_items_accumulate_and_go_negative() {
        let products = vec![product("Widget", true, 2.0)];
        let items = vec![
            LineItem::new("Widget", 2.0, 100.0, 18.0),
            LineItem::new("widget", 3.0, 100.0, 18.0),
        ];

        let deltas = stock_deltas(&products, &items, StockDirection::Decrement);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].change, -5.0);

        let updated = apply_stock_delta(&products, &items, StockDirection::Decrement);
        assert_eq!(updated[0].stock, -3.0);
    }

    #[test]
    fn test_increment_and_first_match_wins() {
        let products = vec![product("Widget", true, 1.0), product("WIDGET", true, 1.0)];
        let items = vec![LineItem::new("widget", 4.0, 50.0, 18.0)];

        let updated = apply_stock_delta(&products, &items, StockDirection::Increment);
        assert_eq!(updated[0].stock, 5.0);
        assert_eq!(updated[1].stock, 1.0);
    }

    #[test]
    fn test_unset_quantity_is_ignored() {
        let products = vec![product("Widget", true, 3.0)];
        let items = vec![LineItem::new("Widget", f64::NAN, 50.0, 18.0)];

        let updated = apply_stock_delta(&products, &items, StockDirection::Decrement);
        assert_eq!(updated[0].stock, 3.0);
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(stock_status(&product("A", true, 10.0)), StockStatus::InStock);
        assert_eq!(stock_status(&product("A", true, 5.0)), StockStatus::Low);
        assert_eq!(stock_status(&product("A", true, 0.0)), StockStatus::Out);
        assert_eq!(stock_status(&product("A", true, -2.0)), StockStatus::Out);
        assert_eq!(stock_status(&product("A", false, 0.0)), StockStatus::Untracked);
    }
}
