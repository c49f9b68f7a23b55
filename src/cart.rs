// 🛒 Cart Aggregator - reducer over add/remove/change-quantity/clear
//
// Invariants:
// - at most one line item per book id
// - subtotal == quantity × unit price, recomputed on every mutation
// - unit price and title are snapshotted on first add and never refreshed
// - totals are derived from the line items on every read
//
// The cart is persisted through a CartStore port after every mutation and
// rehydrated from it on construction. A mutation only becomes visible once
// the snapshot write has succeeded.

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::CartError;

/// Storage key under which the cart snapshot is kept
pub const CART_KEY: &str = "cart";

// ============================================================================
// LINE ITEM
// ============================================================================

/// One distinct book in the cart
///
/// Serialized as `{bookID, title, price, quantity, subtotal}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    #[serde(rename = "bookID")]
    book_id: i64,
    title: String,
    #[serde(rename = "price", with = "rust_decimal::serde::float")]
    unit_price: Decimal,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    subtotal: Decimal,
}

impl CartLineItem {
    fn new(book_id: i64, title: String, unit_price: Decimal, quantity: u32) -> Self {
        let mut item = CartLineItem {
            book_id,
            title,
            unit_price,
            quantity,
            subtotal: Decimal::ZERO,
        };
        item.recompute();
        item
    }

    fn recompute(&mut self) {
        self.subtotal = self.unit_price * Decimal::from(self.quantity);
    }

    pub fn book_id(&self) -> i64 {
        self.book_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// A single cart mutation
#[derive(Debug, Clone, PartialEq)]
pub enum CartOp {
    AddItem {
        book_id: i64,
        title: String,
        unit_price: Decimal,
        quantity: u32,
    },
    RemoveItem {
        book_id: i64,
    },
    ChangeQuantity {
        book_id: i64,
        delta: i64,
    },
    Clear,
}

/// Derived totals over all line items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub total_quantity: u64,
}

/// Apply one operation to a list of line items
///
/// Pure: the caller decides whether the result is committed.
fn reduce(items: &mut Vec<CartLineItem>, op: CartOp) -> Result<(), CartError> {
    match op {
        CartOp::AddItem {
            book_id,
            title,
            unit_price,
            quantity,
        } => {
            if quantity == 0 {
                return Err(CartError::InvalidQuantity);
            }
            if unit_price < Decimal::ZERO {
                return Err(CartError::InvalidPrice {
                    book_id,
                    price: unit_price,
                });
            }

            match items.iter_mut().find(|item| item.book_id == book_id) {
                // Existing line keeps its first-add price and title
                Some(item) => {
                    item.quantity = item
                        .quantity
                        .checked_add(quantity)
                        .ok_or(CartError::QuantityOverflow(book_id))?;
                    item.recompute();
                }
                None => items.push(CartLineItem::new(book_id, title, unit_price, quantity)),
            }
        }
        CartOp::RemoveItem { book_id } => {
            items.retain(|item| item.book_id != book_id);
        }
        CartOp::ChangeQuantity { book_id, delta } => {
            if let Some(item) = items.iter_mut().find(|item| item.book_id == book_id) {
                let next = i64::from(item.quantity)
                    .checked_add(delta)
                    .ok_or(CartError::QuantityOverflow(book_id))?;

                if next < 0 {
                    return Err(CartError::QuantityBelowZero {
                        book_id,
                        quantity: item.quantity,
                        delta,
                    });
                }

                item.quantity =
                    u32::try_from(next).map_err(|_| CartError::QuantityOverflow(book_id))?;
                item.recompute();
            }
        }
        CartOp::Clear => items.clear(),
    }

    Ok(())
}

// ============================================================================
// PERSISTENCE PORT
// ============================================================================

/// Key/value string storage scoped to one browsing session
pub trait CartStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store, used in tests and by the CLI
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value.to_string());
        store
    }
}

impl CartStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// CART
// ============================================================================

/// A session cart bound to its persistence store
pub struct Cart<S: CartStore> {
    store: S,
    items: Vec<CartLineItem>,
}

impl<S: CartStore> Cart<S> {
    /// Rehydrate from the store, starting empty when nothing usable is stored
    pub fn restore(store: S) -> Self {
        let items = match store.get(CART_KEY) {
            Ok(Some(snapshot)) => match serde_json::from_str::<Vec<CartLineItem>>(&snapshot) {
                Ok(saved) => normalize(saved),
                Err(e) => {
                    warn!(error = %e, "stored cart is unreadable, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read stored cart, starting empty");
                Vec::new()
            }
        };

        Cart { store, items }
    }

    /// Apply a mutation, persist the new snapshot, then commit it
    ///
    /// On any error the cart is left exactly as it was.
    pub fn apply(&mut self, op: CartOp) -> Result<(), CartError> {
        debug!(?op, "cart mutation");

        let mut next = self.items.clone();
        reduce(&mut next, op)?;

        let snapshot = serde_json::to_string(&next).map_err(|e| CartError::Persistence(e.into()))?;
        self.store
            .set(CART_KEY, &snapshot)
            .map_err(CartError::Persistence)?;

        self.items = next;
        Ok(())
    }

    pub fn add_item(
        &mut self,
        book_id: i64,
        title: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.apply(CartOp::AddItem {
            book_id,
            title: title.into(),
            unit_price,
            quantity,
        })
    }

    pub fn remove_item(&mut self, book_id: i64) -> Result<(), CartError> {
        self.apply(CartOp::RemoveItem { book_id })
    }

    pub fn change_quantity(&mut self, book_id: i64, delta: i64) -> Result<(), CartError> {
        self.apply(CartOp::ChangeQuantity { book_id, delta })
    }

    pub fn clear(&mut self) -> Result<(), CartError> {
        self.apply(CartOp::Clear)
    }

    /// Line items in the order books were first added
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn item(&self, book_id: i64) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.book_id == book_id)
    }

    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartLineItem::subtotal).sum()
    }

    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals {
            total_price: self.total_price(),
            total_quantity: self.total_quantity(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// Recompute subtotals and fold duplicate book ids into the first line
fn normalize(saved: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut items: Vec<CartLineItem> = Vec::with_capacity(saved.len());

    for line in saved {
        match items.iter_mut().find(|item| item.book_id == line.book_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                existing.recompute();
            }
            None => items.push(CartLineItem::new(
                line.book_id,
                line.title,
                line.unit_price,
                line.quantity,
            )),
        }
    }

    items
}

// ============================================================================
// TESTS
// ============================================================================
