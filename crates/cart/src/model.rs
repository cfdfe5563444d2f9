//! Cart value types.

use chrono::{DateTime, Utc};
use common::{Money, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::{CartError, Result};

/// A line in a shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Catalog price captured when the item was added.
    pub unit_price: Money,
    pub name: String,
}

impl CartItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        quantity: u32,
        unit_price: Money,
        name: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
            name: name.into(),
        }
    }

    /// Returns quantity * unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A user's shopping cart.
///
/// `total` is derived from the items and recomputed by every mutating
/// method; there is no way to set it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
    total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn empty(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            items: Vec::new(),
            total: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the item for a product, if present.
    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Merges an item into the cart.
    ///
    /// If the product is already present its quantity is increased; the
    /// stored unit price and name are left as first added. A merge whose
    /// quantity or total would overflow is rejected and leaves the cart
    /// untouched.
    pub fn add_item(&mut self, item: CartItem) -> Result<()> {
        let position = self
            .items
            .iter()
            .position(|i| i.product_id == item.product_id);
        let merged = match position {
            Some(idx) => {
                let existing = &self.items[idx];
                let quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| CartError::InvalidQuantity {
                        product_id: item.product_id.clone(),
                    })?;
                CartItem {
                    quantity,
                    ..existing.clone()
                }
            }
            None => item,
        };

        let others = self
            .items
            .iter()
            .filter(|i| i.product_id != merged.product_id);
        if checked_total(others.chain(std::iter::once(&merged))).is_none() {
            return Err(CartError::InvalidQuantity {
                product_id: merged.product_id,
            });
        }

        match position {
            Some(idx) => self.items[idx] = merged,
            None => self.items.push(merged),
        }
        self.touch();
        Ok(())
    }

    /// Removes every line for a product. Removing an absent product still
    /// counts as a mutation.
    pub fn remove_item(&mut self, product_id: &ProductId) {
        self.items.retain(|i| &i.product_id != product_id);
        self.touch();
    }

    /// Marks the cart as modified now and recomputes the total.
    pub(crate) fn touch(&mut self) {
        self.total = self.items.iter().map(CartItem::line_total).sum();
        self.updated_at = Utc::now();
    }
}

fn checked_total<'a>(mut items: impl Iterator<Item = &'a CartItem>) -> Option<Money> {
    items.try_fold(Money::zero(), |acc, item| {
        acc.checked_add(item.unit_price.checked_multiply(item.quantity)?)
    })
}

/// A cart as it was right after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub cart: Cart,
    pub captured_at: DateTime<Utc>,
}
