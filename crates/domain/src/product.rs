use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, Result};

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub sku: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with a freshly minted id.
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::generate(),
            name: name.into(),
            description: String::new(),
            price,
            stock,
            sku: sku.into(),
            category: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = id;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.price.is_negative() {
            return Err(DomainError::Validation(format!(
                "price of {} must not be negative",
                self.sku
            )));
        }
        if self.sku.trim().is_empty() {
            return Err(DomainError::Validation("sku must not be empty".to_string()));
        }
        Ok(())
    }

    /// Applies a partial update and bumps `updated_at`.
    pub fn apply(&mut self, update: &ProductUpdate) -> Result<()> {
        if update.price.is_some_and(|price| price.is_negative()) {
            return Err(DomainError::Validation(format!(
                "price of {} must not be negative",
                self.sku
            )));
        }
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        if let Some(category) = &update.category {
            self.category = category.clone();
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial product update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProductUpdate {
    pub fn price(price: Money) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    pub fn stock(stock: u32) -> Self {
        Self {
            stock: Some(stock),
            ..Self::default()
        }
    }
}
