//! Product entity - A sellable software title.
//!
//! The `price_cents` column is the *current* catalog price. Checkout copies it into
//! the order line at sale time, so later edits here never touch historical orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name of the product (e.g., "Photo Editor Pro")
    pub name: String,
    /// Current unit price in cents
    pub price_cents: i64,
    /// Inactive products stay referenced by old orders but cannot be added to carts
    pub is_active: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A product appears in many cart entries
    #[sea_orm(has_many = "super::cart_entry::Entity")]
    CartEntries,
    /// A product appears in many order lines
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLines,
}

impl Related<super::cart_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartEntries.def()
    }
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
