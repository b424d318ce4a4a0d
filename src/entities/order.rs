//! Order entity - One finalized checkout.
//!
//! `total_cents` is fixed when the order is written and equals the sum of its lines'
//! `sale_price_cents * quantity`. It is never recomputed from the catalog.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status written for every finalized order; there is no payment gateway.
pub const STATUS_PAID: &str = "paid";

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer who placed the order
    pub user_id: i64,
    /// When the order was placed
    pub placed_at: DateTimeUtc,
    /// Order status, `"paid"` on creation
    pub status: String,
    /// Order total in cents
    pub total_cents: i64,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One order has many lines
    #[sea_orm(has_many = "super::order_line::Entity")]
    Lines,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
