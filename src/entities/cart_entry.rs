//! Cart entry entity - One product in one user's cart.
//!
//! The composite primary key `(user_id, product_id)` makes a product appear at most
//! once per cart; adding it again bumps `quantity` instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_entries")]
pub struct Model {
    /// Owner of the cart
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Product in the cart
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: i64,
    /// Number of units, always >= 1
    pub quantity: i32,
    /// When the product first entered the cart; snapshots are read in this order
    pub added_at: DateTimeUtc,
}

/// Defines relationships between `CartEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each entry references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
