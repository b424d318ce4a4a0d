//! Order line entity - One product's quantity and sale price within an order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order line database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_lines")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order this line belongs to
    pub order_id: i64,
    /// Product sold
    pub product_id: i64,
    /// Unit price in cents at the moment of sale
    pub sale_price_cents: i64,
    /// Lifetime of each license issued for this line
    pub license_term_days: i32,
    /// Units sold; exactly this many license keys reference the line
    pub quantity: i32,
}

/// Defines relationships between `OrderLine` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    /// Each line references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// One line has many license keys
    #[sea_orm(has_many = "super::license_key::Entity")]
    Licenses,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::license_key::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Licenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
