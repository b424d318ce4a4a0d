//! User entity - A storefront customer or administrator account.
//!
//! Authentication (login/password, sessions) lives outside this crate; the ledger
//! only needs the identity and display name of whoever owns carts and orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Login (e-mail), unique across the store
    #[sea_orm(unique)]
    pub login: String,
    /// When the account was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many cart entries
    #[sea_orm(has_many = "super::cart_entry::Entity")]
    CartEntries,
    /// One user has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::cart_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartEntries.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// "First Last", as shown in admin listings.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
