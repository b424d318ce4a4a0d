//! License key entity - The credential issued for one purchased unit.
//!
//! Rows are written once during checkout and never updated. The UNIQUE constraint on
//! `key_string` is what actually guarantees global uniqueness.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// License key database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "license_keys")]
pub struct Model {
    /// Unique identifier for the license
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order line the key was issued for
    pub line_id: i64,
    /// The key itself, e.g. `9F3A-...-C01D`
    #[sea_orm(unique)]
    pub key_string: String,
    /// Start of the license term
    pub activated_at: DateTimeUtc,
    /// End of the license term
    pub expires_at: DateTimeUtc,
}

/// Defines relationships between `LicenseKey` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each key belongs to one order line
    #[sea_orm(
        belongs_to = "super::order_line::Entity",
        from = "Column::LineId",
        to = "super::order_line::Column::Id"
    )]
    OrderLine,
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
