//! Database configuration module for the storefront ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema (including foreign keys from `belongs_to` relations and the UNIQUE
//! constraint on license keys) always matches the Rust structs.

use crate::entities::{CartEntry, LicenseKey, Order, OrderLine, Product, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::debug;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back to
/// a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {database_url}");

    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables that do not exist yet.
///
/// Parents are created before children so the foreign keys resolve.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    create_table(db, User).await?;
    create_table(db, Product).await?;
    create_table(db, CartEntry).await?;
    create_table(db, Order).await?;
    create_table(db, OrderLine).await?;
    create_table(db, LicenseKey).await?;

    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;

    Ok(())
}
