//! Catalog business logic - The minimal product operations the ledger depends on.
//!
//! Browsing, search, categories and image upload belong to the storefront, not here.
//! This module only creates products (for seeding), looks them up, and changes the
//! current price, which must never leak into orders that were already placed.

use crate::{
    config::settings::ProductSeed,
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::{debug, info};

/// Retrieves a specific product by its unique ID.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by exact name, active or not.
pub async fn find_product_by_name<C>(db: &C, name: &str) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .filter(product::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new active product.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - The price is negative
/// - The database insert operation fails
pub async fn create_product<C>(db: &C, name: &str, price_cents: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::Config {
            message: "Product name cannot be empty".to_string(),
        });
    }

    if price_cents < 0 {
        return Err(Error::InvalidPrice { cents: price_cents });
    }

    let product = product::ActiveModel {
        name: Set(name.trim().to_string()),
        price_cents: Set(price_cents),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Changes the current catalog price of a product.
///
/// Carts pick the new price up at their next snapshot; existing order lines keep theirs.
pub async fn set_product_price<C>(
    db: &C,
    product_id: i64,
    price_cents: i64,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    if price_cents < 0 {
        return Err(Error::InvalidPrice { cents: price_cents });
    }

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?
        .into();

    product.price_cents = Set(price_cents);
    product.update(db).await.map_err(Into::into)
}

/// Inserts every seed whose name is not in the catalog yet. Returns how many were created.
pub async fn seed_catalog<C>(db: &C, seeds: &[ProductSeed]) -> Result<usize>
where
    C: ConnectionTrait,
{
    let mut created = 0;
    for seed in seeds {
        if find_product_by_name(db, seed.name.trim()).await?.is_some() {
            debug!("Product '{}' already present, skipping", seed.name);
            continue;
        }
        create_product(db, &seed.name, seed.price_cents).await?;
        created += 1;
    }

    if created > 0 {
        info!("Seeded {created} product(s) into the catalog");
    }
    Ok(created)
}
