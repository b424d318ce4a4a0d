//! Shared test utilities for the storefront ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::settings::CheckoutSettings,
    core::{account, cart, catalog},
    entities::{self, order, order_line},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set};
use std::path::{Path, PathBuf};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in the temp dir, for tests that need more than
/// one connection. Returns the connection and the file path for [`remove_file_test_db`].
pub async fn setup_file_test_db(name: &str) -> Result<(DatabaseConnection, PathBuf)> {
    let path = std::env::temp_dir().join(format!(
        "storefront-ledger-{name}-{}.sqlite",
        std::process::id()
    ));
    remove_file_test_db(&path);

    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = sea_orm::Database::connect(url).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, path))
}

/// Deletes a database created by [`setup_file_test_db`], with its journal files.
pub fn remove_file_test_db(path: &Path) {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        std::fs::remove_file(file).ok();
    }
}

/// Default checkout settings with a generous deadline for slow CI machines.
pub fn test_settings() -> CheckoutSettings {
    CheckoutSettings {
        timeout_secs: 30,
        ..CheckoutSettings::default()
    }
}

/// Creates a test user named "Test User" with the given login.
pub async fn create_test_user(db: &DatabaseConnection, login: &str) -> Result<entities::user::Model> {
    account::create_user(db, "Test", "User", login).await
}

/// Creates an active test product.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price_cents: i64,
) -> Result<entities::product::Model> {
    catalog::create_product(db, name, price_cents).await
}

/// Puts `quantity` units of a product into the user's cart, one add at a time.
pub async fn add_units(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    quantity: u32,
) -> Result<()> {
    for _ in 0..quantity {
        cart::add_to_cart(db, user_id, product_id).await?;
    }
    Ok(())
}

/// Sets up a user whose cart holds 2 × product A at 100.00 and 1 × product B at 50.00.
/// Returns (db, user, `product_a`, `product_b`).
pub async fn setup_with_cart() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::product::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "buyer@example.com").await?;
    let product_a = create_test_product(&db, "Product A", 10_000).await?;
    let product_b = create_test_product(&db, "Product B", 5_000).await?;
    add_units(&db, user.id, product_a.id, 2).await?;
    add_units(&db, user.id, product_b.id, 1).await?;
    Ok((db, user, product_a, product_b))
}

/// Sets up an order with a single line and no keys yet, for license issuance tests.
/// Returns (db, `line_id`).
pub async fn setup_with_order_line() -> Result<(DatabaseConnection, i64)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "licensee@example.com").await?;
    let product = create_test_product(&db, "Licensed Tool", 1_000).await?;

    let order = order::ActiveModel {
        user_id: Set(user.id),
        placed_at: Set(chrono::Utc::now()),
        status: Set(order::STATUS_PAID.to_string()),
        total_cents: Set(1_000),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    let line = order_line::ActiveModel {
        order_id: Set(order.id),
        product_id: Set(product.id),
        sale_price_cents: Set(1_000),
        license_term_days: Set(30),
        quantity: Set(1),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    Ok((db, line.id))
}

/// Installs a trigger that makes every license insert fail, simulating a storage fault
/// after the order and its lines were written.
pub async fn fail_license_inserts(db: &DatabaseConnection) -> Result<()> {
    db.execute_unprepared(
        "CREATE TRIGGER fail_license_inserts BEFORE INSERT ON license_keys \
         BEGIN SELECT RAISE(ABORT, 'simulated storage failure'); END;",
    )
    .await?;
    Ok(())
}

/// Removes the trigger installed by [`fail_license_inserts`].
pub async fn allow_license_inserts(db: &DatabaseConnection) -> Result<()> {
    db.execute_unprepared("DROP TRIGGER IF EXISTS fail_license_inserts;")
        .await?;
    Ok(())
}
