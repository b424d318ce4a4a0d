//! Checkout business logic - Turning a cart into an order, order lines and license keys.
//!
//! One checkout is one database transaction:
//!
//! 1. snapshot the cart (inside the transaction, so a second submit waits or sees an empty cart)
//! 2. insert the order with the snapshot total and status `"paid"`
//! 3. insert one order line per snapshot entry, copying the unit price at sale time
//! 4. issue one license key per purchased unit
//! 5. drain the cart
//! 6. commit
//!
//! Any failure rolls the transaction back, leaving the cart exactly as it was. The whole
//! unit of work runs under a deadline taken from [`CheckoutSettings`].

use crate::{
    config::settings::CheckoutSettings,
    core::{
        cart::{self, CartSnapshot},
        license::{self, KeySource, RandomKeySource},
    },
    entities::{license_key, order, order_line},
    errors::CheckoutError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseBackend, DatabaseTransaction, DbErr,
    IsolationLevel, Set, TransactionTrait,
};
use std::{future::Future, time::Duration};
use tracing::{debug, error, info, instrument};

/// An order as written by a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    /// The order row
    pub order: order::Model,
    /// Lines in snapshot order, each with its keys
    pub lines: Vec<PlacedLine>,
}

/// One order line and the keys issued for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    /// The order line row
    pub line: order_line::Model,
    /// Exactly `line.quantity` keys
    pub licenses: Vec<license_key::Model>,
}

/// Checks out the user's cart and returns the new order ID.
///
/// # Errors
/// - `EmptyCart` if there is nothing to buy; nothing is written
/// - `StorageFailure` if any statement fails, key draws are exhausted or the deadline passes;
///   the transaction is rolled back and the cart is untouched
pub async fn finalize_checkout<C>(
    db: &C,
    user_id: i64,
    settings: &CheckoutSettings,
) -> Result<i64, CheckoutError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let placed = finalize_checkout_with_keys(db, user_id, settings, &mut RandomKeySource).await?;
    Ok(placed.order.id)
}

/// Same as [`finalize_checkout`] with an explicit key source, returning everything written.
#[instrument(skip(db, settings, keys))]
pub async fn finalize_checkout_with_keys<C, K>(
    db: &C,
    user_id: i64,
    settings: &CheckoutSettings,
    keys: &mut K,
) -> Result<PlacedOrder, CheckoutError>
where
    C: ConnectionTrait + TransactionTrait,
    K: KeySource + ?Sized,
{
    info!("Starting checkout for user {user_id}");

    with_deadline(settings.timeout(), run_checkout(db, user_id, settings, keys))
        .await
        .inspect(|placed| {
            info!(
                "Order {} placed for user {user_id}: total {} cents, {} line(s)",
                placed.order.id,
                placed.order.total_cents,
                placed.lines.len()
            );
        })
        .inspect_err(|e| match e {
            CheckoutError::EmptyCart => debug!("Checkout for user {user_id} rejected: empty cart"),
            other => error!("Checkout for user {user_id} failed: {other}"),
        })
}

async fn run_checkout<C, K>(
    db: &C,
    user_id: i64,
    settings: &CheckoutSettings,
    keys: &mut K,
) -> Result<PlacedOrder, CheckoutError>
where
    C: ConnectionTrait + TransactionTrait,
    K: KeySource + ?Sized,
{
    let txn = begin_checkout_transaction(db).await?;

    let snapshot = match cart::read_cart_snapshot(&txn, user_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => return Err(abort(txn, e.into()).await),
    };

    match record_order(&txn, &snapshot, settings, keys).await {
        Ok(placed) => {
            txn.commit().await?;
            Ok(placed)
        }
        Err(e) => Err(abort(txn, e).await),
    }
}

/// Rolls back `txn` and hands back the error that caused the abort. A failed rollback is
/// logged and otherwise ignored; the connection discards the transaction either way.
async fn abort(txn: DatabaseTransaction, cause: CheckoutError) -> CheckoutError {
    if let Err(rollback_err) = txn.rollback().await {
        error!("Rollback after checkout failure ({cause}) also failed: {rollback_err}");
    }
    cause
}

/// Opens the checkout transaction with the strongest isolation the backend offers.
///
/// `SQLite` does not take an isolation level; its transactions are serializable because
/// there is only ever one writer.
async fn begin_checkout_transaction<C>(db: &C) -> Result<DatabaseTransaction, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    match db.get_database_backend() {
        DatabaseBackend::Sqlite => db.begin().await,
        _ => {
            db.begin_with_config(Some(IsolationLevel::Serializable), None)
                .await
        }
    }
}

/// Writes the order, its lines and its keys for `snapshot`, then drains the cart.
///
/// Must run inside a transaction; the caller commits or rolls back. The order total is
/// computed from the snapshot alone, so `total == Σ sale_price × quantity` holds for the
/// lines written here by construction.
///
/// # Errors
/// `EmptyCart` before any write if the snapshot is empty; `StorageFailure` otherwise.
pub async fn record_order<C, K>(
    db: &C,
    snapshot: &CartSnapshot,
    settings: &CheckoutSettings,
    keys: &mut K,
) -> Result<PlacedOrder, CheckoutError>
where
    C: ConnectionTrait + TransactionTrait,
    K: KeySource + ?Sized,
{
    if snapshot.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    snapshot.validate()?;

    let total_cents = snapshot
        .total_cents()
        .ok_or_else(|| CheckoutError::StorageFailure("order total overflows".to_string()))?;
    let term_days = settings.license_term_days;
    let stored_term_days = i32::try_from(term_days).map_err(|_| {
        CheckoutError::StorageFailure(format!("license term of {term_days} days is too long"))
    })?;
    let placed_at = Utc::now();

    debug!(
        "Recording order for user {}: {} entries, {} units, total {total_cents} cents",
        snapshot.user_id(),
        snapshot.entries().len(),
        snapshot.unit_count()
    );

    let order = order::ActiveModel {
        user_id: Set(snapshot.user_id()),
        placed_at: Set(placed_at),
        status: Set(order::STATUS_PAID.to_string()),
        total_cents: Set(total_cents),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut lines = Vec::with_capacity(snapshot.entries().len());
    for entry in snapshot.entries() {
        let line = order_line::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(entry.product_id),
            sale_price_cents: Set(entry.unit_price_cents),
            license_term_days: Set(stored_term_days),
            quantity: Set(entry.quantity),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let mut licenses = Vec::new();
        for _ in 0..entry.quantity {
            let license = license::issue_license(
                db,
                line.id,
                placed_at,
                term_days,
                &mut *keys,
                settings.key_attempts(),
            )
            .await?;
            licenses.push(license);
        }

        lines.push(PlacedLine { line, licenses });
    }

    let drained = cart::drain_cart(db, snapshot.user_id()).await?;
    debug!("Drained {drained} cart entries for user {}", snapshot.user_id());

    Ok(PlacedOrder { order, lines })
}

/// Runs `work` under a deadline. Expiry is a storage failure; dropping the unfinished
/// future drops its transaction, which rolls back.
pub(crate) async fn with_deadline<F, T>(limit: Duration, work: F) -> Result<T, CheckoutError>
where
    F: Future<Output = Result<T, CheckoutError>>,
{
    tokio::time::timeout(limit, work).await.map_err(|_| {
        CheckoutError::StorageFailure(format!("checkout timed out after {limit:?}"))
    })?
}
