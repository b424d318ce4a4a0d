//! Cart business logic - Cart mutations and the point-in-time snapshot used by checkout.
//!
//! A cart is the set of `cart_entries` rows owned by one user. Quantities are always
//! at least one: decreasing a quantity of one is a no-op and removal is explicit.
//! Checkout never reads the cart twice; it takes a [`CartSnapshot`] and works from that.

use crate::{
    entities::{CartEntry, Product, cart_entry, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::{debug, warn};

/// One product in a cart snapshot, priced at the moment the snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Product being bought
    pub product_id: i64,
    /// Catalog price per unit when the snapshot was read
    pub unit_price_cents: i64,
    /// Units in the cart
    pub quantity: i32,
}

impl SnapshotEntry {
    /// `unit_price_cents * quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total_cents(&self) -> Option<i64> {
        self.unit_price_cents.checked_mul(i64::from(self.quantity))
    }
}

/// Immutable copy of a user's cart, the sole input of one checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    user_id: i64,
    entries: Vec<SnapshotEntry>,
}

impl CartSnapshot {
    /// Builds a snapshot from already-read entries.
    #[must_use]
    pub const fn new(user_id: i64, entries: Vec<SnapshotEntry>) -> Self {
        Self { user_id, entries }
    }

    /// Owner of the cart.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Entries in the order the products were first added.
    #[must_use]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// An empty snapshot means an empty cart, not a failure.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of units, i.e. the number of license keys checkout will issue.
    #[must_use]
    pub fn unit_count(&self) -> i64 {
        self.entries.iter().map(|e| i64::from(e.quantity)).sum()
    }

    /// Checks that every entry buys at least one unit.
    ///
    /// # Errors
    /// Returns `InvalidQuantity` for the first entry with a quantity below one.
    pub fn validate(&self) -> Result<()> {
        match self.entries.iter().find(|e| e.quantity < 1) {
            Some(entry) => Err(Error::InvalidQuantity {
                quantity: entry.quantity,
            }),
            None => Ok(()),
        }
    }

    /// Sum of `unit_price * quantity` over all entries, or `None` on overflow.
    #[must_use]
    pub fn total_cents(&self) -> Option<i64> {
        self.entries.iter().try_fold(0_i64, |total, entry| {
            total.checked_add(entry.line_total_cents()?)
        })
    }
}

/// Reads the user's cart joined with current product prices.
///
/// # Errors
/// Returns `ProductNotFound` if an entry references a product row that no longer exists.
/// Checkout must not drain an entry it could not price.
pub async fn read_cart_snapshot<C>(db: &C, user_id: i64) -> Result<CartSnapshot>
where
    C: ConnectionTrait,
{
    let rows = CartEntry::find()
        .filter(cart_entry::Column::UserId.eq(user_id))
        .order_by_asc(cart_entry::Column::AddedAt)
        .order_by_asc(cart_entry::Column::ProductId)
        .find_also_related(Product)
        .all(db)
        .await?;

    let entries = rows
        .into_iter()
        .map(|(entry, product)| match product {
            Some(product) => Ok(SnapshotEntry {
                product_id: entry.product_id,
                unit_price_cents: product.price_cents,
                quantity: entry.quantity,
            }),
            None => {
                warn!(
                    "Cart entry for user {user_id} references missing product {}",
                    entry.product_id
                );
                Err(Error::ProductNotFound {
                    id: entry.product_id,
                })
            }
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Cart snapshot for user {user_id}: {} entries", entries.len());
    Ok(CartSnapshot::new(user_id, entries))
}

/// Removes every cart entry of the user. Returns the number of rows deleted.
pub(crate) async fn drain_cart<C>(db: &C, user_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = CartEntry::delete_many()
        .filter(cart_entry::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Adds one unit of a product to the cart, creating the entry if needed.
///
/// # Errors
/// Returns `ProductNotFound` if the product does not exist or is inactive.
pub async fn add_to_cart<C>(db: &C, user_id: i64, product_id: i64) -> Result<cart_entry::Model>
where
    C: ConnectionTrait,
{
    let product = Product::find_by_id(product_id)
        .one(db)
        .await?
        .filter(|p| p.is_active)
        .ok_or(Error::ProductNotFound { id: product_id })?;

    if CartEntry::find_by_id((user_id, product.id))
        .one(db)
        .await?
        .is_some()
    {
        return change_quantity(db, user_id, product.id, QuantityChange::Increase).await;
    }

    let entry = cart_entry::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product.id),
        quantity: Set(1),
        added_at: Set(chrono::Utc::now()),
    };
    entry.insert(db).await.map_err(Into::into)
}

/// Direction of a quantity change from the cart page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// One more unit
    Increase,
    /// One fewer unit, but never below one
    Decrease,
}

/// Changes the quantity of a cart entry by one unit.
///
/// The update is a single `UPDATE ... SET quantity = quantity +/- 1` so concurrent clicks
/// never lose an increment.
///
/// # Errors
/// Returns `CartItemNotFound` if the product is not in the user's cart.
pub async fn change_quantity<C>(
    db: &C,
    user_id: i64,
    product_id: i64,
    change: QuantityChange,
) -> Result<cart_entry::Model>
where
    C: ConnectionTrait,
{
    let update = CartEntry::update_many()
        .filter(cart_entry::Column::UserId.eq(user_id))
        .filter(cart_entry::Column::ProductId.eq(product_id));

    let update = match change {
        QuantityChange::Increase => update.col_expr(
            cart_entry::Column::Quantity,
            Expr::col(cart_entry::Column::Quantity).add(1),
        ),
        QuantityChange::Decrease => update
            .col_expr(
                cart_entry::Column::Quantity,
                Expr::col(cart_entry::Column::Quantity).sub(1),
            )
            .filter(cart_entry::Column::Quantity.gt(1)),
    };
    update.exec(db).await?;

    CartEntry::find_by_id((user_id, product_id))
        .one(db)
        .await?
        .ok_or(Error::CartItemNotFound {
            user_id,
            product_id,
        })
}

/// Removes a product from the cart entirely.
///
/// # Errors
/// Returns `CartItemNotFound` if the product was not in the cart.
pub async fn remove_from_cart<C>(db: &C, user_id: i64, product_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = CartEntry::delete_many()
        .filter(cart_entry::Column::UserId.eq(user_id))
        .filter(cart_entry::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::CartItemNotFound {
            user_id,
            product_id,
        });
    }
    Ok(())
}

/// One row of the cart page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    /// Product in the cart
    pub product_id: i64,
    /// Product display name
    pub name: String,
    /// Current catalog price per unit
    pub unit_price_cents: i64,
    /// Units in the cart
    pub quantity: i32,
    /// `unit_price_cents * quantity`
    pub line_total_cents: i64,
}

/// The cart page: items at current prices and their total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartView {
    /// Items in the order they were added
    pub items: Vec<CartItemView>,
    /// Sum of all line totals
    pub total_cents: i64,
}

/// Builds the cart page for a user.
pub async fn cart_view<C>(db: &C, user_id: i64) -> Result<CartView>
where
    C: ConnectionTrait,
{
    let rows: Vec<(cart_entry::Model, Option<product::Model>)> = CartEntry::find()
        .filter(cart_entry::Column::UserId.eq(user_id))
        .order_by_asc(cart_entry::Column::AddedAt)
        .order_by_asc(cart_entry::Column::ProductId)
        .find_also_related(Product)
        .all(db)
        .await?;

    let mut view = CartView::default();
    for (entry, product) in rows {
        let Some(product) = product else { continue };
        let line_total_cents = product
            .price_cents
            .saturating_mul(i64::from(entry.quantity));
        view.total_cents = view.total_cents.saturating_add(line_total_cents);
        view.items.push(CartItemView {
            product_id: product.id,
            name: product.name,
            unit_price_cents: product.price_cents,
            quantity: entry.quantity,
            line_total_cents,
        });
    }
    Ok(view)
}
