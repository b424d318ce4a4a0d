//! Account business logic - Creating and removing customer accounts.
//!
//! Orders are permanent records, so an account that owns orders cannot be deleted.
//! Deleting an account without orders removes its cart and the user in one transaction.

use crate::{
    entities::{CartEntry, Order, User, cart_entry, order, user},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// Registers a new user.
///
/// # Errors
/// Returns an error if any name part or the login is blank, or the login is already taken
/// (surfaced by the store's UNIQUE constraint).
pub async fn create_user<C>(
    db: &C,
    first_name: &str,
    last_name: &str,
    login: &str,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if first_name.trim().is_empty() || last_name.trim().is_empty() || login.trim().is_empty() {
        return Err(Error::Config {
            message: "First name, last name and login are required".to_string(),
        });
    }

    let user = user::ActiveModel {
        first_name: Set(first_name.trim().to_string()),
        last_name: Set(last_name.trim().to_string()),
        login: Set(login.trim().to_lowercase()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    user.insert(db).await.map_err(Into::into)
}

/// Retrieves a user by ID.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Deletes a user together with their cart.
///
/// # Errors
/// - `UserNotFound` if the user does not exist
/// - `AccountHasOrders` if any order references the user; nothing is changed
#[instrument(skip(db))]
pub async fn delete_account<C>(db: &C, user_id: i64) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    let user = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;

    let orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .count(&txn)
        .await?;
    if orders > 0 {
        warn!("Refusing to delete user {user_id}: {orders} order(s) on record");
        return Err(Error::AccountHasOrders { user_id, orders });
    }

    CartEntry::delete_many()
        .filter(cart_entry::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    user.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted account {user_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{cart, checkout};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_user(&db, "", "Doe", "jane@example.com").await;
        assert!(matches!(result, Err(Error::Config { .. })));

        let user = create_user(&db, "Jane", "Doe", " Jane@Example.com ").await?;
        assert_eq!(user.login, "jane@example.com");
        assert_eq!(user.display_name(), "Jane Doe");

        // Same login again violates the UNIQUE constraint
        let duplicate = create_user(&db, "Other", "Person", "jane@example.com").await;
        assert!(matches!(duplicate, Err(Error::Database(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_account_without_orders() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "leaver@example.com").await?;
        let product = create_test_product(&db, "Game", 2000).await?;
        cart::add_to_cart(&db, user.id, product.id).await?;

        delete_account(&db, user.id).await?;

        assert!(get_user(&db, user.id).await?.is_none());
        let leftover = CartEntry::find()
            .filter(cart_entry::Column::UserId.eq(user.id))
            .count(&db)
            .await?;
        assert_eq!(leftover, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_account_with_orders_changes_nothing() -> Result<()> {
        let (db, user, product_a, _product_b) = setup_with_cart().await?;
        checkout::finalize_checkout(&db, user.id, &test_settings()).await?;

        // Put something back in the cart so we can see it survive
        cart::add_to_cart(&db, user.id, product_a.id).await?;

        let result = delete_account(&db, user.id).await;
        assert!(matches!(
            result,
            Err(Error::AccountHasOrders { orders: 1, .. })
        ));

        assert!(get_user(&db, user.id).await?.is_some());
        let view = cart::cart_view(&db, user.id).await?;
        assert_eq!(view.items.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unknown_account() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_account(&db, 42).await;
        assert!(matches!(result, Err(Error::UserNotFound { id: 42 })));
        Ok(())
    }
}
