//! Storefront actions - What the web layer's checkout, orders and admin pages call.
//!
//! Checkout outcomes are expressed as redirects with a flash message, the way the pages
//! expect them: success goes to the order history with the new order id, failure goes
//! back to the cart with a message the customer can act on.

use crate::{
    core::{
        checkout,
        history::{self, AdminOrderSummary, OrderView},
    },
    errors::{Error, Result},
    storefront::{AuthenticatedUser, StorefrontData},
};
use tracing::{info, instrument, warn};

/// Where the browser goes after pressing "checkout".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutRedirect {
    /// Order history page with a success flash for the new order
    OrderHistory {
        /// The order that was just placed
        order_id: i64,
        /// Success flash text
        message: String,
    },
    /// Back to the cart with an error flash; the cart is unchanged
    Cart {
        /// Error flash text
        message: String,
    },
}

/// Checks out the caller's cart.
///
/// Never fails: every error becomes a redirect back to the cart.
#[instrument(skip(data))]
pub async fn finalize_checkout(
    data: &StorefrontData,
    user: &AuthenticatedUser,
) -> CheckoutRedirect {
    match checkout::finalize_checkout(&data.database, user.user_id, &data.checkout).await {
        Ok(order_id) => {
            info!("Checkout succeeded for user {}: order {order_id}", user.user_id);
            CheckoutRedirect::OrderHistory {
                order_id,
                message: format!("Order #{order_id} placed! Your license keys are ready."),
            }
        }
        Err(e) => {
            warn!("Checkout failed for user {}: {e}", user.user_id);
            CheckoutRedirect::Cart {
                message: e.user_message().to_string(),
            }
        }
    }
}

/// The caller's orders with lines and license keys, most recent first.
#[instrument(skip(data))]
pub async fn order_history(
    data: &StorefrontData,
    user: &AuthenticatedUser,
) -> Result<Vec<OrderView>> {
    history::order_history_for_user(&data.database, user.user_id).await
}

/// Every order in the store. Admins only.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers.
#[instrument(skip(data))]
pub async fn admin_orders(
    data: &StorefrontData,
    user: &AuthenticatedUser,
) -> Result<Vec<AdminOrderSummary>> {
    if !user.is_admin() {
        warn!("User {} tried to open the admin order list", user.user_id);
        return Err(Error::Forbidden);
    }
    history::admin_order_listing(&data.database).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::cart, test_utils::*};

    #[tokio::test]
    async fn test_checkout_success_redirects_to_history() -> Result<()> {
        let (db, user, _product_a, _product_b) = setup_with_cart().await?;
        let data = StorefrontData::new(db, test_settings());
        let session = AuthenticatedUser::customer(user.id);

        let redirect = finalize_checkout(&data, &session).await;
        let CheckoutRedirect::OrderHistory { order_id, message } = redirect else {
            panic!("expected a redirect to the order history, got {redirect:?}");
        };
        assert!(message.contains(&format!("#{order_id}")));

        let orders = order_history(&data, &session).await?;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, order_id);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_cart_redirects_back_to_cart() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "empty@example.com").await?;
        let data = StorefrontData::new(db, test_settings());

        let redirect = finalize_checkout(&data, &AuthenticatedUser::customer(user.id)).await;
        assert_eq!(
            redirect,
            CheckoutRedirect::Cart {
                message: "Your cart is empty".to_string()
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_storage_failure_redirects_back_to_cart() -> Result<()> {
        let (db, user, _product_a, _product_b) = setup_with_cart().await?;
        fail_license_inserts(&db).await?;
        let data = StorefrontData::new(db, test_settings());

        let redirect = finalize_checkout(&data, &AuthenticatedUser::customer(user.id)).await;
        assert_eq!(
            redirect,
            CheckoutRedirect::Cart {
                message: "Could not complete order, try again".to_string()
            }
        );
        assert_eq!(cart::cart_view(&data.database, user.id).await?.items.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_orders_requires_admin() -> Result<()> {
        let (db, user, _product_a, _product_b) = setup_with_cart().await?;
        let data = StorefrontData::new(db, test_settings());
        finalize_checkout(&data, &AuthenticatedUser::customer(user.id)).await;

        let denied = admin_orders(&data, &AuthenticatedUser::customer(user.id)).await;
        assert!(matches!(denied, Err(Error::Forbidden)));

        let listing = admin_orders(&data, &AuthenticatedUser::admin(999)).await?;
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].user_id, user.id);

        Ok(())
    }
}
