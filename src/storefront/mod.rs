//! Storefront layer - The authenticated entry points the web front end calls into.
//!
//! HTTP routing, sessions and templates live outside this crate. Whoever owns the session
//! resolves it into an [`AuthenticatedUser`] and passes it explicitly into every action;
//! nothing here reads ambient request state.

/// Checkout, order history and admin listing actions
pub mod actions;
/// Display formatting for money and orders
pub mod format;

use crate::config::settings::CheckoutSettings;
use sea_orm::DatabaseConnection;

/// Shared data available to all storefront actions.
/// This structure holds the database connection and the checkout settings.
pub struct StorefrontData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Settings applied to every checkout
    pub checkout: CheckoutSettings,
}

impl StorefrontData {
    /// Creates a new `StorefrontData` instance.
    #[must_use]
    pub const fn new(database: DatabaseConnection, checkout: CheckoutSettings) -> Self {
        Self { database, checkout }
    }
}

/// What the session says the caller may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A shopper
    Customer,
    /// Store staff with access to the admin panel
    Admin,
}

/// The caller of an action, as established by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The logged-in user's ID
    pub user_id: i64,
    /// The logged-in user's role
    pub role: Role,
}

impl AuthenticatedUser {
    /// A customer session.
    #[must_use]
    pub const fn customer(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    /// An admin session.
    #[must_use]
    pub const fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Whether the caller may open the admin panel.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

pub use actions::*;
