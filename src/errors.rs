use sea_orm::DbErr;
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("User not found: {id}")]
    UserNotFound { id: i64 },

    #[error("Product not found: {id}")]
    ProductNotFound { id: i64 },

    #[error("Product {product_id} is not in the cart of user {user_id}")]
    CartItemNotFound { user_id: i64, product_id: i64 },

    #[error("Invalid price: {cents} cents")]
    InvalidPrice { cents: i64 },

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i32 },

    #[error("User {user_id} cannot be deleted while {orders} order(s) reference the account")]
    AccountHasOrders { user_id: i64, orders: u64 },

    #[error("Access denied")]
    Forbidden,

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

/// Failures of the checkout unit of work.
///
/// Whatever the variant, nothing from the failed attempt is committed and the cart is
/// left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The cart had nothing in it; rejected before any write.
    #[error("Cart is empty")]
    EmptyCart,

    /// The store rejected a statement, the transaction failed, or the deadline passed.
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// A freshly drawn key already exists. Retried internally with a new key.
    #[error("License key collision on {key}")]
    KeyCollision { key: String },
}

impl CheckoutError {
    /// Whether submitting the same cart again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageFailure(_) | Self::KeyCollision { .. })
    }

    /// Message safe to show the customer.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyCart => "Your cart is empty",
            Self::StorageFailure(_) | Self::KeyCollision { .. } => {
                "Could not complete order, try again"
            }
        }
    }
}

impl From<DbErr> for CheckoutError {
    fn from(value: DbErr) -> Self {
        Self::StorageFailure(value.to_string())
    }
}

impl From<Error> for CheckoutError {
    fn from(value: Error) -> Self {
        match value {
            Error::Checkout(inner) => inner,
            other => Self::StorageFailure(other.to_string()),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
