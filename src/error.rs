// ⚠️ Error taxonomy for the catalog and the cart
//
// Invalid requests and missing books are signaled distinctly so callers can
// decide how to present them. Storage failures pass through untouched.

use thiserror::Error;

/// Errors raised by catalog queries and book storage operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// `sortBy` named a field other than `title`
    #[error("unsupported sort field: {0}")]
    UnsupportedSortField(String),

    /// `pageSize` or `pageNum` was zero or negative
    #[error("invalid page parameter: {0}")]
    InvalidPage(String),

    /// A create/update payload failed field validation
    #[error("invalid book: {0}")]
    InvalidBook(String),

    /// No book with this identifier exists
    #[error("book {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Errors raised by the cart aggregator
#[derive(Debug, Error)]
pub enum CartError {
    /// AddItem was called with a quantity of zero
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// AddItem was called with a negative unit price
    #[error("book {book_id}: price {price} cannot be negative")]
    InvalidPrice { book_id: i64, price: rust_decimal::Decimal },

    /// ChangeQuantity would leave the line item with a negative quantity
    #[error("book {book_id}: quantity {quantity} cannot change by {delta}")]
    QuantityBelowZero { book_id: i64, quantity: u32, delta: i64 },

    #[error("book {0}: quantity overflow")]
    QuantityOverflow(i64),

    /// The session store rejected the snapshot write
    #[error("failed to persist cart: {0}")]
    Persistence(#[source] anyhow::Error),
}

/// Configuration errors that can occur during loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}
