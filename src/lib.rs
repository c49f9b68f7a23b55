// Bookstore Catalog - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod book;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod session;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use book::{Book, BookPrice, NewBook};
pub use cart::{Cart, CartLineItem, CartOp, CartStore, CartTotals, MemoryStore, CART_KEY};
pub use catalog::{
    distinct_categories, list_books, list_categories, query_books,
    BookPage, BookQuery, SortField, SortOrder,
    DEFAULT_PAGE_NUM, DEFAULT_PAGE_SIZE,
};
pub use config::Config;
pub use db::{
    setup_database, create_book, update_book, delete_book,
    get_all_books, get_book, get_book_price, count_books,
    load_csv, import_books,
};
pub use error::{CartError, CatalogError, ConfigError};
pub use session::{new_session_id, prune_idle_sessions, SqliteSessionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
