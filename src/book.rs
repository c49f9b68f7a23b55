// 📚 Book Entity - catalog record plus the create/update payload
//
// The identifier is assigned by storage on insert and never changes.
// Every other field is a value that can be replaced through update_book.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

// ============================================================================
// BOOK
// ============================================================================

/// A stored catalog record
///
/// JSON field names follow the storefront wire format (`bookID`, `isbn`,
/// `pageCount`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "bookID")]
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub classification: String,
    pub category: String,
    pub page_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl Book {
    /// Attach a storage identifier to a validated payload
    pub fn from_new(book_id: i64, new: NewBook) -> Self {
        Book {
            book_id,
            title: new.title,
            author: new.author,
            publisher: new.publisher,
            isbn: new.isbn,
            classification: new.classification,
            category: new.category,
            page_count: new.page_count,
            price: new.price,
        }
    }
}

// ============================================================================
// NEW BOOK (create / update payload)
// ============================================================================

/// Book fields without an identifier
///
/// Deserializes from the JSON API (camelCase) and from CSV seed files
/// (PascalCase headers). A `bookID` in the JSON body is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    #[serde(alias = "Title")]
    pub title: String,

    #[serde(alias = "Author")]
    pub author: String,

    #[serde(alias = "Publisher")]
    pub publisher: String,

    #[serde(alias = "ISBN")]
    pub isbn: String,

    #[serde(alias = "Classification")]
    pub classification: String,

    #[serde(alias = "Category")]
    pub category: String,

    #[serde(alias = "PageCount")]
    pub page_count: i64,

    #[serde(alias = "Price", with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl NewBook {
    /// Reject empty text fields, non-positive page counts and negative prices
    pub fn validate(&self) -> Result<(), CatalogError> {
        let text_fields = [
            ("title", &self.title),
            ("author", &self.author),
            ("publisher", &self.publisher),
            ("isbn", &self.isbn),
            ("classification", &self.classification),
            ("category", &self.category),
        ];

        for (name, value) in text_fields {
            if value.trim().is_empty() {
                return Err(CatalogError::InvalidBook(format!("{} is required", name)));
            }
        }

        if self.page_count < 1 {
            return Err(CatalogError::InvalidBook(format!(
                "pageCount must be positive, got {}",
                self.page_count
            )));
        }

        if self.price < Decimal::ZERO {
            return Err(CatalogError::InvalidBook(format!(
                "price must not be negative, got {}",
                self.price
            )));
        }

        Ok(())
    }
}

// ============================================================================
// PRICE LOOKUP
// ============================================================================

/// Result of a price lookup by identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookPrice {
    #[serde(rename = "bookID")]
    pub book_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

// ============================================================================
// TESTS
// ============================================================================
