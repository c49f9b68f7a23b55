use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::book::{Book, BookPrice, NewBook};
use crate::error::CatalogError;

pub fn setup_database(conn: &Connection) -> Result<(), CatalogError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Books Table
    // Price is kept as TEXT so decimal values round-trip exactly
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            book_id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            publisher TEXT NOT NULL,
            isbn TEXT NOT NULL,
            classification TEXT NOT NULL,
            category TEXT NOT NULL,
            page_count INTEGER NOT NULL,
            price TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Session Storage (per-session key/value strings, e.g. the cart snapshot)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_storage (
            session_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (session_id, key)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_books_category ON books(category)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_session_storage_updated ON session_storage(updated_at)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// BOOK CRUD
// ============================================================================

const BOOK_COLUMNS: &str =
    "book_id, title, author, publisher, isbn, classification, category, page_count, price";

fn parse_price(idx: usize, text: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let price: String = row.get(8)?;

    Ok(Book {
        book_id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        publisher: row.get(3)?,
        isbn: row.get(4)?,
        classification: row.get(5)?,
        category: row.get(6)?,
        page_count: row.get(7)?,
        price: parse_price(8, &price)?,
    })
}

/// Insert a validated book and return it with its storage-assigned id
pub fn create_book(conn: &Connection, new: &NewBook) -> Result<Book, CatalogError> {
    new.validate()?;

    conn.execute(
        "INSERT INTO books (title, author, publisher, isbn, classification, category, page_count, price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new.title,
            new.author,
            new.publisher,
            new.isbn,
            new.classification,
            new.category,
            new.page_count,
            new.price.to_string(),
        ],
    )?;
    let book = Book::from_new(conn.last_insert_rowid(), new.clone());

    info!(book_id = book.book_id, title = %book.title, "book created");
    Ok(book)
}

/// Replace every value of an existing book; the id is unchanged
pub fn update_book(conn: &Connection, book_id: i64, new: &NewBook) -> Result<Book, CatalogError> {
    new.validate()?;

    let changed = conn.execute(
        "UPDATE books
         SET title = ?1, author = ?2, publisher = ?3, isbn = ?4,
             classification = ?5, category = ?6, page_count = ?7, price = ?8
         WHERE book_id = ?9",
        params![
            new.title,
            new.author,
            new.publisher,
            new.isbn,
            new.classification,
            new.category,
            new.page_count,
            new.price.to_string(),
            book_id,
        ],
    )?;

    if changed == 0 {
        return Err(CatalogError::NotFound(book_id));
    }

    info!(book_id, "book updated");
    Ok(Book::from_new(book_id, new.clone()))
}

pub fn delete_book(conn: &Connection, book_id: i64) -> Result<(), CatalogError> {
    let removed = conn.execute("DELETE FROM books WHERE book_id = ?1", params![book_id])?;

    if removed == 0 {
        return Err(CatalogError::NotFound(book_id));
    }

    info!(book_id, "book deleted");
    Ok(())
}

/// All books in natural storage order (ascending id)
pub fn get_all_books(conn: &Connection) -> Result<Vec<Book>, CatalogError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM books ORDER BY book_id",
        BOOK_COLUMNS
    ))?;

    let books = stmt
        .query_map([], book_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(books)
}

pub fn get_book(conn: &Connection, book_id: i64) -> Result<Book, CatalogError> {
    conn.query_row(
        &format!("SELECT {} FROM books WHERE book_id = ?1", BOOK_COLUMNS),
        params![book_id],
        book_from_row,
    )
    .optional()?
    .ok_or(CatalogError::NotFound(book_id))
}

pub fn get_book_price(conn: &Connection, book_id: i64) -> Result<BookPrice, CatalogError> {
    let price: Option<String> = conn
        .query_row(
            "SELECT price FROM books WHERE book_id = ?1",
            params![book_id],
            |row| row.get(0),
        )
        .optional()?;

    match price {
        Some(text) => Ok(BookPrice {
            book_id,
            price: parse_price(0, &text)?,
        }),
        None => Err(CatalogError::NotFound(book_id)),
    }
}

pub fn count_books(conn: &Connection) -> Result<i64, CatalogError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// Load seed books from a CSV with Title,Author,...,PageCount,Price headers
pub fn load_csv(csv_path: &Path) -> Result<Vec<NewBook>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut books = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let book: NewBook =
            result.with_context(|| format!("Failed to deserialize book on row {}", line + 1))?;
        book.validate()
            .with_context(|| format!("Invalid book on row {}", line + 1))?;
        books.push(book);
    }

    Ok(books)
}

/// Insert every book, stopping at the first failure
pub fn import_books(conn: &Connection, books: &[NewBook]) -> Result<usize> {
    let mut inserted = 0;

    for book in books {
        create_book(conn, book).with_context(|| format!("Failed to import '{}'", book.title))?;
        inserted += 1;
    }

    info!(inserted, "books imported");
    Ok(inserted)
}
