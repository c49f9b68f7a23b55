// 🔎 Catalog Query Service - filter, sort and paginate the book collection
//
// query_books is a pure function over an in-memory slice; list_books is the
// storage-backed entry point that performs a single read and delegates.
//
// Order of operations is fixed:
//   1. category filter (membership, order preserving)
//   2. optional stable title sort
//   3. totalCount = len(filtered)
//   4. skip (pageNum - 1) * pageSize, take pageSize

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::book::Book;
use crate::db::get_all_books;
use crate::error::CatalogError;

pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_PAGE_NUM: usize = 1;

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

/// Fields the listing can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
}

impl SortField {
    /// Parse a `sortBy` value (case-insensitive)
    ///
    /// Anything other than `title` is rejected rather than ignored.
    pub fn parse(value: &str) -> Result<Self, CatalogError> {
        if value.trim().eq_ignore_ascii_case("title") {
            Ok(SortField::Title)
        } else {
            Err(CatalogError::UnsupportedSortField(value.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` (any case) is descending; every other value is ascending
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

/// A validated listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub page_size: usize,
    pub page_num: usize,
    pub sort: Option<(SortField, SortOrder)>,
    pub categories: BTreeSet<String>,
}

impl Default for BookQuery {
    fn default() -> Self {
        BookQuery {
            page_size: DEFAULT_PAGE_SIZE,
            page_num: DEFAULT_PAGE_NUM,
            sort: None,
            categories: BTreeSet::new(),
        }
    }
}

impl BookQuery {
    /// Build a query from raw request parameters
    ///
    /// Missing page values fall back to the defaults. Zero or negative page
    /// values are rejected. Only an empty `sortBy` counts as absent, and
    /// `sortOrder` only matters when `sortBy` is present.
    pub fn from_params(
        page_size: Option<i64>,
        page_num: Option<i64>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
        categories: impl IntoIterator<Item = String>,
    ) -> Result<Self, CatalogError> {
        let page_size = positive("pageSize", page_size, DEFAULT_PAGE_SIZE)?;
        let page_num = positive("pageNum", page_num, DEFAULT_PAGE_NUM)?;

        let sort = match sort_by.filter(|s| !s.is_empty()) {
            Some(field) => {
                let field = SortField::parse(field)?;
                let order = sort_order.map(SortOrder::parse).unwrap_or_default();
                Some((field, order))
            }
            None => None,
        };

        Ok(BookQuery {
            page_size,
            page_num,
            sort,
            categories: categories.into_iter().collect(),
        })
    }

    pub fn with_page(mut self, page_num: usize, page_size: usize) -> Self {
        self.page_num = page_num;
        self.page_size = page_size;
        self
    }

    pub fn sorted_by_title(mut self, order: SortOrder) -> Self {
        self.sort = Some((SortField::Title, order));
        self
    }

    pub fn in_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

fn positive(name: &str, value: Option<i64>, default: usize) -> Result<usize, CatalogError> {
    match value {
        None => Ok(default),
        Some(v) if v >= 1 => usize::try_from(v)
            .map_err(|_| CatalogError::InvalidPage(format!("{} is too large: {}", name, v))),
        Some(v) => Err(CatalogError::InvalidPage(format!(
            "{} must be at least 1, got {}",
            name, v
        ))),
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// One page of books plus the filtered, pre-pagination total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total_num_books: usize,
}

impl BookPage {
    /// Number of pages needed to show every filtered book
    pub fn total_pages(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.total_num_books.div_ceil(page_size)
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// Filter, sort and paginate `all_books` according to `query`
///
/// A page past the end yields an empty list; `total_num_books` is still the
/// size of the filtered set.
pub fn query_books(all_books: &[Book], query: &BookQuery) -> Result<BookPage, CatalogError> {
    if query.page_size == 0 || query.page_num == 0 {
        return Err(CatalogError::InvalidPage(format!(
            "pageSize and pageNum must be at least 1, got {} and {}",
            query.page_size, query.page_num
        )));
    }

    let mut filtered: Vec<&Book> = all_books
        .iter()
        .filter(|book| query.categories.is_empty() || query.categories.contains(&book.category))
        .collect();

    // slice::sort_by is stable, so equal titles keep storage order
    if let Some((SortField::Title, order)) = query.sort {
        match order {
            SortOrder::Asc => filtered.sort_by(|a, b| a.title.cmp(&b.title)),
            SortOrder::Desc => filtered.sort_by(|a, b| b.title.cmp(&a.title)),
        }
    }

    let total_num_books = filtered.len();
    let skip = (query.page_num - 1).saturating_mul(query.page_size);

    let books: Vec<Book> = filtered
        .into_iter()
        .skip(skip)
        .take(query.page_size)
        .cloned()
        .collect();

    debug!(
        page_num = query.page_num,
        page_size = query.page_size,
        categories = query.categories.len(),
        sorted = query.sort.is_some(),
        returned = books.len(),
        total = total_num_books,
        "catalog query"
    );

    Ok(BookPage {
        books,
        total_num_books,
    })
}

/// Every distinct category present in the collection, sorted
pub fn distinct_categories(all_books: &[Book]) -> BTreeSet<String> {
    all_books.iter().map(|book| book.category.clone()).collect()
}

// ============================================================================
// STORAGE-BACKED ENTRY POINTS
// ============================================================================

/// Read the catalog once and run the query over it
pub fn list_books(conn: &Connection, query: &BookQuery) -> Result<BookPage, CatalogError> {
    let books = get_all_books(conn)?;
    query_books(&books, query)
}

pub fn list_categories(conn: &Connection) -> Result<BTreeSet<String>, CatalogError> {
    let books = get_all_books(conn)?;
    Ok(distinct_categories(&books))
}

// ============================================================================
// TESTS
// ============================================================================
