// 🌐 Bookstore REST API - axum router over the catalog and session carts
//
// Routes mirror the storefront client:
//   /Book/AllBooks, /Book/GetBookCategories, /Book/GetBook/:id,
//   /Book/GetBookPrice/:id, /Book/AddBook, /Book/UpdateBook/:id,
//   /Book/DeleteBook/:id
// plus server-side session carts under /Cart.

use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post, put},
    Router,
};
use chrono::Duration;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::book::{Book, BookPrice, NewBook};
use crate::cart::{Cart, CartLineItem};
use crate::catalog::{list_books, list_categories, BookPage, BookQuery};
use crate::db::{create_book, delete_book, get_book, get_book_price, update_book};
use crate::error::{CartError, CatalogError};
use crate::session::{new_session_id, prune_idle_sessions, SqliteSessionStore};

const DEFAULT_SESSION_IDLE_HOURS: i64 = 24;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    default_page_size: usize,
    session_idle: Duration,
}

impl AppState {
    pub fn new(conn: Connection, default_page_size: usize) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            default_page_size,
            session_idle: Duration::hours(DEFAULT_SESSION_IDLE_HOURS),
        }
    }

    /// Session carts untouched for this long are discarded when new sessions start
    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.session_idle = idle;
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Catalog(
                CatalogError::UnsupportedSortField(_)
                | CatalogError::InvalidPage(_)
                | CatalogError::InvalidBook(_),
            ) => StatusCode::BAD_REQUEST,
            AppError::Cart(
                CartError::InvalidQuantity
                | CartError::InvalidPrice { .. }
                | CartError::QuantityBelowZero { .. }
                | CartError::QuantityOverflow(_),
            ) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Catalog(CatalogError::Database(_))
            | AppError::Cart(CartError::Persistence(_))
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

// ============================================================================
// Request / Response types
// ============================================================================

/// Listing parameters parsed from the raw query string
///
/// `bookTypes` may repeat; every occurrence is one category.
#[derive(Debug, Default, PartialEq)]
struct ListParams {
    page_size: Option<i64>,
    page_num: Option<i64>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    book_types: Vec<String>,
}

fn decode_component(raw: &str) -> Result<String, AppError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| AppError::BadRequest(format!("malformed query string: {}", e)))
}

fn parse_int(name: &str, value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be an integer, got '{}'", name, value)))
}

impl ListParams {
    fn parse(query: Option<&str>) -> Result<Self, AppError> {
        let mut params = ListParams::default();

        for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key)?;
            let value = decode_component(value)?;

            match key.as_str() {
                "pageSize" => params.page_size = Some(parse_int("pageSize", &value)?),
                "pageNum" => params.page_num = Some(parse_int("pageNum", &value)?),
                "sortBy" => params.sort_by = Some(value),
                "sortOrder" => params.sort_order = Some(value),
                "bookTypes" => params.book_types.push(value),
                _ => {}
            }
        }

        Ok(params)
    }

    fn into_query(self, default_page_size: usize) -> Result<BookQuery, CatalogError> {
        let page_size = self
            .page_size
            .unwrap_or_else(|| i64::try_from(default_page_size).unwrap_or(i64::MAX));

        BookQuery::from_params(
            Some(page_size),
            self.page_num,
            self.sort_by.as_deref(),
            self.sort_order.as_deref(),
            self.book_types,
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartResponse {
    session_id: String,
    items: Vec<CartLineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    total_price: Decimal,
    total_quantity: u64,
}

impl CartResponse {
    fn from_cart(cart: &Cart<SqliteSessionStore<'_>>) -> Self {
        Self {
            session_id: cart.store().session_id().to_string(),
            items: cart.items().to_vec(),
            total_price: cart.total_price(),
            total_quantity: cart.total_quantity(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    #[serde(rename = "bookID")]
    book_id: i64,
    title: String,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct ChangeQuantityRequest {
    delta: i64,
}

// ============================================================================
// Catalog Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /Book/AllBooks - filtered, sorted, paginated listing
async fn all_books(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<BookPage>, AppError> {
    let query = ListParams::parse(query.as_deref())?.into_query(state.default_page_size)?;
    let conn = state.conn()?;

    Ok(Json(list_books(&conn, &query)?))
}

/// GET /Book/GetBookCategories - distinct categories
async fn book_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let conn = state.conn()?;
    let categories = list_categories(&conn)?;

    Ok(Json(categories.into_iter().collect()))
}

/// GET /Book/GetBook/:id
async fn book_by_id(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    let conn = state.conn()?;
    Ok(Json(get_book(&conn, book_id)?))
}

/// GET /Book/GetBookPrice/:id
async fn book_price(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<Json<BookPrice>, AppError> {
    let conn = state.conn()?;
    Ok(Json(get_book_price(&conn, book_id)?))
}

/// POST /Book/AddBook - returns the created record
async fn add_book(
    State(state): State<AppState>,
    Json(new): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let conn = state.conn()?;
    let book = create_book(&conn, &new)?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /Book/UpdateBook/:id - returns the updated record
async fn update_book_handler(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Json(new): Json<NewBook>,
) -> Result<Json<Book>, AppError> {
    let conn = state.conn()?;
    Ok(Json(update_book(&conn, book_id, &new)?))
}

/// DELETE /Book/DeleteBook/:id
async fn delete_book_handler(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let conn = state.conn()?;
    delete_book(&conn, book_id)?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Cart Handlers
// ============================================================================

/// POST /Cart - start a new session cart, discarding idle ones
async fn new_cart(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let conn = state.conn()?;
    prune_idle_sessions(&conn, state.session_idle)
        .map_err(|e| AppError::Internal(format!("{:#}", e)))?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: new_session_id(),
        }),
    ))
}

/// DELETE /Cart/:session - end the session and destroy its cart
async fn end_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let conn = state.conn()?;
    SqliteSessionStore::new(&conn, session_id)
        .end_session()
        .map_err(|e| AppError::Internal(format!("{:#}", e)))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /Cart/:session
async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CartResponse>, AppError> {
    let conn = state.conn()?;
    let cart = Cart::restore(SqliteSessionStore::new(&conn, session_id));

    Ok(Json(CartResponse::from_cart(&cart)))
}

/// POST /Cart/:session/AddItem
async fn add_cart_item(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, AppError> {
    let conn = state.conn()?;
    let mut cart = Cart::restore(SqliteSessionStore::new(&conn, session_id));
    cart.add_item(req.book_id, req.title, req.price, req.quantity)?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

/// DELETE /Cart/:session/RemoveItem/:book_id
async fn remove_cart_item(
    State(state): State<AppState>,
    Path((session_id, book_id)): Path<(String, i64)>,
) -> Result<Json<CartResponse>, AppError> {
    let conn = state.conn()?;
    let mut cart = Cart::restore(SqliteSessionStore::new(&conn, session_id));
    cart.remove_item(book_id)?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

/// PATCH /Cart/:session/ChangeQuantity/:book_id
async fn change_cart_quantity(
    State(state): State<AppState>,
    Path((session_id, book_id)): Path<(String, i64)>,
    Json(req): Json<ChangeQuantityRequest>,
) -> Result<Json<CartResponse>, AppError> {
    let conn = state.conn()?;
    let mut cart = Cart::restore(SqliteSessionStore::new(&conn, session_id));
    cart.change_quantity(book_id, req.delta)?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

/// DELETE /Cart/:session/Clear
async fn clear_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CartResponse>, AppError> {
    let conn = state.conn()?;
    let mut cart = Cart::restore(SqliteSessionStore::new(&conn, session_id));
    cart.clear()?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

// ============================================================================
// Router
// ============================================================================

/// Build the full application router
///
/// `cors_origin` of `*` allows any origin.
pub fn router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin {
        "*" => CorsLayer::new().allow_origin(Any),
        origin => match HeaderValue::from_str(origin) {
            Ok(value) => CorsLayer::new().allow_origin(value),
            Err(_) => {
                warn!(origin, "invalid CORS origin, cross-origin requests disabled");
                CorsLayer::new()
            }
        },
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let book_routes = Router::new()
        .route("/AllBooks", get(all_books))
        .route("/GetBookCategories", get(book_categories))
        .route("/GetBook/:id", get(book_by_id))
        .route("/GetBookPrice/:id", get(book_price))
        .route("/AddBook", post(add_book))
        .route("/UpdateBook/:id", put(update_book_handler))
        .route("/DeleteBook/:id", delete(delete_book_handler));

    let cart_routes = Router::new()
        .route("/", post(new_cart))
        .route("/:session", get(get_cart).delete(end_cart))
        .route("/:session/AddItem", post(add_cart_item))
        .route("/:session/RemoveItem/:book_id", delete(remove_cart_item))
        .route("/:session/ChangeQuantity/:book_id", patch(change_cart_quantity))
        .route("/:session/Clear", delete(clear_cart));

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/Book", book_routes)
        .nest("/Cart", cart_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_repeated_book_types() {
        let params =
            ListParams::parse(Some("pageSize=2&pageNum=3&bookTypes=Fiction&bookTypes=Self%20Help"))
                .unwrap();

        assert_eq!(params.page_size, Some(2));
        assert_eq!(params.page_num, Some(3));
        assert_eq!(params.book_types, vec!["Fiction", "Self Help"]);
    }

    #[test]
    fn test_list_params_plus_is_space() {
        let params = ListParams::parse(Some("bookTypes=Self+Help&sortBy=title&sortOrder=desc")).unwrap();

        assert_eq!(params.book_types, vec!["Self Help"]);
        assert_eq!(params.sort_by.as_deref(), Some("title"));
        assert_eq!(params.sort_order.as_deref(), Some("desc"));
    }

    #[test]
    fn test_list_params_empty_query() {
        assert_eq!(ListParams::parse(None).unwrap(), ListParams::default());
    }

    #[test]
    fn test_list_params_non_numeric_page_rejected() {
        assert!(matches!(
            ListParams::parse(Some("pageNum=two")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_default_page_size_applied() {
        let query = ListParams::default().into_query(10).unwrap();
        assert_eq!(query.page_size, 10);
        assert_eq!(query.page_num, 1);
    }
}
