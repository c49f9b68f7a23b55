// API integration tests: drive the axum router end to end over an
// in-memory catalog.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use bookstore_catalog::api::{router, AppState};
use bookstore_catalog::{create_book, setup_database, NewBook};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

/// 12 books, 3 in "Fiction" (inserted 2nd, 6th and 11th)
fn seeded_app() -> Router {
    seeded_app_with(Connection::open_in_memory().unwrap())
}

fn seeded_app_with(conn: Connection) -> Router {
    setup_database(&conn).unwrap();

    let books = [
        ("Team of Rivals", "Biography"),
        ("Les Miserables", "Fiction"),
        ("The Power of Habit", "Self-Help"),
        ("Gone Girl", "Thrillers"),
        ("Alexander Hamilton", "Biography"),
        ("The Great Gatsby", "Fiction"),
        ("Salt Fat Acid Heat", "Health"),
        ("Good to Great", "Business"),
        ("Atomic Habits", "Self-Help"),
        ("The Girl on the Train", "Thrillers"),
        ("Anna Karenina", "Fiction"),
        ("How Not to Die", "Health"),
    ];

    for (i, (title, category)) in books.iter().enumerate() {
        create_book(
            &conn,
            &NewBook {
                title: title.to_string(),
                author: "Author".to_string(),
                publisher: "Publisher".to_string(),
                isbn: format!("978-{:010}", i),
                classification: "Fiction".to_string(),
                category: category.to_string(),
                page_count: 200,
                price: Decimal::new(1000 + i as i64, 2),
            },
        )
        .unwrap();
    }

    router(AppState::new(conn, 5), "*")
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

fn titles(body: &Value) -> Vec<String> {
    body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_all_books_defaults_to_first_page_of_five() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/Book/AllBooks", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalNumBooks"], 12);
    assert_eq!(body["books"].as_array().unwrap().len(), 5);
    assert_eq!(body["books"][0]["bookID"], 1);
}

#[tokio::test]
async fn test_fiction_filter_second_page() {
    let app = seeded_app();

    let (status, body) = send(
        &app,
        "GET",
        "/Book/AllBooks?pageSize=2&pageNum=2&bookTypes=Fiction",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalNumBooks"], 3);
    assert_eq!(titles(&body), vec!["Anna Karenina"]);
}

#[tokio::test]
async fn test_multiple_categories_and_sorting() {
    let app = seeded_app();

    let (_, body) = send(
        &app,
        "GET",
        "/Book/AllBooks?pageSize=10&bookTypes=Fiction&bookTypes=Health&sortBy=Title&sortOrder=DESC",
        None,
    )
    .await;

    assert_eq!(body["totalNumBooks"], 5);
    assert_eq!(
        titles(&body),
        vec![
            "The Great Gatsby",
            "Salt Fat Acid Heat",
            "Les Miserables",
            "How Not to Die",
            "Anna Karenina",
        ]
    );
}

#[tokio::test]
async fn test_page_out_of_range_is_empty() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/Book/AllBooks?pageSize=5&pageNum=99", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalNumBooks"], 12);
    assert!(body["books"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_sort_field_is_bad_request() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/Book/AllBooks?sortBy=price", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("price"));
}

#[tokio::test]
async fn test_non_positive_page_is_bad_request() {
    let app = seeded_app();

    let (status, _) = send(&app, "GET", "/Book/AllBooks?pageSize=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_categories_are_distinct_and_sorted() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/Book/GetBookCategories", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!(["Biography", "Business", "Fiction", "Health", "Self-Help", "Thrillers"])
    );
}

#[tokio::test]
async fn test_price_lookup() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/Book/GetBookPrice/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookID"], 3);
    assert!((body["price"].as_f64().unwrap() - 10.02).abs() < 1e-9);

    let (status, _) = send(&app, "GET", "/Book/GetBookPrice/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_single_book() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/Book/GetBook/6", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookID"], 6);
    assert_eq!(body["title"], "The Great Gatsby");
    assert_eq!(body["category"], "Fiction");

    let (status, _) = send(&app, "GET", "/Book/GetBook/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_book_crud_round_trip() {
    let app = seeded_app();
    let payload = json!({
        "bookID": 0,
        "title": "Middlemarch",
        "author": "George Eliot",
        "publisher": "Penguin",
        "isbn": "978-0141439549",
        "classification": "Fiction",
        "category": "Classic",
        "pageCount": 880,
        "price": 12.5
    });

    let (status, created) = send(&app, "POST", "/Book/AddBook", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["bookID"], 13);
    assert_eq!(created["title"], "Middlemarch");

    let mut changes = payload;
    changes["price"] = json!(9.99);
    let (status, updated) = send(&app, "PUT", "/Book/UpdateBook/13", Some(changes)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["bookID"], 13);

    let (status, _) = send(&app, "DELETE", "/Book/DeleteBook/13", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", "/Book/DeleteBook/13", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_book_rejected() {
    let app = seeded_app();
    let payload = json!({
        "title": "",
        "author": "Nobody",
        "publisher": "Nowhere",
        "isbn": "000",
        "classification": "Fiction",
        "category": "Classic",
        "pageCount": 10,
        "price": 1.0
    });

    let (status, _) = send(&app, "POST", "/Book/AddBook", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_unknown_book_not_found() {
    let app = seeded_app();
    let payload = json!({
        "title": "Ghost",
        "author": "Nobody",
        "publisher": "Nowhere",
        "isbn": "000",
        "classification": "Fiction",
        "category": "Classic",
        "pageCount": 10,
        "price": 1.0
    });

    let (status, _) = send(&app, "PUT", "/Book/UpdateBook/999", Some(payload)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_session_flow() {
    let app = seeded_app();

    let (status, session) = send(&app, "POST", "/Cart", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let sid = session["sessionId"].as_str().unwrap().to_string();

    let add = |quantity: u32| {
        json!({ "bookID": 2, "title": "Les Miserables", "price": 10.0, "quantity": quantity })
    };

    send(&app, "POST", &format!("/Cart/{}/AddItem", sid), Some(add(2))).await;
    let (status, cart) = send(&app, "POST", &format!("/Cart/{}/AddItem", sid), Some(add(3))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 5);
    assert_eq!(cart["totalQuantity"], 5);
    assert!((cart["totalPrice"].as_f64().unwrap() - 50.0).abs() < 1e-9);

    // Cart survives across requests
    let (_, reloaded) = send(&app, "GET", &format!("/Cart/{}", sid), None).await;
    assert_eq!(reloaded["totalQuantity"], 5);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/Cart/{}/ChangeQuantity/2", sid),
        Some(json!({ "delta": -6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, cart) = send(
        &app,
        "PATCH",
        &format!("/Cart/{}/ChangeQuantity/2", sid),
        Some(json!({ "delta": -1 })),
    )
    .await;
    assert_eq!(cart["totalQuantity"], 4);

    let (_, cart) = send(&app, "DELETE", &format!("/Cart/{}/RemoveItem/2", sid), None).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
    assert_eq!(cart["totalPrice"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn test_cart_clear() {
    let app = seeded_app();
    let sid = "fixed-session";

    send(
        &app,
        "POST",
        &format!("/Cart/{}/AddItem", sid),
        Some(json!({ "bookID": 1, "title": "Team of Rivals", "price": 10.0, "quantity": 1 })),
    )
    .await;

    let (status, cart) = send(&app, "DELETE", &format!("/Cart/{}/Clear", sid), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["totalQuantity"], 0);
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_negative_price_is_bad_request() {
    let app = seeded_app();
    let sid = "negative-price";

    let (status, body) = send(
        &app,
        "POST",
        &format!("/Cart/{}/AddItem", sid),
        Some(json!({ "bookID": 1, "title": "Team of Rivals", "price": -10.0, "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("negative"));

    let (_, cart) = send(&app, "GET", &format!("/Cart/{}", sid), None).await;
    assert_eq!(cart["totalQuantity"], 0);
    assert_eq!(cart["totalPrice"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn test_ending_session_deletes_stored_cart() {
    let dir = std::env::temp_dir().join(format!("bookstore-api-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let db_path = dir.join("bookstore.db");

    let app = seeded_app_with(Connection::open(&db_path).unwrap());
    let stored_rows = || -> i64 {
        Connection::open(&db_path)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM session_storage", [], |row| row.get(0))
            .unwrap()
    };

    let (_, session) = send(&app, "POST", "/Cart", None).await;
    let sid = session["sessionId"].as_str().unwrap().to_string();

    send(
        &app,
        "POST",
        &format!("/Cart/{}/AddItem", sid),
        Some(json!({ "bookID": 3, "title": "The Power of Habit", "price": 10.02, "quantity": 1 })),
    )
    .await;
    assert_eq!(stored_rows(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/Cart/{}", sid), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(stored_rows(), 0);

    let (status, cart) = send(&app, "GET", &format!("/Cart/{}", sid), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cart["items"].as_array().unwrap().is_empty());

    drop(app);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_health() {
    let app = seeded_app();

    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
