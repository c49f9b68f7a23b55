// Bookstore Catalog - Web Server
// REST API with Axum over the SQLite catalog

use anyhow::{Context, Result};
use bookstore_catalog::api::{router, AppState};
use bookstore_catalog::logging::{init_tracing, DEFAULT_FILTER};
use bookstore_catalog::{count_books, prune_idle_sessions, setup_database, Config};
use rusqlite::Connection;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER);

    let config = Config::from_env()?;

    // Open database (created on first run)
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    setup_database(&conn)?;
    info!(
        path = %config.database_path.display(),
        books = count_books(&conn)?,
        "database opened"
    );

    let pruned = prune_idle_sessions(&conn, config.session_idle())?;
    info!(pruned, idle_hours = config.session_idle_hours, "idle sessions pruned");

    let state = AppState::new(conn, config.default_page_size).with_session_idle(config.session_idle());
    let app = router(state, &config.cors_origin);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, cors_origin = %config.cors_origin, "server listening");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
