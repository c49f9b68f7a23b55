use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;

// Use library instead of local modules
use bookstore_catalog::logging::{init_tracing, DEFAULT_FILTER};
use bookstore_catalog::{
    count_books, import_books, list_books, list_categories, load_csv, setup_database,
    BookQuery, Config, SortOrder,
};

const USAGE: &str = "Usage:
  bookstore                                   show catalog size
  bookstore import <books.csv>                import books from CSV
  bookstore list [pageNum] [pageSize] [--sort asc|desc] [--category NAME]...
  bookstore categories                        list distinct categories";

fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER);

    let config = Config::from_env()?;
    let args: Vec<String> = env::args().skip(1).collect();

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    setup_database(&conn)?;

    match args.first().map(String::as_str) {
        Some("import") => {
            let Some(csv_path) = args.get(1) else {
                bail!("missing CSV path\n\n{}", USAGE);
            };
            run_import(&conn, Path::new(csv_path))
        }
        Some("list") => run_list(&conn, &args[1..], config.default_page_size),
        Some("categories") => run_categories(&conn),
        Some("help") | Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => bail!("unknown command '{}'\n\n{}", other, USAGE),
        None => {
            println!("📚 Catalog contains {} books", count_books(&conn)?);
            Ok(())
        }
    }
}

fn run_import(conn: &Connection, csv_path: &Path) -> Result<()> {
    println!("📂 Loading {}...", csv_path.display());
    let books = load_csv(csv_path)?;
    println!("✓ Loaded {} books from CSV", books.len());

    let inserted = import_books(conn, &books)?;
    println!("✓ Inserted {} books", inserted);
    println!("✓ Catalog now contains {} books", count_books(conn)?);

    Ok(())
}

fn run_list(conn: &Connection, args: &[String], default_page_size: usize) -> Result<()> {
    let mut positional = Vec::new();
    let mut sort = None;
    let mut categories = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--sort" => {
                let order = iter.next().context("--sort needs asc or desc")?;
                sort = Some(SortOrder::parse(order));
            }
            "--category" => {
                let category = iter.next().context("--category needs a name")?;
                categories.push(category.clone());
            }
            value => positional.push(value.to_string()),
        }
    }

    let page_num: usize = match positional.first() {
        Some(raw) => raw.parse().with_context(|| format!("invalid page number '{}'", raw))?,
        None => 1,
    };
    let page_size: usize = match positional.get(1) {
        Some(raw) => raw.parse().with_context(|| format!("invalid page size '{}'", raw))?,
        None => default_page_size,
    };

    let mut query = BookQuery::default()
        .with_page(page_num, page_size)
        .in_categories(categories);
    if let Some(order) = sort {
        query = query.sorted_by_title(order);
    }

    let page = list_books(conn, &query)?;

    for book in &page.books {
        println!(
            "{:>4}  {:<40}  {:<24}  {:<14}  ${:.2}",
            book.book_id, book.title, book.author, book.category, book.price
        );
    }
    println!(
        "\nPage {} of {} ({} books)",
        page_num,
        page.total_pages(page_size),
        page.total_num_books
    );

    Ok(())
}

fn run_categories(conn: &Connection) -> Result<()> {
    for category in list_categories(conn)? {
        println!("{}", category);
    }

    Ok(())
}
