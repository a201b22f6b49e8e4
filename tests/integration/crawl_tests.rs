//! Integration tests for the crawl-and-persist pipeline
//!
//! These tests use wiremock to serve a small mock catalog and run the full
//! pipeline end-to-end against a temporary SQLite database.

use catalog_harvest::config::{ApiConfig, CatalogConfig, Config, OutputConfig, UserAgentConfig};
use catalog_harvest::crawler::{run_pipeline, BookRecord, Termination};
use catalog_harvest::storage::{open_storage, Storage, StoredBook};
use catalog_harvest::{HarvestError, ItemFailurePolicy, RunStatus};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock catalog
fn create_test_config(server: &MockServer, dir: &TempDir, policy: ItemFailurePolicy) -> Config {
    Config {
        catalog: CatalogConfig {
            base_url: format!("{}/catalogue/", server.uri()),
            first_page: "page-1.html".to_string(),
            request_delay_ms: 0,
            item_failure_policy: policy,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: dir.path().join("books.db").to_string_lossy().into_owned(),
            csv_path: Some(dir.path().join("books.csv").to_string_lossy().into_owned()),
        },
        api: ApiConfig::default(),
    }
}

fn listing_page(items: &[&str], next: Option<&str>) -> String {
    let entries: String = items
        .iter()
        .map(|slug| {
            format!(
                r#"<li class="col-xs-6"><article class="product_pod">
                    <div class="image_container"><a href="{slug}/index.html"><img src="cover.jpg"></a></div>
                    <h3><a href="{slug}/index.html" title="{slug}">{slug}</a></h3>
                    <div class="product_price"><p class="price_color">£10.00</p></div>
                </article></li>"#
            )
        })
        .collect();
    let pager = next
        .map(|href| format!(r#"<ul class="pager"><li class="next"><a href="{}">next</a></li></ul>"#, href))
        .unwrap_or_default();

    format!(
        r#"<html><body><section><ol class="row">{}</ol>{}</section></body></html>"#,
        entries, pager
    )
}

fn detail_page(category: &str, title: &str, description: Option<&str>) -> String {
    let description = description
        .map(|text| {
            format!(
                r#"<div id="product_description" class="sub-header"><h2>Product Description</h2></div>
                <p>{}</p>"#,
                text
            )
        })
        .unwrap_or_default();

    format!(
        r#"<html><body>
        <ul class="breadcrumb">
            <li><a href="../../index.html">Home</a></li>
            <li><a href="../category/books_1/index.html">Books</a></li>
            <li><a href="../category/books/x/index.html">{category}</a></li>
            <li class="active">{title}</li>
        </ul>
        <article class="product_page">
            <div class="col-sm-6 product_main"><h1>{title}</h1><p class="price_color">£51.77</p></div>
            {description}
            <table class="table table-striped">
                <tr><th>UPC</th><td>a897fe39b1053632</td></tr>
                <tr><th>Price (excl. tax)</th><td>£51.77</td></tr>
                <tr><th>Price (incl. tax)</th><td>£51.77</td></tr>
                <tr><th>Tax</th><td>£0.00</td></tr>
                <tr><th>Availability</th><td>In stock (22 available)</td></tr>
            </table>
        </article></body></html>"#
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_book(server: &MockServer, slug: &str, category: &str) {
    mount_page(
        server,
        &format!("/catalogue/{}/index.html", slug),
        detail_page(category, slug, Some(&format!("About {}", slug))),
    )
    .await;
}

fn stored_books(config: &Config) -> Vec<StoredBook> {
    open_storage(Path::new(&config.output.database_path))
        .unwrap()
        .list_books()
        .unwrap()
}

fn seed_record(title: &str) -> BookRecord {
    BookRecord {
        category: "Seeded".to_string(),
        title: title.to_string(),
        description: String::new(),
        price: "£1.00".to_string(),
        tax: "£0.00".to_string(),
        availability: "In stock".to_string(),
    }
}

#[tokio::test]
async fn test_two_pages_persist_sequential_ids_and_csv() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["alpha_1", "beta_2"], Some("page-2.html"))).await;
    mount_page(&server, "/catalogue/page-2.html", listing_page(&["gamma_3"], None)).await;
    mount_book(&server, "alpha_1", "Poetry").await;
    mount_book(&server, "beta_2", "Fiction").await;
    mount_book(&server, "gamma_3", "Poetry").await;

    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);
    let report = run_pipeline(&config, "hash").await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.persisted, 3);
    assert_eq!(report.outcome.listing_pages, 2);
    assert_eq!(report.outcome.termination, Termination::Exhausted);

    let books = stored_books(&config);
    let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
    let titles: Vec<&str> = books.iter().map(|b| b.record.title.as_str()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(titles, vec!["alpha_1", "beta_2", "gamma_3"]);

    let first = &books[0].record;
    assert_eq!(first.category, "Poetry");
    assert_eq!(first.description, "About alpha_1");
    assert_eq!(first.price, "£51.77");
    assert_eq!(first.tax, "£0.00");
    assert_eq!(first.availability, "In stock (22 available)");

    let csv_path = report.csv_path.expect("CSV should have been written");
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        header,
        vec!["category", "title", "description", "price", "tax", "availability"]
    );
    assert_eq!(reader.records().count(), 3);

    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.records, 3);
    assert_eq!(run.config_hash, "hash");
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_network_failure_keeps_earlier_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["a_1", "b_2"], Some("page-2.html"))).await;
    mount_page(&server, "/catalogue/page-2.html", listing_page(&["c_3", "d_4"], Some("page-3.html"))).await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-3.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-4.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["e_5"], Some("page-5.html"))))
        .expect(0)
        .mount(&server)
        .await;
    for slug in ["a_1", "b_2", "c_3", "d_4"] {
        mount_book(&server, slug, "Travel").await;
    }

    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);
    let report = run_pipeline(&config, "hash").await.unwrap();

    assert_eq!(report.status, RunStatus::Partial);
    assert!(matches!(report.outcome.termination, Termination::ListingFailed { .. }));
    assert_eq!(report.persisted, 4);

    let titles: Vec<String> = stored_books(&config).into_iter().map(|b| b.record.title).collect();
    assert_eq!(titles, vec!["a_1", "b_2", "c_3", "d_4"]);

    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_run(report.run_id).unwrap();
    assert!(run.error.unwrap().contains("page-3.html"));
}

#[tokio::test]
async fn test_empty_listing_leaves_table_untouched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);

    {
        let mut storage = open_storage(Path::new(&config.output.database_path)).unwrap();
        storage
            .replace_books(&[seed_record("Kept 1"), seed_record("Kept 2")])
            .unwrap();
    }

    // No entries but a next control: the crawl still ends here
    mount_page(&server, "/catalogue/page-1.html", listing_page(&[], Some("page-2.html"))).await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["late_1"], None)))
        .expect(0)
        .mount(&server)
        .await;

    let report = run_pipeline(&config, "hash").await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(matches!(report.outcome.termination, Termination::EmptyListing { .. }));
    assert_eq!(report.status, RunStatus::Empty);
    assert_eq!(report.persisted, 0);
    assert!(report.csv_path.is_none());
    assert!(!dir.path().join("books.csv").exists());

    let titles: Vec<String> = stored_books(&config).into_iter().map(|b| b.record.title).collect();
    assert_eq!(titles, vec!["Kept 1", "Kept 2"]);
}

#[tokio::test]
async fn test_unreachable_first_page_leaves_table_untouched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);

    {
        let mut storage = open_storage(Path::new(&config.output.database_path)).unwrap();
        storage.replace_books(&[seed_record("Kept")]).unwrap();
    }

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let report = run_pipeline(&config, "hash").await.unwrap();
    assert_eq!(report.status, RunStatus::Empty);
    assert_eq!(stored_books(&config).len(), 1);
}

#[tokio::test]
async fn test_missing_description_becomes_empty() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["plain_1", "full_2"], None)).await;
    mount_page(&server, "/catalogue/plain_1/index.html", detail_page("Poetry", "plain_1", None)).await;
    mount_book(&server, "full_2", "Poetry").await;

    let config = create_test_config(&server, &dir, ItemFailurePolicy::Abort);
    let report = run_pipeline(&config, "hash").await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    let books = stored_books(&config);
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].record.description, "");
    assert_eq!(books[1].record.description, "About full_2");
}

#[tokio::test]
async fn test_skip_policy_records_broken_item() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["ok_1", "broken_2", "ok_3"], None)).await;
    mount_book(&server, "ok_1", "Music").await;
    Mock::given(method("GET"))
        .and(path("/catalogue/broken_2/index.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_book(&server, "ok_3", "Music").await;

    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);
    let report = run_pipeline(&config, "hash").await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.outcome.skipped_items.len(), 1);
    assert!(report.outcome.skipped_items[0].ends_with("/catalogue/broken_2/index.html"));

    let books = stored_books(&config);
    let titles: Vec<&str> = books.iter().map(|b| b.record.title.as_str()).collect();
    assert_eq!(titles, vec!["ok_1", "ok_3"]);
    assert_eq!(books[1].id, 2);
}

#[tokio::test]
async fn test_abort_policy_keeps_records_before_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["ok_1", "broken_2", "ok_3"], Some("page-2.html"))).await;
    mount_book(&server, "ok_1", "Music").await;
    // Required elements missing: extraction fails
    mount_page(&server, "/catalogue/broken_2/index.html", "<html><body></body></html>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/catalogue/ok_3/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Music", "ok_3", None)))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], None)))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir, ItemFailurePolicy::Abort);
    let report = run_pipeline(&config, "hash").await.unwrap();

    assert_eq!(report.status, RunStatus::Partial);
    assert!(matches!(report.outcome.termination, Termination::ItemFailed { .. }));

    let titles: Vec<String> = stored_books(&config).into_iter().map(|b| b.record.title).collect();
    assert_eq!(titles, vec!["ok_1"]);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["one_1", "two_2"], None)).await;
    mount_book(&server, "one_1", "History").await;
    mount_book(&server, "two_2", "Science").await;

    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);

    let first = run_pipeline(&config, "hash").await.unwrap();
    let after_first = stored_books(&config);
    let second = run_pipeline(&config, "hash").await.unwrap();
    let after_second = stored_books(&config);

    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(second.status, RunStatus::Completed);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(after_first, after_second);
    assert_eq!(after_second.len(), 2);
}

#[tokio::test]
async fn test_replacement_discards_stale_rows() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);

    {
        let mut storage = open_storage(Path::new(&config.output.database_path)).unwrap();
        storage
            .replace_books(&[seed_record("Old 1"), seed_record("Old 2"), seed_record("Old 3")])
            .unwrap();
    }

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["fresh_1"], None)).await;
    mount_book(&server, "fresh_1", "Poetry").await;

    run_pipeline(&config, "hash").await.unwrap();

    let books = stored_books(&config);
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, 1);
    assert_eq!(books[0].record.title, "fresh_1");
}

#[tokio::test]
async fn test_pagination_cycle_stops_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["a_1"], Some("page-2.html"))).await;
    mount_page(&server, "/catalogue/page-2.html", listing_page(&["b_2"], Some("page-1.html"))).await;
    mount_book(&server, "a_1", "Poetry").await;
    mount_book(&server, "b_2", "Poetry").await;

    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);
    let report = run_pipeline(&config, "hash").await.unwrap();

    assert!(matches!(report.outcome.termination, Termination::PaginationCycle { .. }));
    assert_eq!(report.persisted, 2);
}

#[tokio::test]
async fn test_persistence_failure_keeps_previous_rows() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, ItemFailurePolicy::Skip);
    let db_path = Path::new(&config.output.database_path);

    {
        let mut storage = open_storage(db_path).unwrap();
        storage
            .replace_books(&[seed_record("Kept 1"), seed_record("Kept 2")])
            .unwrap();
    }
    {
        let conn = rusqlite::Connection::open(db_path).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER books_read_only BEFORE DELETE ON books
             BEGIN SELECT RAISE(ABORT, 'books table is read-only'); END;",
        )
        .unwrap();
    }

    mount_page(&server, "/catalogue/page-1.html", listing_page(&["new_1", "new_2"], None)).await;
    mount_book(&server, "new_1", "Poetry").await;
    mount_book(&server, "new_2", "Poetry").await;

    let err = run_pipeline(&config, "hash").await.unwrap_err();
    assert!(matches!(err, HarvestError::Persistence(_)), "{}", err);

    let storage = open_storage(db_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.records, 0);
    assert!(run.error.unwrap().contains("read-only"));

    let titles: Vec<String> = storage
        .list_books()
        .unwrap()
        .into_iter()
        .map(|b| b.record.title)
        .collect();
    assert_eq!(titles, vec!["Kept 1", "Kept 2"]);
    assert!(!dir.path().join("books.csv").exists());
}
