//! End-to-end tests of the reqwest transport against a local mock server

use std::sync::Arc;

use mockito::{Matcher, Server};
use openregister::{
    HttpTransport, Locator, PaginatedFetcher, RegisterClient, RegisterError, DEFAULT_PAGE_SIZE,
};

const COUNTRIES: &str = "entry-number\titem-hash\tcountry\tname\tcitizen-names\n\
    1\tsha-256:01\tGB\tUnited Kingdom\tBriton;British citizen\n";

fn locator(server: &Server) -> Locator {
    Locator::base_url(format!("{}/register", server.url())).unwrap()
}

#[test]
fn test_link_header_is_read() {
    let mut server = Server::new();
    let page = server
        .mock("GET", "/country/records.tsv")
        .with_status(200)
        .with_header("link", "<?page-index=2&page-size=100>; rel=\"next\"")
        .with_body(COUNTRIES)
        .create();

    let fetcher = PaginatedFetcher::new(Arc::new(HttpTransport::default()), None);
    let url = format!("{}/country/records.tsv", server.url());
    let pages = fetcher.fetch_all(&url, DEFAULT_PAGE_SIZE, false).unwrap();

    page.assert();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].body, COUNTRIES);
    assert_eq!(pages[0].next_link.as_deref(), Some("?page-index=2&page-size=100"));
}

#[test]
fn test_records_without_field_metadata() {
    let mut server = Server::new();
    let _records = server
        .mock("GET", "/country/records.tsv")
        .with_status(200)
        .with_body(COUNTRIES)
        .create();
    let fields = server
        .mock("GET", Matcher::Regex(r"^/field/record/".to_string()))
        .with_status(404)
        .expect(3)
        .create();

    let client = RegisterClient::new(Arc::new(HttpTransport::default()));
    let records = client
        .records_for("country", &locator(&server), false, DEFAULT_PAGE_SIZE)
        .unwrap();

    fields.assert();
    assert_eq!(records.len(), 1);
    // No field definitions: every attribute stays plain text
    assert_eq!(records[0].get("citizen-names"), Some("Briton;British citizen"));
    assert!(records[0].linked("country").unwrap().is_none());
}

#[test]
fn test_server_error_propagates() {
    let mut server = Server::new();
    let _failing = server
        .mock("GET", "/country/records.tsv")
        .with_status(500)
        .create();

    let client = RegisterClient::new(Arc::new(HttpTransport::default()));
    let result = client.records_for("country", &locator(&server), false, DEFAULT_PAGE_SIZE);
    assert!(matches!(result, Err(RegisterError::Status { status: 500, .. })));
}
