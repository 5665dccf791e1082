use veganwise::classifier::classify;
use veganwise::config::ApiConfig;
use veganwise::error::LookupError;
use veganwise::keywords::KeywordSet;
use veganwise::lookup::{self, LookupTracker, MockSource, OpenFoodFactsClient, ProductSource};
use veganwise::notify::{NotificationKind, RecordingNotifier};
use veganwise::product::REQUESTED_FIELDS;
use veganwise::types::{IngredientsVerdict, ProductDisplay, ScreenDisplay};

const NUTELLA: &str = r#"{
    "code": "3017620422003",
    "product": {
        "product_name": "Nutella",
        "ingredients_text": "Sugar, Palm Oil, Hazelnuts, Skim Milk Powder"
    },
    "status": 1,
    "status_verbose": "product found"
}"#;

const NOT_FOUND: &str =
    r#"{"code":"000000000000","status":0,"status_verbose":"product not found"}"#;

#[tokio::test]
async fn test_nutella_is_potentially_non_vegan() {
    let source = MockSource::new().with_json("3017620422003", NUTELLA);
    let notifier = RecordingNotifier::new();
    let mut tracker = LookupTracker::new();

    let ticket = tracker.begin("3017620422003");
    let result = lookup::lookup(&source, ticket.barcode()).await;
    assert!(tracker.complete(ticket, result, &notifier));

    let product = tracker.product().unwrap();
    assert_eq!(product.name, "Nutella");

    let display = ProductDisplay::new(product, KeywordSet::builtin());
    assert_eq!(display.verdict, IngredientsVerdict::NonVegan);
    let flagged: Vec<(&str, Option<&str>)> = display
        .segments
        .iter()
        .filter(|s| s.flagged)
        .map(|s| (s.display_text.as_str(), s.matched_keyword.as_deref()))
        .collect();
    assert_eq!(flagged, vec![("Skim Milk Powder", Some("milk"))]);
    assert_eq!(display.segments.len(), 4);

    let notes = notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "Product Found!");
}

#[tokio::test]
async fn test_unknown_barcode_shows_not_found() {
    let source = MockSource::new().with_json("000000000000", NOT_FOUND);
    let notifier = RecordingNotifier::new();
    let mut tracker = LookupTracker::new();

    let ticket = tracker.begin("000000000000");
    let result = lookup::lookup(&source, ticket.barcode()).await;
    tracker.complete(ticket, result, &notifier);

    assert!(tracker.product().is_none());
    let screen = ScreenDisplay::build(tracker.state(), None, false, KeywordSet::builtin());
    assert!(screen.product.is_none());
    let error = screen.error.unwrap();
    assert!(error.message.contains("000000000000"));

    let notes = notifier.notifications();
    assert_eq!(notes[0].title, "Product Not Found");
    assert_eq!(notes[0].kind, NotificationKind::Error);
}

#[test]
fn test_absent_ingredients_are_unparseable() {
    let classification = classify(None, KeywordSet::builtin());
    assert!(classification.is_unparseable());
    assert!(!classification.is_potentially_non_vegan());
}

#[test]
fn test_word_boundaries_with_custom_keyword() {
    let keywords = KeywordSet::new(["corn"]).unwrap();
    assert!(!classify(Some("popcorn"), &keywords).is_potentially_non_vegan());
    assert!(classify(Some("corn starch"), &keywords).is_potentially_non_vegan());
}

fn client_for(server: &mockito::Server) -> OpenFoodFactsClient {
    OpenFoodFactsClient::new(&ApiConfig {
        base_url: server.url(),
        ..ApiConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_client_requests_selected_fields() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v2/product/3017620422003.json")
        .match_query(mockito::Matcher::UrlEncoded(
            "fields".into(),
            REQUESTED_FIELDS.join(","),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(NUTELLA)
        .create_async()
        .await;

    let client = client_for(&server);
    let record = client.fetch_product("3017620422003").await.unwrap();
    assert_eq!(record.status, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_server_error_is_network_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v2/product/123.json")
        .match_query(mockito::Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = lookup::lookup(&client, "123").await.unwrap_err();
    assert_eq!(err, LookupError::Network("HTTP error! status: 503".into()));
}

#[tokio::test]
async fn test_client_404_with_status_zero_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v2/product/000000000000.json")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(NOT_FOUND)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = lookup::lookup(&client, "000000000000").await.unwrap_err();
    assert!(matches!(err, LookupError::NotFound { ref barcode, .. } if barcode == "000000000000"));
}

#[tokio::test]
async fn test_client_plain_404_is_network_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v2/product/42.json")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .with_body("<html>not here</html>")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = lookup::lookup(&client, "42").await.unwrap_err();
    assert!(matches!(err, LookupError::Network(_)));
}
