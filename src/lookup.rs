//! Product lookup: the Open Food Facts client and the lookup state machine.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::ApiConfig;
use crate::error::LookupError;
use crate::notify::{Notification, Notifier};
use crate::product::{self, NormalizedProduct, RawProductRecord, REQUESTED_FIELDS};

/// Anything that can return a raw product record for a barcode.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_product(&self, barcode: &str) -> Result<RawProductRecord, LookupError>;
}

/// Open Food Facts API v2 client.
pub struct OpenFoodFactsClient {
    inner: reqwest::Client,
    base_url: Url,
}

impl OpenFoodFactsClient {
    pub fn new(config: &ApiConfig) -> Result<Self, LookupError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LookupError::Network(format!("invalid API base URL: {}", e)))?;
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { inner, base_url })
    }

    /// `{base}/api/v2/product/{barcode}.json?fields=...`
    pub fn product_url(&self, barcode: &str) -> Result<Url, LookupError> {
        let file = format!("{}.json", barcode);
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::Network(format!("cannot use {} as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v2", "product", file.as_str()]);
        url.query_pairs_mut()
            .append_pair("fields", &REQUESTED_FIELDS.join(","));
        Ok(url)
    }
}

#[async_trait]
impl ProductSource for OpenFoodFactsClient {
    async fn fetch_product(&self, barcode: &str) -> Result<RawProductRecord, LookupError> {
        let url = self.product_url(barcode)?;
        tracing::debug!(%url, "requesting product");

        let response = self.inner.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<RawProductRecord>().await?);
        }

        // v2 answers unknown codes with 404 and a regular `status: 0` body.
        if status == reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            if let Ok(record) = serde_json::from_str::<RawProductRecord>(&body) {
                if record.status == 0 {
                    return Ok(record);
                }
            }
        }

        Err(LookupError::Network(format!(
            "HTTP error! status: {}",
            status.as_u16()
        )))
    }
}

/// In-memory product source keyed by barcode.
#[derive(Default)]
pub struct MockSource {
    responses: HashMap<String, Result<RawProductRecord, LookupError>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, barcode: &str, record: RawProductRecord) -> Self {
        self.responses.insert(barcode.to_string(), Ok(record));
        self
    }

    pub fn with_json(self, barcode: &str, json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(record) => self.with_record(barcode, record),
            Err(e) => self.with_error(barcode, LookupError::Network(e.to_string())),
        }
    }

    pub fn with_error(mut self, barcode: &str, error: LookupError) -> Self {
        self.responses.insert(barcode.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl ProductSource for MockSource {
    async fn fetch_product(&self, barcode: &str) -> Result<RawProductRecord, LookupError> {
        match self.responses.get(barcode) {
            Some(response) => response.clone(),
            None => Err(LookupError::Network(format!(
                "No mock response for barcode: {}",
                barcode
            ))),
        }
    }
}

/// Fetch and normalize the product for `barcode`.
pub async fn lookup(
    source: &dyn ProductSource,
    barcode: &str,
) -> Result<NormalizedProduct, LookupError> {
    let barcode = barcode.trim();
    tracing::info!(barcode, "looking up product");

    let raw = source.fetch_product(barcode).await?;
    product::normalize(&raw, barcode).map_err(|not_found| LookupError::NotFound {
        barcode: barcode.to_string(),
        status_verbose: not_found.status_verbose,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupState {
    Idle,
    Loading { barcode: String },
    Success(NormalizedProduct),
    Failed(LookupError),
}

/// Identifies one call to [`LookupTracker::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    seq: u64,
    barcode: String,
}

impl LookupTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }
}

/// Tracks the displayed lookup. The most recent `begin` wins; results of
/// older tickets are dropped when they arrive.
#[derive(Debug)]
pub struct LookupTracker {
    state: LookupState,
    latest: u64,
}

impl Default for LookupTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupTracker {
    pub fn new() -> Self {
        Self {
            state: LookupState::Idle,
            latest: 0,
        }
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LookupState::Loading { .. })
    }

    pub fn product(&self) -> Option<&NormalizedProduct> {
        match &self.state {
            LookupState::Success(product) => Some(product),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LookupError> {
        match &self.state {
            LookupState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }

    /// Enter `Loading`, dropping any displayed product or error.
    pub fn begin(&mut self, barcode: &str) -> LookupTicket {
        self.latest += 1;
        let barcode = barcode.trim().to_string();
        self.state = LookupState::Loading {
            barcode: barcode.clone(),
        };
        LookupTicket {
            seq: self.latest,
            barcode,
        }
    }

    /// Apply the result for `ticket`. Returns false when a newer lookup has
    /// started (or the tracker was reset) since the ticket was issued.
    pub fn complete(
        &mut self,
        ticket: LookupTicket,
        result: Result<NormalizedProduct, LookupError>,
        notifier: &dyn Notifier,
    ) -> bool {
        if !self.is_current(ticket.seq) || !self.is_loading() {
            tracing::warn!(
                barcode = %ticket.barcode,
                seq = ticket.seq,
                latest = self.latest,
                "dropping stale lookup result"
            );
            return false;
        }

        notifier.notify(Notification::for_lookup(&result));
        self.state = match result {
            Ok(product) => {
                tracing::info!(barcode = %ticket.barcode, name = %product.name, "product found");
                LookupState::Success(product)
            }
            Err(error) => {
                tracing::info!(barcode = %ticket.barcode, %error, "lookup failed");
                LookupState::Failed(error)
            }
        };
        true
    }

    /// Back to `Idle`; any in-flight lookup becomes stale.
    pub fn reset(&mut self) {
        self.latest += 1;
        self.state = LookupState::Idle;
    }

    /// Drop a displayed error without touching a loaded product.
    pub fn dismiss_error(&mut self) {
        if matches!(self.state, LookupState::Failed(_)) {
            self.state = LookupState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;

    const NUTELLA: &str = r#"{"code":"3017620422003","product":{"product_name":"Nutella","ingredients_text":"Sugar, Palm Oil, Hazelnuts, Skim Milk Powder"},"status":1,"status_verbose":"product found"}"#;

    fn product(name: &str) -> NormalizedProduct {
        NormalizedProduct {
            id: "1".into(),
            name: name.into(),
            image_url: None,
            ingredients_text: None,
        }
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let source = MockSource::new().with_json("3017620422003", NUTELLA);
        let product = lookup(&source, "3017620422003").await.unwrap();
        assert_eq!(product.name, "Nutella");
        assert_eq!(product.id, "3017620422003");
    }

    #[tokio::test]
    async fn test_lookup_trims_barcode() {
        let source = MockSource::new().with_json("3017620422003", NUTELLA);
        assert!(lookup(&source, "  3017620422003\n").await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let source = MockSource::new().with_json(
            "000000000000",
            r#"{"code":"000000000000","status":0,"status_verbose":"product not found"}"#,
        );
        let err = lookup(&source, "000000000000").await.unwrap_err();
        assert_eq!(
            err,
            LookupError::NotFound {
                barcode: "000000000000".into(),
                status_verbose: "product not found".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_lookup_network_error_passes_through() {
        let source = MockSource::new().with_error("1", LookupError::Network("HTTP error! status: 503".into()));
        let err = lookup(&source, "1").await.unwrap_err();
        assert!(matches!(err, LookupError::Network(_)));
    }

    #[test]
    fn test_state_transitions() {
        let notifier = RecordingNotifier::new();
        let mut tracker = LookupTracker::new();
        assert_eq!(tracker.state(), &LookupState::Idle);

        let ticket = tracker.begin("1");
        assert!(tracker.is_loading());
        assert!(tracker.complete(ticket, Ok(product("A")), &notifier));
        assert_eq!(tracker.product().map(|p| p.name.as_str()), Some("A"));

        let ticket = tracker.begin("2");
        assert!(tracker.product().is_none());
        assert!(tracker.complete(ticket, Err(LookupError::Network("x".into())), &notifier));
        assert!(tracker.error().is_some());

        tracker.begin("3");
        assert!(tracker.error().is_none());
        tracker.reset();
        assert_eq!(tracker.state(), &LookupState::Idle);
        assert_eq!(notifier.notifications().len(), 2);
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let notifier = RecordingNotifier::new();
        let mut tracker = LookupTracker::new();
        let first = tracker.begin("1");
        let second = tracker.begin("2");

        // Newer request finishes first, then the older one arrives late.
        assert!(tracker.complete(second, Ok(product("Second")), &notifier));
        assert!(!tracker.complete(first, Ok(product("First")), &notifier));
        assert_eq!(tracker.product().map(|p| p.name.as_str()), Some("Second"));
        assert_eq!(notifier.notifications().len(), 1);
    }

    #[test]
    fn test_result_after_reset_is_dropped() {
        let notifier = RecordingNotifier::new();
        let mut tracker = LookupTracker::new();
        let ticket = tracker.begin("1");
        tracker.reset();
        assert!(!tracker.complete(ticket, Ok(product("A")), &notifier));
        assert_eq!(tracker.state(), &LookupState::Idle);
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_dismiss_error_keeps_product() {
        let notifier = RecordingNotifier::new();
        let mut tracker = LookupTracker::new();
        let ticket = tracker.begin("1");
        tracker.complete(ticket, Ok(product("A")), &notifier);
        tracker.dismiss_error();
        assert!(tracker.product().is_some());

        let ticket = tracker.begin("2");
        tracker.complete(ticket, Err(LookupError::Network("x".into())), &notifier);
        tracker.dismiss_error();
        assert_eq!(tracker.state(), &LookupState::Idle);
    }

    #[test]
    fn test_product_url() {
        let client = OpenFoodFactsClient::new(&ApiConfig {
            base_url: "https://world.openfoodfacts.org".into(),
            ..ApiConfig::default()
        })
        .unwrap();
        let url = client.product_url("3017620422003").unwrap();
        assert_eq!(url.path(), "/api/v2/product/3017620422003.json");
        let fields: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "fields");
        assert!(fields[0].1.starts_with("product_name,product_name_en,"));
    }

    #[test]
    fn test_product_url_escapes_barcode() {
        let client = OpenFoodFactsClient::new(&ApiConfig::default()).unwrap();
        let url = client.product_url("12/34").unwrap();
        assert_eq!(url.path(), "/api/v2/product/12%2F34.json");
    }
}
