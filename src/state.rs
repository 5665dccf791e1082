use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use crate::barcode::ScanDebouncer;
use crate::config::AppConfig;
use crate::error::{ScanError, StartupError};
use crate::image_fetch::ImageFetcher;
use crate::keywords::KeywordSet;
use crate::lookup::{LookupTracker, OpenFoodFactsClient, ProductSource};
use crate::scanner::{ScanInput, ZbarCamDecoder};

/// Application state shared by the UI callbacks. Lives on the UI thread;
/// network work runs on `runtime` and reports back through `slint::spawn_local`.
pub struct AppState {
    pub config: AppConfig,
    pub keywords: KeywordSet,
    pub runtime: tokio::runtime::Runtime,
    pub source: Arc<dyn ProductSource>,
    pub images: Arc<ImageFetcher>,
    pub lookup: RefCell<LookupTracker>,
    pub scan: RefCell<ScanInput<ZbarCamDecoder>>,
    pub scan_error: RefCell<Option<ScanError>>,
    pub debouncer: RefCell<ScanDebouncer>,
    pub product_image: RefCell<Option<slint::Image>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, StartupError> {
        let source = Arc::new(OpenFoodFactsClient::new(&config.api)?);
        Self::with_source(config, source)
    }

    pub fn with_source(
        config: AppConfig,
        source: Arc<dyn ProductSource>,
    ) -> Result<Self, StartupError> {
        let keywords = KeywordSet::builtin_with(&config.keywords.extra)?;
        tracing::info!(keywords = keywords.len(), "keyword list ready");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("veganwise-net")
            .enable_all()
            .build()?;

        let images = Arc::new(ImageFetcher::new(
            &config.images,
            &config.api.user_agent,
            Duration::from_secs(config.api.timeout_secs),
        )?);

        let program = config.scanner.program.clone();
        let scan = ScanInput::new(config.scanner.clone(), move || {
            ZbarCamDecoder::new(program.clone())
        });
        let debouncer = ScanDebouncer::new(Duration::from_secs(config.scanner.debounce_secs));

        Ok(Self {
            config,
            keywords,
            runtime,
            source,
            images,
            lookup: RefCell::new(LookupTracker::new()),
            scan: RefCell::new(scan),
            scan_error: RefCell::new(None),
            debouncer: RefCell::new(debouncer),
            product_image: RefCell::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MockSource;

    #[test]
    fn test_extra_keywords_are_added() {
        let mut config = AppConfig::default();
        config.keywords.extra = vec!["insect protein".into()];
        let state = AppState::with_source(config, Arc::new(MockSource::new())).unwrap();
        assert!(state.keywords.contains("insect protein"));
        assert!(state.keywords.contains("milk"));
        assert!(!state.scan.borrow().is_scanning());
    }
}
