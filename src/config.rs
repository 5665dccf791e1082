use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::scanner::Symbology;

/// VeganWise configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Open Food Facts instance (e.g., "https://world.openfoodfacts.org")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Open Food Facts asks clients to identify themselves
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://world.openfoodfacts.org".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("VeganWise/{} (desktop)", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Decoder executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Video device; `None` lets the decoder pick
    #[serde(default)]
    pub device: Option<String>,

    #[serde(default = "default_symbologies")]
    pub symbologies: Vec<Symbology>,

    /// Also recognize QR codes
    #[serde(default)]
    pub include_qr: bool,

    /// Frames per second sampled while scanning
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Scan window size. The decoder reads the whole frame, so this is not
    /// passed to it.
    #[serde(default = "default_region_width")]
    pub region_width: u32,

    #[serde(default = "default_region_height")]
    pub region_height: u32,

    /// Camera capture resolution. Passed to the decoder only when both are set.
    #[serde(default)]
    pub capture_width: Option<u32>,

    #[serde(default)]
    pub capture_height: Option<u32>,

    /// Reuse the device that last started successfully
    #[serde(default = "default_remember_last_camera")]
    pub remember_last_camera: bool,

    /// Identical keyboard-wedge scans within this window are ignored
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
}

fn default_program() -> String {
    "zbarcam".to_string()
}

fn default_symbologies() -> Vec<Symbology> {
    Symbology::LINEAR.to_vec()
}

fn default_fps() -> u32 {
    10
}

fn default_region_width() -> u32 {
    250
}

fn default_region_height() -> u32 {
    150
}

fn default_remember_last_camera() -> bool {
    true
}

fn default_debounce_secs() -> u64 {
    2
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            device: None,
            symbologies: default_symbologies(),
            include_qr: false,
            fps: default_fps(),
            region_width: default_region_width(),
            region_height: default_region_height(),
            capture_width: None,
            capture_height: None,
            remember_last_camera: default_remember_last_camera(),
            debounce_secs: default_debounce_secs(),
        }
    }
}

impl ScannerConfig {
    /// Configured symbologies plus QR when enabled, without duplicates.
    pub fn symbology_set(&self) -> Vec<Symbology> {
        let mut set: Vec<Symbology> = Vec::with_capacity(self.symbologies.len() + 1);
        let extra = self.include_qr.then_some(Symbology::QrCode);
        for sym in self.symbologies.iter().copied().chain(extra) {
            if !set.contains(&sym) {
                set.push(sym);
            }
        }
        set
    }

    pub fn capture_size(&self) -> Option<(u32, u32)> {
        Some((self.capture_width?, self.capture_height?))
    }

    /// Interval between decoder polls.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Hosts product images may be downloaded from (HTTPS only)
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_allowed_hosts() -> Vec<String> {
    vec![
        "picsum.photos".to_string(),
        "fastly.picsum.photos".to_string(),
        "images.openfoodfacts.org".to_string(),
        "static.openfoodfacts.org".to_string(),
    ]
}

fn default_max_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: default_allowed_hosts(),
            max_bytes: default_max_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeywordConfig {
    /// Added to the built-in non-vegan keyword list
    #[serde(default)]
    pub extra: Vec<String>,
}

impl AppConfig {
    /// Parse configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `$XDG_CONFIG_HOME/veganwise/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("veganwise").join("config.toml"))
    }

    /// Load from `config_file` if given (it must exist), otherwise from the
    /// default location when present, otherwise defaults.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path));
                }
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::info!("Loading configuration from file: {:?}", path);
                    Self::from_file(&path)?
                }
                None => {
                    tracing::info!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        url::Url::parse(&self.api.base_url)
            .map_err(|e| ConfigError::Invalid(format!("api.base_url: {}", e)))?;
        if self.scanner.fps == 0 {
            return Err(ConfigError::Invalid("scanner.fps must be at least 1".into()));
        }
        if let Some((width, height)) = self.scanner.capture_size()
            && (width == 0 || height == 0)
        {
            return Err(ConfigError::Invalid(
                "scanner.capture_width and capture_height must be non-zero".into(),
            ));
        }
        if self.scanner.symbology_set().is_empty() {
            return Err(ConfigError::Invalid(
                "scanner.symbologies must name at least one symbology".into(),
            ));
        }
        Ok(())
    }
}
