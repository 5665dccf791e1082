use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Transport failure, non-2xx status, or an unreadable body.
    #[error("Failed to fetch product data: {0}")]
    Network(String),

    #[error("Product with barcode {barcode} not found or has no data. Status: {status_verbose}")]
    NotFound {
        barcode: String,
        status_verbose: String,
    },
}

impl From<reqwest::Error> for LookupError {
    fn from(value: reqwest::Error) -> Self {
        LookupError::Network(value.to_string())
    }
}

/// Why the camera could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFault {
    PermissionDenied,
    DeviceNotFound,
}

impl fmt::Display for CameraFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraFault::PermissionDenied => write!(f, "camera permission denied"),
            CameraFault::DeviceNotFound => write!(f, "camera not found"),
        }
    }
}

/// Errors reported by a camera decoder implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoderFault {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("requested device not found: {0}")]
    DeviceNotFound(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error(
        "Camera permission denied or camera not found ({0}). Please allow camera access and ensure a camera is connected."
    )]
    CameraUnavailable(CameraFault),

    #[error("Failed to start scanner: {0}")]
    Start(String),
}

impl ScanError {
    pub fn is_camera_unavailable(&self) -> bool {
        matches!(self, ScanError::CameraUnavailable(_))
    }
}

impl From<DecoderFault> for ScanError {
    fn from(value: DecoderFault) -> Self {
        match value {
            DecoderFault::PermissionDenied(_) => {
                ScanError::CameraUnavailable(CameraFault::PermissionDenied)
            }
            DecoderFault::DeviceNotFound(_) => {
                ScanError::CameraUnavailable(CameraFault::DeviceNotFound)
            }
            DecoderFault::Other(msg) => ScanError::Start(msg),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Image request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Image redirect to a host that is not allowed: {0}")]
    RedirectNotAllowed(String),

    #[error("Image request returned HTTP {0}")]
    Status(u16),

    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures while assembling application state.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Invalid keyword: {0}")]
    Keyword(#[from] regex::Error),

    #[error("Failed to create API client: {0}")]
    Client(#[from] LookupError),

    #[error("Failed to create image client: {0}")]
    Images(#[from] ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_echoes_barcode() {
        let err = LookupError::NotFound {
            barcode: "000000000000".into(),
            status_verbose: "product not found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("000000000000"));
        assert!(msg.contains("product not found"));
    }

    #[test]
    fn test_decoder_fault_classification() {
        assert!(ScanError::from(DecoderFault::PermissionDenied("x".into())).is_camera_unavailable());
        assert!(ScanError::from(DecoderFault::DeviceNotFound("x".into())).is_camera_unavailable());
        assert_eq!(
            ScanError::from(DecoderFault::Other("boom".into())),
            ScanError::Start("boom".into())
        );
    }
}
