//! Product image download.
//!
//! Only HTTPS URLs on the configured hosts are fetched, and every redirect hop
//! is held to the same rule. Everything else falls back to the "no image"
//! placeholder in the UI.

use std::time::Duration;

use url::Url;

use crate::config::ImageConfig;
use crate::error::ImageError;

const MAX_REDIRECTS: usize = 5;

/// RGBA8 pixels ready for the UI.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub struct ImageFetcher {
    client: reqwest::Client,
    allowed_hosts: Vec<String>,
    max_bytes: usize,
}

/// True when `url` is HTTPS on one of `allowed_hosts` (exact match).
pub fn is_allowed(url: &Url, allowed_hosts: &[String]) -> bool {
    url.scheme() == "https"
        && url
            .host_str()
            .is_some_and(|host| allowed_hosts.iter().any(|a| a.eq_ignore_ascii_case(host)))
}

fn redirect_policy(allowed_hosts: Vec<String>) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if is_allowed(attempt.url(), &allowed_hosts) {
            attempt.follow()
        } else {
            tracing::warn!(url = %attempt.url(), "image redirect leaves the allowed hosts");
            attempt.stop()
        }
    })
}

impl ImageFetcher {
    pub fn new(config: &ImageConfig, user_agent: &str, timeout: Duration) -> Result<Self, ImageError> {
        let allowed_hosts: Vec<String> = config
            .allowed_hosts
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(redirect_policy(allowed_hosts.clone()))
            .build()?;
        Ok(Self {
            client,
            allowed_hosts,
            max_bytes: config.max_bytes,
        })
    }

    /// Parse `raw` and make sure it points at an allowed host over HTTPS.
    pub fn check_url(&self, raw: &str) -> Result<Url, ImageError> {
        let url = Url::parse(raw).map_err(|e| ImageError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if url.scheme() != "https" {
            return Err(ImageError::InvalidUrl(format!("{} is not https", raw)));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ImageError::InvalidUrl(format!("{} has no host", raw)))?
            .to_lowercase();
        if !is_allowed(&url, &self.allowed_hosts) {
            return Err(ImageError::HostNotAllowed(host));
        }
        Ok(url)
    }

    pub async fn fetch(&self, raw: &str) -> Result<DecodedImage, ImageError> {
        let url = self.check_url(raw)?;
        tracing::debug!(%url, "fetching product image");
        let bytes = self.download(url).await?;
        decode(&bytes, self.max_bytes)
    }

    /// GET `url` and read the body, stopping once it exceeds `max_bytes`.
    async fn download(&self, url: Url) -> Result<Vec<u8>, ImageError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Err(ImageError::RedirectNotAllowed(location));
        }
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }
        if let Some(len) = response.content_length() {
            let len = len as usize;
            if len > self.max_bytes {
                return Err(ImageError::TooLarge {
                    size: len,
                    max: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let size = body.len() + chunk.len();
            if size > self.max_bytes {
                return Err(ImageError::TooLarge {
                    size,
                    max: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Decode JPEG/PNG/GIF/WebP bytes into RGBA8.
pub fn decode(bytes: &[u8], max_bytes: usize) -> Result<DecodedImage, ImageError> {
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge {
            size: bytes.len(),
            max: max_bytes,
        });
    }
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
