use crate::decode::{Bitmap, BitmapDecoder, DecodeError, DecodeRequest};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub timeout_secs: u64,
    pub max_bytes: u64,
    pub user_agent: String,
    /// Origin we read pixels on behalf of. When set, remote images must opt in to
    /// cross-origin reads via `Access-Control-Allow-Origin`.
    pub origin: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 8,
            max_bytes: 5 * 1024 * 1024,
            user_agent: concat!("accent-gradient/", env!("CARGO_PKG_VERSION")).to_string(),
            origin: None,
        }
    }
}

/// Decodes images from `http(s)://`, `data:` and `file://` URLs or plain paths.
///
/// Network and disk reads are blocking, so they run on tokio's blocking pool.
#[derive(Clone)]
pub struct RemoteDecoder {
    options: FetchOptions,
    agent: ureq::Agent,
}

impl RemoteDecoder {
    pub fn new(options: FetchOptions) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(options.timeout_secs.max(1)))
            .build();
        Self { options, agent }
    }

    fn fetch_bytes(&self, url: &str, request: DecodeRequest) -> Result<Vec<u8>, DecodeError> {
        match Source::parse(url) {
            Source::Http(url) => self.fetch_http(&url, request),
            Source::Data(payload) => decode_data_url(&payload, self.options.max_bytes),
            Source::File(path) => read_file(&path, self.options.max_bytes),
        }
    }

    fn fetch_http(&self, url: &str, request: DecodeRequest) -> Result<Vec<u8>, DecodeError> {
        log::debug!("fetching image {url}");
        let mut req = self.agent.get(url).set("User-Agent", &self.options.user_agent);
        let origin = self.options.origin.as_deref().filter(|_| request.allow_cross_origin);
        if let Some(origin) = origin {
            req = req.set("Origin", origin);
        }

        let resp = req.call().map_err(|e| DecodeError::Network(e.to_string()))?;
        if resp.status() != 200 {
            return Err(DecodeError::Network(format!("{url} answered {}", resp.status())));
        }

        if let Some(origin) = origin {
            let allowed = resp.header("Access-Control-Allow-Origin").map(str::trim);
            if !matches!(allowed, Some(a) if a == "*" || a == origin) {
                return Err(DecodeError::CrossOrigin(url.to_string()));
            }
        }

        if let Some(len) = resp.header("Content-Length") {
            if let Ok(n) = len.trim().parse::<u64>() {
                if n > self.options.max_bytes {
                    return Err(DecodeError::TooLarge {
                        limit: self.options.max_bytes,
                    });
                }
            }
        }

        read_capped(resp.into_reader(), self.options.max_bytes, url)
    }
}

impl Default for RemoteDecoder {
    fn default() -> Self {
        Self::new(FetchOptions::default())
    }
}

#[async_trait]
impl BitmapDecoder for RemoteDecoder {
    async fn decode(&self, url: &str, request: DecodeRequest) -> Result<Bitmap, DecodeError> {
        let this = self.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || {
            let bytes = this.fetch_bytes(&url, request)?;
            bitmap_from_bytes(&bytes)
        })
        .await
        .map_err(|e| DecodeError::Network(format!("decode worker failed: {e}")))?
    }
}

/// Decodes any format the `image` crate understands into RGBA8.
pub fn bitmap_from_bytes(bytes: &[u8]) -> Result<Bitmap, DecodeError> {
    let img = image::load_from_memory(bytes).map_err(|e| DecodeError::Format(e.to_string()))?;
    Ok(Bitmap::from_rgba_image(img.to_rgba8()))
}

#[derive(Debug, PartialEq, Eq)]
enum Source {
    Http(String),
    /// Everything after `data:`.
    Data(String),
    File(PathBuf),
}

impl Source {
    fn parse(url: &str) -> Self {
        let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Http(url.to_string())
        } else if lower.starts_with("data:") {
            Source::Data(url[5..].to_string())
        } else if lower.starts_with("file://") {
            Source::File(PathBuf::from(&url[7..]))
        } else {
            Source::File(PathBuf::from(url))
        }
    }
}

fn decode_data_url(payload: &str, max_bytes: u64) -> Result<Vec<u8>, DecodeError> {
    let Some((meta, data)) = payload.split_once(',') else {
        return Err(DecodeError::Format("data URL without payload".to_string()));
    };
    if !meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(DecodeError::Format("only base64 data URLs carry image bytes".to_string()));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| DecodeError::Format(format!("bad base64 payload: {e}")))?;
    if bytes.len() as u64 > max_bytes {
        return Err(DecodeError::TooLarge { limit: max_bytes });
    }
    Ok(bytes)
}

fn read_file(path: &Path, max_bytes: u64) -> Result<Vec<u8>, DecodeError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| DecodeError::Network(format!("{label}: {e}")))?;
    read_capped(file, max_bytes, &label)
}

/// Reads at most `max_bytes`, failing if the source holds more.
fn read_capped<R: Read>(reader: R, max_bytes: u64, label: &str) -> Result<Vec<u8>, DecodeError> {
    let mut bytes = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| DecodeError::Network(format!("{label}: {e}")))?;
    if bytes.len() as u64 > max_bytes {
        return Err(DecodeError::TooLarge { limit: max_bytes });
    }
    if bytes.is_empty() {
        return Err(DecodeError::Format(format!("{label}: empty image")));
    }
    Ok(bytes)
}
