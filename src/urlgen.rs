//! Signed proxy URL generation
//!
//! Builds imgproxy-style URLs of the form:
//!
//! ```text
//! {base_url}/{signature}/rt:{mode}/w:{width}/h:{height}/q:{quality}/f:{format}/{source}
//! ```
//!
//! Two source encodings are supported:
//! 1. Base64: `<options>/<base64url(source)>/<filename>.<format>`
//! 2. Plain: `<options>/plain/<source with spaces as %20>`
//!
//! Generation is pure string/byte manipulation: no network calls, no
//! shared state, deterministic for identical inputs. An unconfigured
//! generator returns every source URL unchanged.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ProxyConfig;
use crate::error::RewriteError;
use crate::signature::{decode_hex_secret, sign_path};

/// Output image format requested from the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Avif,
    WebP,
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::WebP => "webp",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = RewriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "avif" => Ok(OutputFormat::Avif),
            "webp" => Ok(OutputFormat::WebP),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            _ => Err(RewriteError::config(format!("unknown format: {}", s))),
        }
    }
}

/// How the proxy fits the image into the requested dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Scale to fit within dimensions, preserving aspect ratio (default)
    #[default]
    Fit,
    /// Scale to fill dimensions, cropping the overflow
    Fill,
    /// Crop without scaling
    Crop,
    /// Stretch to fill exactly (may distort)
    Force,
}

impl ResizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Fill => "fill",
            Self::Crop => "crop",
            Self::Force => "force",
        }
    }
}

impl FromStr for ResizeMode {
    type Err = RewriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fit" => Ok(ResizeMode::Fit),
            "fill" => Ok(ResizeMode::Fill),
            "crop" => Ok(ResizeMode::Crop),
            "force" => Ok(ResizeMode::Force),
            _ => Err(RewriteError::config(format!("unknown resize mode: {}", s))),
        }
    }
}

/// Parse a comma- (or whitespace-) delimited width list
///
/// Entries are trimmed and parsed as positive integers; anything else
/// is dropped. Order is preserved.
pub fn parse_width_list(list: &str) -> Vec<u32> {
    list.split(',')
        .map(str::trim)
        .filter_map(|entry| entry.parse::<u32>().ok())
        .filter(|w| *w > 0)
        .collect()
}

/// Generates signed proxy URLs from one configuration snapshot
///
/// Constructed once per request from a [`ProxyConfig`]; the hex secrets
/// are decoded at construction so per-URL work is a single HMAC.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    base_url: String,
    key: Vec<u8>,
    salt: Vec<u8>,
    configured: bool,
    quality: u8,
    format: OutputFormat,
    use_base64: bool,
}

impl UrlGenerator {
    pub fn new(config: &ProxyConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let configured =
            !base_url.is_empty() && !config.key.trim().is_empty() && !config.salt.trim().is_empty();

        Self {
            base_url,
            key: decode_hex_secret(&config.key),
            salt: decode_hex_secret(&config.salt),
            configured,
            quality: config.quality,
            format: config.format,
            use_base64: config.use_base64,
        }
    }

    /// Whether base URL, key and salt are all present
    ///
    /// An unconfigured generator is a silent identity function, not an
    /// error: pages keep rendering with their original image URLs.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Host of the configured proxy base URL, lowercased
    pub fn proxy_host(&self) -> Option<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// Generate a signed proxy URL for one source image
    ///
    /// `width`/`height` of 0 mean "no constraint on that axis" and are
    /// emitted literally as `w:0`/`h:0` (the proxy interprets 0 as auto).
    pub fn generate(&self, source_url: &str, width: u32, height: u32, mode: ResizeMode) -> String {
        if !self.configured {
            return source_url.to_string();
        }

        let options = format!(
            "/rt:{}/w:{}/h:{}/q:{}/f:{}",
            mode.as_str(),
            width,
            height,
            self.quality,
            self.format.as_str()
        );

        let path = if self.use_base64 {
            let filename = source_filename(source_url);
            let encoded = URL_SAFE_NO_PAD.encode(source_url.as_bytes());
            format!("{}/{}/{}.{}", options, encoded, filename, self.format.as_str())
        } else {
            // Spaces must be pre-encoded so the signature covers exactly
            // the bytes the proxy sees after its own URL decoding.
            let encoded = source_url.replace(' ', "%20");
            format!("{}/plain/{}", options, encoded)
        };

        let signature = sign_path(&self.key, &self.salt, &path);

        format!("{}/{}{}", self.base_url, signature, path)
    }

    /// Build a `srcset` attribute value for the given candidate widths
    ///
    /// Widths larger than a known `original_width` are dropped — the
    /// proxy must never be asked to upscale beyond the declared
    /// intrinsic size. Pass `original_width = 0` when unknown. An empty
    /// result is valid and means "no responsive candidates".
    pub fn generate_srcset(&self, source_url: &str, widths: &[u32], original_width: u32) -> String {
        let mut parts = Vec::with_capacity(widths.len());

        for &width in widths {
            if width == 0 {
                continue;
            }
            if original_width > 0 && width > original_width {
                continue;
            }

            let candidate = self.generate(source_url, width, 0, ResizeMode::Fit);
            parts.push(format!("{} {}w", candidate, width));
        }

        parts.join(", ")
    }
}

/// Derive the display filename embedded in base64-mode URLs
///
/// Takes the extension-stripped last segment of the URL path, or the
/// literal `image` when none can be determined.
fn source_filename(source_url: &str) -> String {
    let path_owned;
    let path: &str = match Url::parse(source_url) {
        Ok(url) => {
            path_owned = url.path().to_string();
            &path_owned
        }
        // Relative URL: strip query and fragment by hand
        Err(_) => {
            let end = source_url
                .find(|c| c == '?' || c == '#')
                .unwrap_or(source_url.len());
            &source_url[..end]
        }
    };

    let segment = match path.rsplit('/').find(|s| !s.is_empty()) {
        Some(s) => s,
        None => return "image".to_string(),
    };

    let stem = match segment.rfind('.') {
        Some(idx) => &segment[..idx],
        None => segment,
    };

    if stem.is_empty() {
        "image".to_string()
    } else {
        stem.to_string()
    }
}
