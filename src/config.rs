// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::urlgen::{parse_width_list, OutputFormat};

/// Immutable per-request configuration snapshot
///
/// Mirrors the persisted settings store one-to-one: secrets are hex
/// strings, width and allow lists keep their delimited string form, and
/// typed accessors produce the parsed views. Each document rewrite
/// receives its own snapshot; nothing here is shared mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the image proxy (e.g. "https://px.example.com")
    #[serde(default)]
    pub base_url: String,

    /// Hex-encoded HMAC signing key shared with the proxy
    #[serde(default)]
    pub key: String,

    /// Hex-encoded signature salt shared with the proxy
    #[serde(default)]
    pub salt: String,

    /// Output quality for lossy formats, 1-100 (default: 65)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Output format requested from the proxy (default: avif)
    #[serde(default)]
    pub format: OutputFormat,

    /// Comma-separated responsive srcset widths
    #[serde(default = "default_widths")]
    pub widths: String,

    /// Newline-separated hostname allow-list; entries may contain `*`
    /// wildcards. Empty means "same site only".
    #[serde(default)]
    pub allowed_domains: String,

    /// URL of the hosting site; its host drives the same-site rule
    #[serde(default)]
    pub site_url: String,

    /// Global switch; a disabled config leaves documents untouched
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Encode source URLs as base64 path segments instead of `plain/`
    #[serde(default = "default_true")]
    pub use_base64: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            key: String::new(),
            salt: String::new(),
            quality: default_quality(),
            format: OutputFormat::default(),
            widths: default_widths(),
            allowed_domains: String::new(),
            site_url: String::new(),
            enabled: true,
            use_base64: true,
        }
    }
}

fn default_quality() -> u8 {
    65
}

fn default_widths() -> String {
    "320,640,768,1024,1280,1920".to_string()
}

fn default_true() -> bool {
    true
}

impl ProxyConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values so key
        // and salt never have to live in the config file itself
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap() // Safe because we checked above
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.quality < 1 || self.quality > 100 {
            return Err("Quality must be between 1 and 100".to_string());
        }

        if !self.key.trim().is_empty() && hex::decode(self.key.trim()).is_err() {
            return Err("Signing key is not valid hex".to_string());
        }

        if !self.salt.trim().is_empty() && hex::decode(self.salt.trim()).is_err() {
            return Err("Signing salt is not valid hex".to_string());
        }

        if !self.base_url.is_empty() {
            let parsed = Url::parse(&self.base_url)
                .map_err(|e| format!("Proxy base URL '{}' is invalid: {}", self.base_url, e))?;
            if parsed.host_str().is_none() {
                return Err(format!("Proxy base URL '{}' has no host", self.base_url));
            }
        }

        for entry in self.widths.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let width: i64 = entry
                .parse()
                .map_err(|_| format!("Width entry '{}' is not a number", entry))?;
            if width <= 0 {
                return Err(format!("Width entry '{}' must be positive", entry));
            }
        }

        Ok(())
    }

    /// Parsed responsive widths, in configured order
    pub fn responsive_widths(&self) -> Vec<u32> {
        parse_width_list(&self.widths)
    }

    /// Allow-list entries: one hostname pattern per line, trimmed,
    /// blank lines dropped
    pub fn allowed_domain_list(&self) -> Vec<&str> {
        self.allowed_domains
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Host of the hosting site, lowercased, for the same-site rule
    pub fn site_host(&self) -> Option<String> {
        Url::parse(&self.site_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}
