//! HTML image tag rewriter
//!
//! Scans a document once, left to right, and rewrites eligible `<img>`
//! tags to point at the signed image proxy: proxied `src`, responsive
//! `srcset`/`sizes`, a `loading` hint, and a preload descriptor for
//! priority images. Everything outside matched `<img>` spans passes
//! through byte-for-byte.
//!
//! The rewriter is fail-soft: a malformed tag is left untouched, and an
//! internal failure returns the whole document unchanged with a logged
//! diagnostic. Page correctness is never traded for optimization.

pub(crate) mod policy;
pub(crate) mod tag;

use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::error::RewriteError;
use crate::preload::PreloadEntry;
use crate::urlgen::{ResizeMode, UrlGenerator};

use policy::{host_of, DomainPolicy};
use tag::ImgTag;

/// Result of one document pass
#[derive(Debug, Clone)]
pub struct RewriteOutput {
    /// The document with eligible `<img>` tags rewritten
    pub html: String,
    /// Priority images in first-encountered order, for preload hints
    pub preload: Vec<PreloadEntry>,
}

/// Rewrites one HTML document per call
///
/// Built once per request from a [`ProxyConfig`] snapshot. All methods
/// take `&self`; the preload accumulator lives inside each `rewrite`
/// call, so one `Rewriter` never leaks state between documents.
#[derive(Debug, Clone)]
pub struct Rewriter {
    generator: UrlGenerator,
    policy: DomainPolicy,
    proxy_host: Option<String>,
    widths: Vec<u32>,
    enabled: bool,
}

impl Rewriter {
    pub fn new(config: &ProxyConfig) -> Self {
        let generator = UrlGenerator::new(config);
        let proxy_host = generator.proxy_host();
        let entries = config.allowed_domain_list();
        let policy = DomainPolicy::new(&entries, config.site_host());

        Self {
            generator,
            policy,
            proxy_host,
            widths: config.responsive_widths(),
            enabled: config.enabled,
        }
    }

    /// The URL generator backing this rewriter, for preload rendering
    pub fn generator(&self) -> &UrlGenerator {
        &self.generator
    }

    /// Rewrite a document
    ///
    /// Never fails past this boundary: a disabled or unconfigured
    /// rewriter, and any internal error, yield the input unchanged
    /// (with a diagnostic in the error case).
    pub fn rewrite(&self, html: &str) -> RewriteOutput {
        if !self.enabled || !self.generator.is_configured() {
            return RewriteOutput {
                html: html.to_string(),
                preload: Vec::new(),
            };
        }

        match self.rewrite_document(html) {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "image rewrite failed, returning document unchanged");
                RewriteOutput {
                    html: html.to_string(),
                    preload: Vec::new(),
                }
            }
        }
    }

    fn rewrite_document(&self, html: &str) -> Result<RewriteOutput, RewriteError> {
        let mut out = String::with_capacity(html.len() + html.len() / 8);
        let mut preload = Vec::new();
        let mut copied = 0; // document prefix already emitted
        let mut cursor = 0; // scan position

        while let Some(start) = tag::find_img_start(html, cursor) {
            if start < cursor {
                return Err(RewriteError::internal("document scan moved backwards"));
            }

            let (mut img, end) = match ImgTag::parse_at(html, start) {
                Some(parsed) => parsed,
                None => {
                    // Unclosed span: leave it untouched, resume after the opener
                    let err = RewriteError::malformed_tag(start, "unclosed <img> span");
                    debug!(error = %err, "skipping malformed image tag");
                    cursor = start + 4;
                    continue;
                }
            };

            if self.process_tag(&mut img, &mut preload) {
                out.push_str(&html[copied..start]);
                out.push_str(&img.to_html());
                copied = end;
            }
            cursor = end;
        }

        out.push_str(&html[copied..]);

        Ok(RewriteOutput { html: out, preload })
    }

    /// Mutate one parsed tag; returns false when the tag is ineligible
    /// and its original bytes should pass through
    fn process_tag(&self, img: &mut ImgTag, preload: &mut Vec<PreloadEntry>) -> bool {
        let src = match img.get("src") {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => return false,
        };

        // Already proxied: rewriting twice must be a no-op
        if let (Some(proxy_host), Some(src_host)) = (&self.proxy_host, host_of(&src)) {
            if *proxy_host == src_host {
                return false;
            }
        }

        if src
            .get(..5)
            .map(|p| p.eq_ignore_ascii_case("data:"))
            .unwrap_or(false)
        {
            return false;
        }

        if !self.policy.permits(&src) {
            return false;
        }

        let width = parse_dimension(img.get("width"));
        let height = parse_dimension(img.get("height"));
        let is_priority = is_priority_image(img);

        // Height is always left to the proxy; a declared width (or any
        // declared dimension) constrains the primary candidate
        let new_src = if width > 0 || height > 0 {
            self.generator.generate(&src, width, 0, ResizeMode::Fit)
        } else {
            self.generator.generate(&src, 0, 0, ResizeMode::Fit)
        };
        img.set("src", &new_src);

        if width > 0 {
            let srcset = self.generator.generate_srcset(&src, &self.widths, width);
            if !srcset.is_empty() {
                img.set("srcset", &srcset);
                if !img.has("sizes") {
                    img.set(
                        "sizes",
                        &format!("(max-width: {}px) 100vw, {}px", width, width),
                    );
                }
            }
        }

        // Never override an explicit author value
        if !img.has("loading") {
            img.set("loading", if is_priority { "eager" } else { "lazy" });
        }

        if is_priority {
            preload.push(PreloadEntry {
                url: new_src,
                width,
                height,
            });
        }

        debug!(source = %src, width, height, priority = is_priority, "rewrote image tag");

        true
    }
}

/// Parse a width/height attribute; absent or non-numeric means 0
fn parse_dimension(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

/// Explicit markup signals that an image is above the fold
fn is_priority_image(img: &ImgTag) -> bool {
    if matches!(img.get("fetchpriority"), Some(v) if v.eq_ignore_ascii_case("high")) {
        return true;
    }

    if matches!(img.get("loading"), Some(v) if v.eq_ignore_ascii_case("eager")) {
        return true;
    }

    match img.get("class") {
        Some(class) => class.contains("priority") || class.contains("hero"),
        None => false,
    }
}
