//! Preload hint rendering
//!
//! Priority images collected during a rewrite pass become
//! `<link rel="preload" as="image">` hints for the document head.
//! The list is request-scoped: it is produced by one `rewrite` call,
//! consumed once here, and discarded.

use crate::rewriter::tag::escape_attribute;
use crate::urlgen::UrlGenerator;

/// Candidate widths for the reduced preload srcset. Preloading every
/// responsive width would waste bandwidth; three steps are enough for
/// the browser to pick a sane above-the-fold candidate.
const PRELOAD_WIDTHS: [u32; 3] = [320, 640, 1024];

/// One priority image discovered during a rewrite pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadEntry {
    /// The rewritten (proxied) src of the image
    pub url: String,
    /// Declared width attribute, 0 when unspecified
    pub width: u32,
    /// Declared height attribute, 0 when unspecified
    pub height: u32,
}

/// Render preload `<link>` hints for the document head, in entry order
///
/// Entries with a known width also get an `imagesrcset` built from the
/// candidate widths at or below that width (falling back to the width
/// itself) and a matching `imagesizes`.
pub fn render_preload_links(entries: &[PreloadEntry], generator: &UrlGenerator) -> String {
    let mut out = String::new();

    for entry in entries {
        out.push_str("<link rel=\"preload\" as=\"image\" href=\"");
        out.push_str(&escape_attribute(&entry.url));
        out.push('"');

        if entry.width > 0 {
            let mut widths: Vec<u32> = PRELOAD_WIDTHS
                .iter()
                .copied()
                .filter(|w| *w <= entry.width)
                .collect();
            if widths.is_empty() {
                widths.push(entry.width);
            }

            let srcset = generator.generate_srcset(&entry.url, &widths, entry.width);
            if !srcset.is_empty() {
                out.push_str(" imagesrcset=\"");
                out.push_str(&escape_attribute(&srcset));
                out.push('"');
            }

            out.push_str(&format!(
                " imagesizes=\"(max-width: {}px) 100vw, {}px\"",
                entry.width, entry.width
            ));
        }

        out.push_str(">\n");
    }

    out
}

/// DNS prefetch hint for the proxy host, emitted once per document head
///
/// Returns `None` when the base URL carries no parseable host.
pub fn dns_prefetch_link(base_url: &str) -> Option<String> {
    let host = crate::rewriter::policy::host_of(base_url)?;
    Some(format!(
        "<link rel=\"dns-prefetch\" href=\"//{}\">",
        escape_attribute(&host)
    ))
}
