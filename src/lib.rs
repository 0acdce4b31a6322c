// Imgweave - HTML image rewriting through a signed transformation proxy
//
// Two components: a signed URL generator (pure string/byte work) and an
// HTML <img> tag rewriter built on top of it. Both are constructed per
// request from a ProxyConfig snapshot; nothing in this crate holds
// process-wide mutable state.

pub mod config;
pub mod error;
pub mod preload;
pub mod rewriter;
pub mod signature;
pub mod urlgen;

pub use config::ProxyConfig;
pub use error::RewriteError;
pub use preload::{dns_prefetch_link, render_preload_links, PreloadEntry};
pub use rewriter::{RewriteOutput, Rewriter};
pub use urlgen::{OutputFormat, ResizeMode, UrlGenerator};
