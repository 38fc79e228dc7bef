//! Page fetching and per-source-kind document extraction.
//!
//! This crate provides:
//! - [`Fetcher`] — HTTP client with bounded linear retry and a PDF
//!   content-type gate
//! - [`extract`] — Source-kind-specific extractors turning raw HTML into
//!   candidate [`parlwatch_shared::Document`]s

pub mod extract;
pub mod fetcher;

pub use extract::Extractor;
pub use fetcher::Fetcher;
