//! Front-page scraping for the configured news portals.
//!
//! Scraping is split in two steps that every portal shares:
//!
//! 1. **Fetching** ([`fetch`]): download the portal's front page as text
//! 2. **Extraction** ([`extract`]): turn `<article>` blocks into
//!    [`CandidateArticle`](crate::models::CandidateArticle)s
//!
//! There are no per-portal selectors; the same heuristic runs on every page.

pub mod extract;
pub mod fetch;

pub use extract::extract_articles;
pub use fetch::{HttpFetcher, PageFetcher};
