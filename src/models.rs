//! Data models for scraped and enriched articles.
//!
//! - [`CandidateArticle`]: one `<article>` block that passed extraction filters
//! - [`EnrichedArticle`]: the selected candidate plus its generated narrative
//! - [`Selection`]: the non-error outcome of a pipeline run

use serde::Serialize;

/// A news item scraped from a portal's front page.
///
/// Candidates only live for a single pipeline run. `url` is absolute and is
/// the identifier used for deduplication against the published record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateArticle {
    /// Trimmed headline, never empty.
    pub title: String,
    /// Trimmed teaser text, never empty.
    pub summary: String,
    /// Absolute image URL, if the block carried a usable one.
    pub image_url: Option<String>,
    /// Absolute article URL.
    pub url: String,
    /// The portal this candidate was scraped from.
    pub source: String,
}

/// A selected candidate, ready to hand to the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedArticle {
    pub title: String,
    pub summary: String,
    /// Image from the page, or from image search when the page had none.
    pub image_url: Option<String>,
    pub url: String,
    pub source: String,
    /// Sensationalized narrative produced by the completion service.
    pub detailed_description: String,
}

impl EnrichedArticle {
    pub fn new(candidate: CandidateArticle, detailed_description: String) -> Self {
        Self {
            title: candidate.title,
            summary: candidate.summary,
            image_url: candidate.image_url,
            url: candidate.url,
            source: candidate.source,
            detailed_description,
        }
    }
}

/// Result of a pipeline run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A new article was picked, enriched and recorded.
    Published(EnrichedArticle),
    /// Every scraped candidate was already published (or nothing was scraped).
    NothingNew,
}
