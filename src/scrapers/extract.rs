//! Generic `<article>` block extraction.
//!
//! Every portal's front page is parsed the same way: each `<article>` element
//! yields a headline from its `h2`s, a teaser from its `p`s, its first image
//! and its first link. Blocks missing any of title, summary or link are
//! dropped, as are opinion pieces.

use crate::models::CandidateArticle;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Headline prefix that marks opinion columns. Matched case-sensitively.
pub const OPINION_MARKER: &str = "Opinión";

/// Animated images are never published.
const ANIMATED_EXTENSION: &str = ".gif";

static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Parse a portal front page into candidate articles.
///
/// # Arguments
///
/// * `html` - Raw page body
/// * `base` - The portal URL the page was fetched from; relative links and
///   images are resolved against it
pub fn extract_articles(html: &str, base: &Url) -> Vec<CandidateArticle> {
    let document = Html::parse_document(html);
    let mut articles = Vec::new();
    let mut blocks = 0usize;

    for block in document.select(&ARTICLE) {
        blocks += 1;
        if let Some(article) = extract_block(block, base) {
            articles.push(article);
        }
    }

    debug!(
        %base,
        blocks,
        kept = articles.len(),
        "Extracted candidate articles"
    );
    articles
}

fn extract_block(block: ElementRef<'_>, base: &Url) -> Option<CandidateArticle> {
    let title = joined_text(block, &HEADING);
    let summary = joined_text(block, &PARAGRAPH);

    if title.is_empty() || summary.is_empty() || title.starts_with(OPINION_MARKER) {
        return None;
    }

    let href = block.select(&LINK).next()?.value().attr("href")?;
    let url = resolve_link(href, base)?;

    let image_url = block
        .select(&IMAGE)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| normalize_image(src, base));

    Some(CandidateArticle {
        title,
        summary,
        image_url,
        url,
        source: base.to_string(),
    })
}

/// Concatenated text of every match, trimmed.
fn joined_text(block: ElementRef<'_>, selector: &Selector) -> String {
    block
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Resolve an article link against the portal URL.
pub fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// Resolve an image `src`, rejecting inline data and animated images.
pub fn normalize_image(src: &str, base: &Url) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") || src.ends_with(ANIMATED_EXTENSION) {
        return None;
    }
    base.join(src).ok().map(|u| u.to_string())
}
