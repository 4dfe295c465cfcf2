//! Test doubles shared by the pipeline and bot tests.

use crate::api::Enricher;
use crate::error::{EnrichError, FetchError};
use crate::history::FileHistory;
use crate::images::ImageSearch;
use crate::pipeline::Pipeline;
use crate::scrapers::PageFetcher;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

pub const PORTAL: &str = "https://portal.example/";
/// A source the stub fetcher always fails on.
pub const BROKEN: &str = "https://broken.example/";

pub struct StubFetcher {
    pages: HashMap<String, String>,
}

impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: reqwest::StatusCode::BAD_GATEWAY,
        })
    }
}

#[derive(Clone, Default)]
pub struct StubImages {
    pub result: Option<String>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl ImageSearch for StubImages {
    async fn search(&self, query: &str) -> Option<String> {
        self.queries.lock().unwrap().push(query.to_string());
        self.result.clone()
    }
}

#[derive(Clone, Default)]
pub struct StubEnricher {
    pub fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl StubEnricher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Enricher for StubEnricher {
    async fn enrich(&self, title: &str, _summary: &str) -> Result<String, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(EnrichError::EmptyContent)
        } else {
            Ok(format!("¡Última hora! {title}"))
        }
    }
}

/// Front page with one `<article>` per `(title, image, href)`.
pub fn page(blocks: &[(&str, Option<&str>, &str)]) -> String {
    let mut html = String::from("<html><body>");
    for (title, img, href) in blocks {
        html.push_str("<article>");
        html.push_str(&format!("<h2>{title}</h2><p>Resumen de {title}</p>"));
        if let Some(src) = img {
            html.push_str(&format!("<img src=\"{src}\">"));
        }
        html.push_str(&format!("<a href=\"{href}\">más</a></article>"));
    }
    html.push_str("</body></html>");
    html
}

pub type TestPipeline = Pipeline<StubFetcher, StubImages, StubEnricher, FileHistory, StdRng>;

/// Pipeline over `pages` (source URL, body) with history at `history_path`.
/// Sources listed as [`BROKEN`] fail to fetch.
pub fn test_pipeline(
    history_path: &Path,
    pages: &[(&str, String)],
    images: StubImages,
    enricher: StubEnricher,
) -> TestPipeline {
    let sources = pages
        .iter()
        .map(|(url, _)| Url::parse(url).unwrap())
        .collect();
    let fetcher = StubFetcher {
        pages: pages
            .iter()
            .filter(|(url, _)| *url != BROKEN)
            .map(|(url, body)| (url.to_string(), body.clone()))
            .collect(),
    };
    Pipeline::new(
        sources,
        fetcher,
        images,
        enricher,
        FileHistory::new(history_path),
        StdRng::seed_from_u64(7),
    )
}
