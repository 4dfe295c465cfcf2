//! The article selection pipeline.
//!
//! One call to [`Pipeline::run`] walks a single pass of:
//!
//! 1. **Gather**: fetch every source in order and extract its candidates.
//!    A source that fails to fetch contributes nothing and the walk goes on.
//! 2. **Filter**: drop candidates whose URL is already in the history.
//! 3. **Select**: pick one remaining candidate uniformly at random.
//! 4. **Backfill**: search for an image if the candidate has none.
//! 5. **Enrich**: generate the long description. Failure aborts the run.
//! 6. **Record**: add the URL to the history and persist it.
//!
//! The pipeline holds no lock of its own. Callers that can trigger it from
//! several places must run it one invocation at a time, otherwise two runs
//! can read the same history and publish the same story.

use crate::api::Enricher;
use crate::error::PipelineError;
use crate::history::HistoryStore;
use crate::images::ImageSearch;
use crate::models::{CandidateArticle, EnrichedArticle, Selection};
use crate::scrapers::{PageFetcher, extract_articles};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use rand::Rng;
use tracing::{error, info, instrument, warn};
use url::Url;

pub struct Pipeline<F, S, E, H, R> {
    sources: Vec<Url>,
    fetcher: F,
    images: S,
    enricher: E,
    history: H,
    rng: R,
}

impl<F, S, E, H, R> Pipeline<F, S, E, H, R>
where
    F: PageFetcher,
    S: ImageSearch,
    E: Enricher,
    H: HistoryStore,
    R: Rng,
{
    pub fn new(sources: Vec<Url>, fetcher: F, images: S, enricher: E, history: H, rng: R) -> Self {
        Self {
            sources,
            fetcher,
            images,
            enricher,
            history,
            rng,
        }
    }

    /// Run one selection pass.
    ///
    /// # Returns
    ///
    /// * `Ok(Selection::Published(_))` - a new article, already recorded in history
    /// * `Ok(Selection::NothingNew)` - every candidate was published before
    ///
    /// # Errors
    ///
    /// Enrichment and history persistence failures. History is left untouched
    /// when enrichment fails.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn run(&mut self) -> Result<Selection, PipelineError> {
        let candidates = self.gather().await;

        let mut history = self.history.load().await?;
        let total = candidates.len();
        let mut fresh: Vec<CandidateArticle> = candidates
            .into_iter()
            .filter(|c| !history.contains(&c.url))
            .collect();
        info!(
            total,
            previously_sent = history.len(),
            new = fresh.len(),
            "Filtered candidates against history"
        );

        if fresh.is_empty() {
            return Ok(Selection::NothingNew);
        }

        let index = self.rng.random_range(0..fresh.len());
        let mut chosen = fresh.swap_remove(index);
        info!(title = %chosen.title, url = %chosen.url, "Selected article");

        if chosen.image_url.is_none() {
            chosen.image_url = self.images.search(&chosen.title).await;
        }

        let description = match self.enricher.enrich(&chosen.title, &chosen.summary).await {
            Ok(text) => text,
            Err(e) => {
                error!(url = %chosen.url, error = %e, "Enrichment failed; history left unchanged");
                return Err(e.into());
            }
        };

        history.insert(chosen.url.clone());
        self.history.save(&history).await?;
        info!(url = %chosen.url, recorded = history.len(), "Recorded article as sent");

        Ok(Selection::Published(EnrichedArticle::new(chosen, description)))
    }

    /// Fetch and extract every source in order, skipping the ones that fail.
    async fn gather(&self) -> Vec<CandidateArticle> {
        let fetcher = &self.fetcher;
        let batches: Vec<Vec<CandidateArticle>> = stream::iter(self.sources.iter())
            .then(|source| async move {
                info!(%source, "Fetching news");
                match fetcher.fetch(source.as_str()).await {
                    Ok(html) => extract_articles(&html, source),
                    Err(e) => {
                        warn!(%source, error = %e, "Source fetch failed; skipping");
                        Vec::new()
                    }
                }
            })
            .collect()
            .await;

        let candidates: Vec<CandidateArticle> = batches
            .into_iter()
            .flatten()
            .unique_by(|c| c.url.clone())
            .collect();
        info!(count = candidates.len(), "Total news articles fetched");
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use crate::history::{FileHistory, History};
    use crate::test_utils::{
        BROKEN, PORTAL, StubEnricher, StubImages, TestPipeline, page, test_pipeline,
    };
    use tempfile::TempDir;

    fn pipeline(
        dir: &TempDir,
        pages: &[(&str, String)],
        images: StubImages,
        enricher: StubEnricher,
    ) -> TestPipeline {
        test_pipeline(&dir.path().join("sent_news.txt"), pages, images, enricher)
    }

    async fn stored(dir: &TempDir) -> History {
        FileHistory::new(dir.path().join("sent_news.txt"))
            .load()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_publishes_single_article_and_records_it() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(PORTAL, page(&[("Noticia", Some("/foto.jpg"), "/n/1.html")]))];
        let images = StubImages::default();
        let mut p = pipeline(&dir, &pages, images.clone(), StubEnricher::default());

        let article = match p.run().await.unwrap() {
            Selection::Published(a) => a,
            Selection::NothingNew => panic!("expected an article"),
        };

        assert_eq!(article.title, "Noticia");
        assert_eq!(article.summary, "Resumen de Noticia");
        assert_eq!(article.url, "https://portal.example/n/1.html");
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://portal.example/foto.jpg")
        );
        assert_eq!(article.detailed_description, "¡Última hora! Noticia");
        assert!(images.queries.lock().unwrap().is_empty());

        assert!(stored(&dir).await.contains("https://portal.example/n/1.html"));
    }

    #[tokio::test]
    async fn test_second_run_without_new_content_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(
            PORTAL,
            page(&[("A", None, "/a.html"), ("B", None, "/b.html")]),
        )];
        let mut p = pipeline(&dir, &pages, StubImages::default(), StubEnricher::default());

        let mut urls = Vec::new();
        for _ in 0..2 {
            match p.run().await.unwrap() {
                Selection::Published(a) => urls.push(a.url),
                Selection::NothingNew => panic!("two candidates should yield two runs"),
            }
        }
        urls.sort();
        assert_eq!(
            urls,
            vec!["https://portal.example/a.html", "https://portal.example/b.html"]
        );

        assert_eq!(p.run().await.unwrap(), Selection::NothingNew);
        assert_eq!(stored(&dir).await.len(), 2);
    }

    #[tokio::test]
    async fn test_already_sent_candidate_leaves_history_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent_news.txt");
        std::fs::write(&path, "https://portal.example/viejo.html\n").unwrap();

        let pages = [(PORTAL, page(&[("Viejo", None, "/viejo.html")]))];
        let mut p = pipeline(&dir, &pages, StubImages::default(), StubEnricher::default());

        assert_eq!(p.run().await.unwrap(), Selection::NothingNew);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "https://portal.example/viejo.html\n"
        );
    }

    #[tokio::test]
    async fn test_missing_image_is_backfilled_from_search() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(PORTAL, page(&[("Sin foto", Some("/spinner.gif"), "/s.html")]))];
        let images = StubImages {
            result: Some("https://images.unsplash.com/photo?w=400".to_string()),
            ..Default::default()
        };
        let mut p = pipeline(&dir, &pages, images.clone(), StubEnricher::default());

        let Selection::Published(article) = p.run().await.unwrap() else {
            panic!("expected an article");
        };
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://images.unsplash.com/photo?w=400")
        );
        assert_eq!(*images.queries.lock().unwrap(), vec!["Sin foto".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_image_search_ships_without_image() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(PORTAL, page(&[("Sin foto", None, "/s.html")]))];
        let mut p = pipeline(&dir, &pages, StubImages::default(), StubEnricher::default());

        let Selection::Published(article) = p.run().await.unwrap() else {
            panic!("expected an article");
        };
        assert_eq!(article.image_url, None);
        assert!(stored(&dir).await.contains("https://portal.example/s.html"));
    }

    #[tokio::test]
    async fn test_enrichment_failure_does_not_record() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(PORTAL, page(&[("Noticia", None, "/n.html")]))];
        let mut p = pipeline(&dir, &pages, StubImages::default(), StubEnricher::failing());

        let err = p.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Enrichment(_)));
        assert!(!dir.path().join("sent_news.txt").exists());
        assert!(stored(&dir).await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_source_does_not_blank_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [
            (BROKEN, String::new()),
            (PORTAL, page(&[("Superviviente", None, "/ok.html")])),
        ];
        let mut p = pipeline(&dir, &pages, StubImages::default(), StubEnricher::default());

        let Selection::Published(article) = p.run().await.unwrap() else {
            panic!("expected an article");
        };
        assert_eq!(article.url, "https://portal.example/ok.html");
    }

    #[tokio::test]
    async fn test_no_sources_reachable_is_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(BROKEN, String::new())];
        let mut p = pipeline(&dir, &pages, StubImages::default(), StubEnricher::default());

        assert_eq!(p.run().await.unwrap(), Selection::NothingNew);
    }

    #[tokio::test]
    async fn test_same_story_across_blocks_is_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(
            PORTAL,
            page(&[("Portada", None, "/x.html"), ("Repetida", None, "/x.html")]),
        )];
        let mut p = pipeline(&dir, &pages, StubImages::default(), StubEnricher::default());

        assert!(matches!(p.run().await.unwrap(), Selection::Published(_)));
        assert_eq!(p.run().await.unwrap(), Selection::NothingNew);
    }

    #[tokio::test]
    async fn test_seeded_selection_is_deterministic() {
        let pages = [(
            PORTAL,
            page(&[
                ("A", None, "/a.html"),
                ("B", None, "/b.html"),
                ("C", None, "/c.html"),
                ("D", None, "/d.html"),
            ]),
        )];

        let mut picks = Vec::new();
        for _ in 0..2 {
            let dir = tempfile::tempdir().unwrap();
            let mut p = pipeline(&dir, &pages, StubImages::default(), StubEnricher::default());
            let Selection::Published(article) = p.run().await.unwrap() else {
                panic!("expected an article");
            };
            picks.push(article.url);
        }
        assert_eq!(picks[0], picks[1]);
    }

    #[tokio::test]
    async fn test_unreadable_history_aborts_before_enrichment() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(PORTAL, page(&[("Noticia", None, "/n.html")]))];
        let enricher = StubEnricher::default();
        // A directory cannot be read as a history file.
        let mut p = test_pipeline(dir.path(), &pages, StubImages::default(), enricher.clone());

        let err = p.run().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::History(HistoryError::Read { .. })
        ));
        assert_eq!(enricher.calls(), 0);
    }

    #[tokio::test]
    async fn test_unwritable_history_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("sent_news.txt");
        let pages = [(PORTAL, page(&[("Noticia", None, "/n.html")]))];
        let enricher = StubEnricher::default();
        let mut p = test_pipeline(&path, &pages, StubImages::default(), enricher.clone());

        let err = p.run().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::History(HistoryError::Write { .. })
        ));
        assert_eq!(enricher.calls(), 1);
        assert!(!path.exists());
    }
}
