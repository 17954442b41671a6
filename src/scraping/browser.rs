//! Browser-driven adapters.
//!
//! A [`SiteProfile`] describes one listing site: where to go, how to present
//! the session, which selectors find cards and how one card becomes a
//! [`RawRecord`]. [`BrowserAdapter`] runs the shared flow against it:
//! launch, visit each URL until one yields records, close the session, and
//! synthesize placeholders when nothing came back.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::base;
use super::chain::SelectorChain;
use super::fallback::{self, FallbackPlan};
use super::session::{auto_scroll, BrowserLauncher, PageSession, RequestIdentity, ScrollPlan};
use super::SourceAdapter;
use crate::config::{AppConfig, Region};
use crate::models::RawRecord;
use crate::utils::truncate_for_log;

const SCROLL_SETTLE: Duration = Duration::from_secs(2);
const WARMUP_TIMEOUT: Duration = Duration::from_secs(20);

pub trait SiteProfile: Send + Sync + 'static {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    /// Tried in order; the first that yields records wins.
    fn urls(&self) -> &'static [&'static str];
    /// Page to load after a navigation failure before retrying the same URL.
    fn warmup_url(&self) -> Option<&'static str> {
        None
    }
    fn identity(&self) -> RequestIdentity {
        RequestIdentity::desktop()
    }
    fn navigation_timeout(&self, configured: Duration) -> Duration {
        configured
    }
    /// Pause after navigation for client-side rendering.
    fn settle(&self) -> Duration {
        Duration::ZERO
    }
    fn scroll(&self) -> Option<ScrollPlan> {
        None
    }
    fn cards(&self) -> &SelectorChain;
    fn extract(&self, card: ElementRef<'_>, page_url: &str) -> Option<RawRecord>;
    fn fallback(&self) -> Option<&FallbackPlan> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    pub navigation: Duration,
    pub probe: Duration,
}

impl From<&AppConfig> for SessionTimeouts {
    fn from(config: &AppConfig) -> Self {
        Self {
            navigation: config.navigation_timeout(),
            probe: config.selector_probe(),
        }
    }
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Holds the live session until it is closed explicitly. If the adapter
/// future is dropped first (the orchestrator aborted it), the close runs on a
/// detached task instead.
struct SessionGuard(Option<Box<dyn PageSession>>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.0.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("adapter cancelled, closing browser session");
                handle.spawn(async move {
                    if let Err(err) = session.close().await {
                        warn!(error = %err, "failed to close abandoned browser session");
                    }
                });
            }
            Err(_) => warn!("no runtime left to close browser session"),
        }
    }
}

pub struct BrowserAdapter<P> {
    profile: P,
    launcher: Arc<dyn BrowserLauncher>,
    timeouts: SessionTimeouts,
    region: Region,
}

impl<P: SiteProfile> BrowserAdapter<P> {
    pub fn new(
        profile: P,
        launcher: Arc<dyn BrowserLauncher>,
        timeouts: SessionTimeouts,
        region: Region,
    ) -> Self {
        Self {
            profile,
            launcher,
            timeouts,
            region,
        }
    }

    #[instrument(skip(self), fields(adapter = self.profile.id(), launcher = self.launcher.kind()))]
    async fn collect_live(&self) -> Result<Vec<RawRecord>> {
        let session = self
            .launcher
            .launch(&self.profile.identity())
            .await
            .context("failed to start browser session")?;
        let mut guard = SessionGuard(Some(session));

        let outcome = match guard.0.as_deref_mut() {
            Some(session) => self.walk_urls(session).await,
            None => Ok(Vec::new()),
        };

        if let Some(session) = guard.0.take() {
            if let Err(err) = session.close().await {
                warn!(error = %err, "failed to close browser session");
            }
        }
        outcome
    }

    async fn walk_urls(&self, session: &mut dyn PageSession) -> Result<Vec<RawRecord>> {
        let urls = self.profile.urls();
        let navigation = self.profile.navigation_timeout(self.timeouts.navigation);

        for (idx, url) in urls.iter().enumerate() {
            info!(attempt = idx + 1, total = urls.len(), url, "loading listing page");
            let visited = match session.navigate(url, navigation).await {
                Ok(()) => self.harvest(session, url).await,
                Err(err) => {
                    warn!(url, error = %err, "navigation failed");
                    match self.profile.warmup_url() {
                        Some(warmup) if err.warrants_warmup() => {
                            self.retry_after_warmup(session, warmup, url).await
                        }
                        _ => continue,
                    }
                }
            };

            match visited {
                Ok(records) if !records.is_empty() => {
                    info!(url, count = records.len(), "collected listings");
                    return Ok(records);
                }
                Ok(_) => info!(url, "no listings on page"),
                Err(err) => warn!(url, error = %err, "page visit failed"),
            }
        }

        Ok(Vec::new())
    }

    async fn retry_after_warmup(
        &self,
        session: &mut dyn PageSession,
        warmup: &str,
        url: &str,
    ) -> Result<Vec<RawRecord>> {
        info!(warmup, url, "warming up session before retry");
        session
            .navigate(warmup, WARMUP_TIMEOUT)
            .await
            .context("warm-up navigation failed")?;
        sleep(self.profile.settle()).await;
        session
            .navigate(url, self.timeouts.navigation)
            .await
            .context("retry navigation failed")?;
        self.harvest(session, url).await
    }

    async fn harvest(&self, session: &dyn PageSession, url: &str) -> Result<Vec<RawRecord>> {
        sleep(self.profile.settle()).await;

        let cards = self.profile.cards();
        let Some(found) = cards.locate(session, self.timeouts.probe).await else {
            let html = session.content().await.unwrap_or_default();
            match base::looks_blocked(&html) {
                Some(marker) => warn!(url, marker, "page looks like an anti-bot challenge"),
                None => info!(url, role = cards.role(), "no selector candidate matched"),
            }
            debug!(url, page = %truncate_for_log(&html, 300), "unmatched page");
            return Ok(Vec::new());
        };

        if let Some(plan) = self.profile.scroll() {
            match auto_scroll(session, plan).await {
                Ok(steps) => debug!(steps, "auto-scroll finished"),
                Err(err) => debug!(error = %err, "auto-scroll failed"),
            }
            sleep(SCROLL_SETTLE).await;
        }

        let html = session.content().await?;
        let page_url = session
            .current_url()
            .await
            .ok()
            .filter(|current| !current.is_empty())
            .unwrap_or_else(|| url.to_string());
        Ok(self.extract_records(&html, &page_url, found))
    }

    /// Parsing stays synchronous; the parsed document is not `Send`.
    pub(crate) fn extract_records(&self, html: &str, page_url: &str, found: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(html);
        let cards = self.profile.cards();

        for (candidate, selector) in cards.from_candidate(found) {
            let mut seen = HashSet::new();
            let records: Vec<RawRecord> = document
                .select(selector)
                .filter_map(|card| self.profile.extract(card, page_url))
                .filter(RawRecord::is_viable)
                .filter(|record| seen.insert(record.original_url.clone()))
                .collect();
            if !records.is_empty() {
                debug!(selector = candidate, count = records.len(), "extracted cards");
                return records;
            }
            debug!(selector = candidate, "no usable cards, trying next candidate");
        }
        Vec::new()
    }

    fn synthesize(&self, reason: &str) -> Vec<RawRecord> {
        match self.profile.fallback() {
            Some(plan) => {
                info!(
                    adapter = self.profile.id(),
                    reason,
                    count = plan.templates.len(),
                    "using fallback listings"
                );
                fallback::synthesize(plan, self.region.today())
            }
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl<P: SiteProfile> SourceAdapter for BrowserAdapter<P> {
    fn id(&self) -> &'static str {
        self.profile.id()
    }

    fn name(&self) -> &'static str {
        self.profile.name()
    }

    fn url(&self) -> &'static str {
        self.profile.urls().first().copied().unwrap_or_default()
    }

    async fn scrape(&self) -> Vec<RawRecord> {
        match self.collect_live().await {
            Ok(records) if !records.is_empty() => records,
            Ok(_) => self.synthesize("no live listings"),
            Err(err) => {
                warn!(adapter = self.profile.id(), error = %err, "live scrape failed");
                self.synthesize("live scrape failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::scraping::fallback::FallbackTemplate;
    use crate::scraping::testing::StaticLauncher;
    use once_cell::sync::Lazy;

    static CARDS: Lazy<SelectorChain> =
        Lazy::new(|| SelectorChain::new("card", &[".card", "article"]));
    static TITLE: Lazy<SelectorChain> = Lazy::new(|| SelectorChain::new("title", &["h2"]));
    static LINK: Lazy<SelectorChain> = Lazy::new(|| SelectorChain::new("link", &["a"]));
    static DATE: Lazy<SelectorChain> = Lazy::new(|| SelectorChain::new("date", &["time"]));

    const FALLBACK: FallbackPlan = FallbackPlan {
        templates: &[FallbackTemplate {
            title: "Placeholder",
            description: "Stand-in listing.",
            venue: "Town Hall",
            group: "Locals",
            url: "https://site.test/placeholder",
        }],
        spacing_days: 3,
        time: "18:30",
    };

    struct Profile {
        urls: &'static [&'static str],
        warmup: Option<&'static str>,
        fallback: bool,
    }

    impl SiteProfile for Profile {
        fn id(&self) -> &'static str {
            "test"
        }
        fn name(&self) -> &'static str {
            "Test"
        }
        fn urls(&self) -> &'static [&'static str] {
            self.urls
        }
        fn warmup_url(&self) -> Option<&'static str> {
            self.warmup
        }
        fn scroll(&self) -> Option<ScrollPlan> {
            Some(ScrollPlan::default())
        }
        fn cards(&self) -> &SelectorChain {
            &CARDS
        }
        fn extract(&self, card: ElementRef<'_>, page_url: &str) -> Option<RawRecord> {
            Some(RawRecord {
                title: TITLE.text(card)?,
                original_url: base::absolute_url(page_url, LINK.attr(card, "href"))?,
                date_text: DATE.text(card).unwrap_or_default(),
                source: Some(Source::Other),
                ..RawRecord::default()
            })
        }
        fn fallback(&self) -> Option<&FallbackPlan> {
            self.fallback.then_some(&FALLBACK)
        }
    }

    const LISTING: &str = r#"
    <div class="card"><h2>One</h2><a href="/e/1"></a><time>Jan 20, 2024</time></div>
    <div class="card"><h2>One again</h2><a href="/e/1"></a><time>Jan 20, 2024</time></div>
    <div class="card"><h2>Undated</h2><a href="/e/2"></a></div>
    <div class="card"><h2>Two</h2><a href="/e/3"></a><time>Jan 21, 2024</time></div>
    "#;

    fn adapter(profile: Profile, launcher: Arc<StaticLauncher>) -> BrowserAdapter<Profile> {
        BrowserAdapter::new(
            profile,
            launcher,
            SessionTimeouts::default(),
            Region::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn first_productive_url_wins() {
        let launcher = Arc::new(
            StaticLauncher::new()
                .page("https://site.test/empty", "<p>nothing here</p>")
                .page("https://site.test/list", LISTING),
        );
        let adapter = adapter(
            Profile {
                urls: &["https://site.test/empty", "https://site.test/list"],
                warmup: None,
                fallback: true,
            },
            Arc::clone(&launcher),
        );

        let records = adapter.scrape().await;
        let urls: Vec<_> = records.iter().map(|r| r.original_url.as_str()).collect();
        assert_eq!(urls, vec!["https://site.test/e/1", "https://site.test/e/3"]);
        assert_eq!(launcher.launches(), 1);
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_urls_fall_back_and_still_close() {
        let launcher = Arc::new(StaticLauncher::new());
        let adapter = adapter(
            Profile {
                urls: &["https://site.test/a", "https://site.test/b"],
                warmup: None,
                fallback: true,
            },
            Arc::clone(&launcher),
        );

        let records = adapter.scrape().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, Some(Source::Synthetic));
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_fallback_means_empty() {
        let launcher = Arc::new(StaticLauncher::new());
        let adapter = adapter(
            Profile {
                urls: &["https://site.test/a"],
                warmup: None,
                fallback: false,
            },
            Arc::clone(&launcher),
        );
        assert!(adapter.scrape().await.is_empty());
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_navigation_warms_up_then_retries() {
        let launcher = Arc::new(
            StaticLauncher::new()
                .page("https://site.test/", "<p>home</p>"),
        );
        let adapter = adapter(
            Profile {
                urls: &["https://site.test/list"],
                warmup: Some("https://site.test/"),
                fallback: false,
            },
            Arc::clone(&launcher),
        );
        assert!(adapter.scrape().await.is_empty());
        assert_eq!(
            launcher.visits(),
            vec![
                "https://site.test/list",
                "https://site.test/",
                "https://site.test/list"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_pages_skip_the_warmup() {
        let launcher = Arc::new(
            StaticLauncher::new()
                .page("https://site.test/", "<p>home</p>")
                .reject("https://site.test/list", 403),
        );
        let adapter = adapter(
            Profile {
                urls: &["https://site.test/list"],
                warmup: Some("https://site.test/"),
                fallback: true,
            },
            Arc::clone(&launcher),
        );
        assert_eq!(adapter.scrape().await.len(), 1);
        assert_eq!(launcher.visits(), vec!["https://site.test/list"]);
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_scrape_still_closes_the_session() {
        let launcher = Arc::new(StaticLauncher::new());
        let adapter = adapter(
            Profile {
                urls: &["https://site.test/stalls"],
                warmup: None,
                fallback: false,
            },
            Arc::clone(&launcher),
        );

        let task = tokio::spawn(async move { adapter.scrape().await });
        sleep(Duration::from_secs(1)).await;
        assert_eq!(launcher.launches(), 1);
        assert_eq!(launcher.closes(), 0);

        task.abort();
        assert!(task.await.expect_err("aborted").is_cancelled());
        sleep(Duration::from_millis(1)).await;
        assert_eq!(launcher.closes(), 1);
    }

    #[test]
    fn later_candidates_are_tried_when_cards_are_unusable() {
        let launcher = Arc::new(StaticLauncher::new());
        let adapter = adapter(
            Profile {
                urls: &["https://site.test/"],
                warmup: None,
                fallback: false,
            },
            launcher,
        );
        let html = r#"
        <div class="card"><span>promo</span></div>
        <article><h2>Real</h2><a href="/e/9"></a><time>Feb 1, 2024</time></article>
        "#;
        let records = adapter.extract_records(html, "https://site.test/", ".card");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Real");
    }
}
