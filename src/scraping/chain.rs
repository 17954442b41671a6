//! Ordered selector fallbacks.
//!
//! Sites rename their markup often, so every role (card, title, link...) is
//! described by several CSS selectors tried in order. Against a live page,
//! [`SelectorChain::locate`] waits a bounded time for each candidate; against
//! a parsed snapshot the `text`/`attr` helpers take the first candidate that
//! yields something.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::base;
use super::session::PageSession;

const PROBE_INTERVAL: Duration = Duration::from_millis(250);

pub struct SelectorChain {
    role: &'static str,
    entries: Vec<(&'static str, Selector)>,
}

impl SelectorChain {
    /// Candidates that fail to parse are logged and left out.
    pub fn new(role: &'static str, candidates: &[&'static str]) -> Self {
        let entries = candidates
            .iter()
            .filter_map(|raw| match Selector::parse(raw) {
                Ok(selector) => Some((*raw, selector)),
                Err(err) => {
                    warn!(role, selector = raw, error = ?err, "skipping invalid selector");
                    None
                }
            })
            .collect();
        Self { role, entries }
    }

    pub fn role(&self) -> &'static str {
        self.role
    }

    /// The first candidate that matches at least one element on the live page
    /// within `probe`, or `None` once every candidate has been exhausted.
    pub async fn locate(&self, page: &dyn PageSession, probe: Duration) -> Option<&'static str> {
        for (raw, _) in &self.entries {
            match timeout(probe, wait_for(page, raw)).await {
                Ok(true) => {
                    info!(role = self.role, selector = raw, "selector matched");
                    return Some(raw);
                }
                Ok(false) | Err(_) => {
                    debug!(role = self.role, selector = raw, "selector not found, trying next");
                }
            }
        }
        None
    }

    /// Candidates starting at `found`, for walking a snapshot after `locate`.
    pub fn from_candidate<'a>(
        &'a self,
        found: &str,
    ) -> impl Iterator<Item = (&'static str, &'a Selector)> + 'a {
        let start = self
            .entries
            .iter()
            .position(|(raw, _)| *raw == found)
            .unwrap_or(0);
        self.entries[start..].iter().map(|(raw, sel)| (*raw, sel))
    }

    pub fn select_all<'a>(&self, document: &'a Html, found: &str) -> Vec<ElementRef<'a>> {
        self.from_candidate(found)
            .map(|(_, selector)| document.select(selector).collect::<Vec<_>>())
            .find(|cards| !cards.is_empty())
            .unwrap_or_default()
    }

    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.entries
            .iter()
            .find_map(|(_, selector)| scope.select(selector).next())
    }

    /// Cleaned text of the first candidate whose first match has any text.
    pub fn text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.entries
            .iter()
            .find_map(|(_, selector)| base::first_text(&scope, selector))
    }

    /// First non-empty value of `attr` on any candidate's first match.
    pub fn attr(&self, scope: ElementRef<'_>, attr: &str) -> Option<String> {
        self.entries.iter().find_map(|(_, selector)| {
            base::first_attr(&scope, selector, attr).filter(|value| !value.trim().is_empty())
        })
    }
}

async fn wait_for(page: &dyn PageSession, selector: &str) -> bool {
    loop {
        match page.count_matches(selector).await {
            Ok(0) => sleep(PROBE_INTERVAL).await,
            Ok(_) => return true,
            Err(err) => {
                debug!(selector, error = %err, "selector probe failed");
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::testing::StaticLauncher;
    use crate::scraping::session::{BrowserLauncher, RequestIdentity};

    const PAGE: &str = r#"
    <ul>
        <li class="listing"><h3> First </h3><a href="/e/1">go</a></li>
        <li class="listing"><h3></h3><h4>Second</h4><a data-href="/e/2">go</a></li>
    </ul>
    "#;

    fn chain(candidates: &[&'static str]) -> SelectorChain {
        SelectorChain::new("test", candidates)
    }

    #[test]
    fn invalid_candidates_are_skipped() {
        let chain = chain(&["[[nope", ".listing"]);
        let kept: Vec<_> = chain.from_candidate("[[nope").map(|(raw, _)| raw).collect();
        assert_eq!(kept, vec![".listing"]);
    }

    #[test]
    fn snapshot_walks_from_the_located_candidate() {
        let document = Html::parse_document(PAGE);
        let cards = chain(&[".missing", ".listing", "li"]);
        assert_eq!(cards.select_all(&document, ".listing").len(), 2);
        assert_eq!(cards.select_all(&document, ".missing").len(), 2);
    }

    #[test]
    fn sub_fields_fall_through_their_own_lists() {
        let document = Html::parse_document(PAGE);
        let cards = chain(&[".listing"]).select_all(&document, ".listing");
        let titles = chain(&["h3", "h4"]);
        assert_eq!(titles.text(cards[0]).as_deref(), Some("First"));
        assert_eq!(titles.text(cards[1]).as_deref(), Some("Second"));

        let links = chain(&["a[href]", "a[data-href]"]);
        assert_eq!(links.attr(cards[0], "href").as_deref(), Some("/e/1"));
        assert_eq!(links.attr(cards[1], "href"), None);
        assert_eq!(links.attr(cards[1], "data-href").as_deref(), Some("/e/2"));
        assert!(titles.first(cards[1]).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn locate_returns_first_present_candidate() {
        let launcher = StaticLauncher::new().page("https://site.test/", PAGE);
        let mut page = launcher
            .launch(&RequestIdentity::desktop())
            .await
            .expect("launch");
        page.navigate("https://site.test/", Duration::from_secs(1))
            .await
            .expect("navigate");

        let cards = chain(&[".event-card", ".listing"]);
        let found = cards.locate(page.as_ref(), Duration::from_secs(5)).await;
        assert_eq!(found, Some(".listing"));

        let none = chain(&[".event-card", "article"]);
        assert_eq!(none.locate(page.as_ref(), Duration::from_secs(5)).await, None);
        page.close().await.expect("close");
    }
}
