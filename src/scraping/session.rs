//! Browser session abstraction.
//!
//! A [`BrowserLauncher`] starts one isolated session per adapter run; the
//! adapter drives it through [`PageSession`] and must call
//! [`PageSession::close`] on every exit path.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("DNT", "1"),
    ("Upgrade-Insecure-Requests", "1"),
];

/// How a session presents itself to the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_agent: &'static str,
    pub viewport: (u32, u32),
    pub headers: Vec<(&'static str, &'static str)>,
}

impl RequestIdentity {
    pub fn desktop() -> Self {
        Self {
            user_agent: DESKTOP_USER_AGENT,
            viewport: (1366, 768),
            headers: BROWSER_HEADERS.to_vec(),
        }
    }

    pub fn with_headers(mut self, extra: &[(&'static str, &'static str)]) -> Self {
        self.headers.extend_from_slice(extra);
        self
    }
}

impl Default for RequestIdentity {
    fn default() -> Self {
        Self::desktop()
    }
}

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("navigation to {url} timed out after {}s", .limit.as_secs())]
    TimedOut { url: String, limit: Duration },
    #[error("navigation to {url} failed: {reason}")]
    Failed { url: String, reason: String },
    #[error("{url} answered with status {status}")]
    Rejected { url: String, status: u16 },
}

impl NavigationError {
    /// Timeouts and transport failures may clear up after the session has
    /// loaded a lighter page first. A status answer will not.
    pub fn warrants_warmup(&self) -> bool {
        matches!(self, Self::TimedOut { .. } | Self::Failed { .. })
    }
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    fn kind(&self) -> &'static str;
    async fn launch(&self, identity: &RequestIdentity) -> Result<Box<dyn PageSession>>;
}

#[async_trait]
pub trait PageSession: Send + Sync {
    /// Loads `url`, failing if it takes longer than `limit`.
    async fn navigate(&mut self, url: &str, limit: Duration) -> Result<(), NavigationError>;
    /// Number of elements currently matching a CSS selector.
    async fn count_matches(&self, selector: &str) -> Result<usize>;
    /// Scrolls down by `distance` pixels and returns how far the page can
    /// scroll in total (document height minus the viewport).
    async fn scroll_by(&self, distance: u32) -> Result<u64>;
    async fn content(&self) -> Result<String>;
    async fn current_url(&self) -> Result<String>;
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Scroll step, pause between steps, and the most time one page may take.
#[derive(Debug, Clone, Copy)]
pub struct ScrollPlan {
    pub step: u32,
    pub pause: Duration,
    pub ceiling: Duration,
}

impl Default for ScrollPlan {
    fn default() -> Self {
        Self {
            step: 100,
            pause: Duration::from_millis(100),
            ceiling: Duration::from_secs(30),
        }
    }
}

/// Scrolls until the distance travelled covers the page's scrollable height,
/// re-reading the height each step so lazily appended content is included.
/// Returns the number of steps taken.
pub async fn auto_scroll(page: &dyn PageSession, plan: ScrollPlan) -> Result<u32> {
    let deadline = Instant::now() + plan.ceiling;
    let mut travelled: u64 = 0;
    let mut steps = 0;

    loop {
        let extent = page.scroll_by(plan.step).await?;
        travelled += u64::from(plan.step);
        steps += 1;
        if travelled >= extent {
            break;
        }
        if Instant::now() >= deadline {
            debug!(steps, travelled, extent, "auto-scroll reached its time ceiling");
            break;
        }
        sleep(plan.pause).await;
    }

    Ok(steps)
}

/// Selector matching against a static markup snapshot.
pub(crate) fn count_in_markup(html: &str, selector: &str) -> Result<usize> {
    let parsed =
        Selector::parse(selector).map_err(|err| anyhow!("invalid selector {selector}: {err:?}"))?;
    Ok(Html::parse_document(html).select(&parsed).count())
}
