//! Chromium-backed sessions via chromiumoxide. One browser process per session,
//! so adapters never share cookies or storage.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::session::{BrowserLauncher, NavigationError, PageSession, RequestIdentity};

pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    headless: bool,
}

impl ChromiumLauncher {
    pub fn new(executable: Option<PathBuf>, headless: bool) -> Self {
        Self {
            executable,
            headless,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    fn kind(&self) -> &'static str {
        "chromium"
    }

    async fn launch(&self, identity: &RequestIdentity) -> Result<Box<dyn PageSession>> {
        let (width, height) = identity.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled");
        builder = if self.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        match open_page(&browser, identity).await {
            Ok(page) => Ok(Box::new(ChromiumSession {
                page,
                browser,
                handler,
            })),
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "failed to close browser after setup error");
                }
                handler.abort();
                Err(err)
            }
        }
    }
}

async fn open_page(browser: &Browser, identity: &RequestIdentity) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("failed to create new page")?;

    page.set_user_agent(SetUserAgentOverrideParams::new(identity.user_agent))
        .await
        .context("failed to set user agent")?;

    let headers: Map<String, Value> = identity
        .headers
        .iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    page.execute(SetExtraHttpHeadersParams::new(Headers::new(Value::Object(
        headers,
    ))))
    .await
    .context("failed to set request headers")?;

    Ok(page)
}

pub struct ChromiumSession {
    page: Page,
    browser: Browser,
    handler: JoinHandle<()>,
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, limit: Duration) -> Result<(), NavigationError> {
        match tokio::time::timeout(limit, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(NavigationError::Failed {
                url: url.to_string(),
                reason: format!("{e:?}"),
            }),
            Err(_) => Err(NavigationError::TimedOut {
                url: url.to_string(),
                limit,
            }),
        }
    }

    async fn count_matches(&self, selector: &str) -> Result<usize> {
        let quoted = serde_json::to_string(selector)?;
        let script = format!("document.querySelectorAll({quoted}).length");
        self.page
            .evaluate(script)
            .await
            .with_context(|| format!("selector probe failed for {selector}"))?
            .into_value::<usize>()
            .map_err(|e| anyhow!("failed to read match count: {e:?}"))
    }

    async fn scroll_by(&self, distance: u32) -> Result<u64> {
        let script = format!(
            "(() => {{ window.scrollBy(0, {distance}); \
             return Math.max(document.body.scrollHeight - window.innerHeight, 0); }})()"
        );
        let extent = self
            .page
            .evaluate(script)
            .await
            .context("scroll failed")?
            .into_value::<f64>()
            .map_err(|e| anyhow!("failed to read scroll height: {e:?}"))?;
        Ok(extent.max(0.0) as u64)
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.context("failed to read page content")
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .context("failed to read page url")?
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            page,
            mut browser,
            handler,
        } = *self;

        if let Err(err) = page.close().await {
            debug!(error = %err, "page close failed");
        }
        let closed = browser.close().await.map(|_| ());
        if let Err(err) = browser.wait().await {
            debug!(error = %err, "waiting for browser exit failed");
        }
        handler.abort();
        closed.context("failed to close browser")
    }
}
