//! Plain HTTP sessions for environments without a browser. Pages are fetched
//! once and matched as static markup, so script-rendered listings will not
//! appear and scrolling does nothing.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use super::session::{
    count_in_markup, BrowserLauncher, NavigationError, PageSession, RequestIdentity,
};

#[derive(Default)]
pub struct HttpLauncher;

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn launch(&self, identity: &RequestIdentity) -> Result<Box<dyn PageSession>> {
        let mut headers = HeaderMap::new();
        for (name, value) in &identity.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("invalid header name {name}: {e}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("invalid header value for {name}: {e}"))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(identity.user_agent)
            .default_headers(headers)
            .build()
            .context("failed to build http client")?;

        Ok(Box::new(HttpSession {
            client,
            url: String::new(),
            html: String::new(),
        }))
    }
}

pub struct HttpSession {
    client: Client,
    url: String,
    html: String,
}

impl HttpSession {
    async fn fetch(&self, url: &str) -> Result<(String, String), NavigationError> {
        let failed = |err: reqwest::Error| NavigationError::Failed {
            url: url.to_string(),
            reason: err.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(failed)?;
        let status = response.status();
        if !status.is_success() {
            return Err(NavigationError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(failed)?;
        Ok((final_url, body))
    }
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str, limit: Duration) -> Result<(), NavigationError> {
        match tokio::time::timeout(limit, self.fetch(url)).await {
            Ok(Ok((final_url, html))) => {
                self.url = final_url;
                self.html = html;
                Ok(())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(NavigationError::TimedOut {
                url: url.to_string(),
                limit,
            }),
        }
    }

    async fn count_matches(&self, selector: &str) -> Result<usize> {
        count_in_markup(&self.html, selector)
    }

    async fn scroll_by(&self, _distance: u32) -> Result<u64> {
        Ok(0)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
