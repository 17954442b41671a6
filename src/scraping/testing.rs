//! In-memory launcher for adapter tests. Pages are served from a map, scripted
//! URLs answer with an HTTP status, and any other URL behaves like a page that
//! never finishes loading.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::session::{
    count_in_markup, BrowserLauncher, NavigationError, PageSession, RequestIdentity,
};

#[derive(Default)]
pub struct StaticLauncher {
    pages: HashMap<String, String>,
    rejected: HashMap<String, u16>,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    visits: Arc<std::sync::Mutex<Vec<String>>>,
}

impl StaticLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn reject(mut self, url: &str, status: u16) -> Self {
        self.rejected.insert(url.to_string(), status);
        self
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BrowserLauncher for StaticLauncher {
    fn kind(&self) -> &'static str {
        "static"
    }

    async fn launch(&self, _identity: &RequestIdentity) -> Result<Box<dyn PageSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticSession {
            pages: self.pages.clone(),
            rejected: self.rejected.clone(),
            closes: Arc::clone(&self.closes),
            visits: Arc::clone(&self.visits),
            url: String::new(),
            html: String::new(),
        }))
    }
}

struct StaticSession {
    pages: HashMap<String, String>,
    rejected: HashMap<String, u16>,
    closes: Arc<AtomicUsize>,
    visits: Arc<std::sync::Mutex<Vec<String>>>,
    url: String,
    html: String,
}

#[async_trait]
impl PageSession for StaticSession {
    async fn navigate(&mut self, url: &str, limit: Duration) -> Result<(), NavigationError> {
        if let Ok(mut visits) = self.visits.lock() {
            visits.push(url.to_string());
        }
        if let Some(&status) = self.rejected.get(url) {
            return Err(NavigationError::Rejected {
                url: url.to_string(),
                status,
            });
        }
        match self.pages.get(url) {
            Some(html) => {
                self.url = url.to_string();
                self.html = html.clone();
                Ok(())
            }
            None => {
                tokio::time::sleep(limit).await;
                Err(NavigationError::TimedOut {
                    url: url.to_string(),
                    limit,
                })
            }
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
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
