pub mod base;
pub mod browser;
pub mod chain;
pub mod chromium;
pub mod eventbrite;
pub mod fallback;
pub mod http;
pub mod meetup;
pub mod mock;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, Region, RendererKind};
use crate::models::RawRecord;

use self::browser::{BrowserAdapter, SessionTimeouts};
use self::chromium::ChromiumLauncher;
use self::http::HttpLauncher;
use self::session::BrowserLauncher;

/// One listing source. `scrape` never fails: an adapter that cannot reach its
/// site returns fallback records or nothing, and logs why.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn url(&self) -> &'static str;
    async fn scrape(&self) -> Vec<RawRecord>;
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ScraperInfo {
    pub id: String,
    pub name: String,
    pub url: String,
}

pub fn launcher_for(config: &AppConfig) -> Arc<dyn BrowserLauncher> {
    match config.renderer {
        RendererKind::Chromium => Arc::new(ChromiumLauncher::new(
            config.chromium_path.clone(),
            config.headless,
        )),
        RendererKind::Http => Arc::new(HttpLauncher),
    }
}

/// Registered adapters in run order.
pub fn active_adapters(
    config: &AppConfig,
    region: &Region,
    launcher: Arc<dyn BrowserLauncher>,
) -> Vec<Arc<dyn SourceAdapter>> {
    let timeouts = SessionTimeouts::from(config);
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    if config.synthetic_enabled {
        adapters.push(Arc::new(mock::SyntheticAdapter::new(region.clone())));
    }
    adapters.push(Arc::new(BrowserAdapter::new(
        eventbrite::Eventbrite,
        Arc::clone(&launcher),
        timeouts,
        region.clone(),
    )));
    adapters.push(Arc::new(BrowserAdapter::new(
        meetup::Meetup,
        launcher,
        timeouts,
        region.clone(),
    )));
    adapters
}

pub fn list_scrapers(adapters: &[Arc<dyn SourceAdapter>]) -> Vec<ScraperInfo> {
    adapters
        .iter()
        .map(|adapter| ScraperInfo {
            id: adapter.id().to_string(),
            name: adapter.name().to_string(),
            url: adapter.url().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::StaticLauncher;

    #[test]
    fn registry_order() {
        let config = AppConfig::default();
        let adapters = active_adapters(&config, &Region::default(), Arc::new(StaticLauncher::new()));
        let ids: Vec<_> = list_scrapers(&adapters).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["synthetic", "eventbrite", "meetup"]);
    }

    #[test]
    fn synthetic_adapter_can_be_disabled() {
        let config = AppConfig {
            synthetic_enabled: false,
            ..AppConfig::default()
        };
        let adapters = active_adapters(&config, &Region::default(), Arc::new(StaticLauncher::new()));
        assert_eq!(adapters.len(), 2);
        assert_eq!(adapters[0].url(), "https://www.eventbrite.com.au/d/australia--sydney/events/");
    }

    #[test]
    fn renderer_choice_picks_launcher() {
        let mut config = AppConfig::default();
        assert_eq!(launcher_for(&config).kind(), "chromium");
        config.renderer = RendererKind::Http;
        assert_eq!(launcher_for(&config).kind(), "http");
    }
}
