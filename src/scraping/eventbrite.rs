use once_cell::sync::Lazy;
use scraper::ElementRef;

use super::base;
use super::browser::SiteProfile;
use super::chain::SelectorChain;
use super::session::ScrollPlan;
use crate::models::{RawRecord, Source};

const URLS: &[&str] = &["https://www.eventbrite.com.au/d/australia--sydney/events/"];
const SOURCE_ID: &str = "eventbrite";
const SOURCE_NAME: &str = "Eventbrite";
const ORGANIZER: &str = "Eventbrite Organizer";

static CARD_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "eventbrite card",
        &[
            r#"[data-testid="event-card"]"#,
            ".search-event-card",
            ".event-card",
            ".eds-event-card",
            r#"[class*="event"]"#,
            "article",
            ".event-listing",
        ],
    )
});
static TITLE_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "eventbrite title",
        &[
            r#"[data-testid="event-title"]"#,
            ".event-title",
            "h2 a",
            "h3 a",
            ".eds-event-card__formatted-name--is-clamped",
            ".event-card__clamp-line--one",
            r#"a[data-spec="event-title"]"#,
        ],
    )
});
static DATE_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "eventbrite date",
        &[
            r#"[data-testid="event-datetime"]"#,
            ".event-date",
            r#"[data-spec="event-datetime"]"#,
            ".eds-event-card__sub-content time",
            ".event-card__date",
        ],
    )
});
static LINK_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "eventbrite link",
        &[r#"a[href*="/e/"]"#, r#"a[href*="eventbrite"]"#, "a[href]"],
    )
});
static VENUE_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "eventbrite venue",
        &[
            r#"[data-testid="event-location"]"#,
            ".event-venue",
            ".eds-event-card__sub-content div",
        ],
    )
});
static PRICE_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "eventbrite price",
        &[
            r#"[data-testid="event-price"]"#,
            ".event-price",
            ".eds-event-card__formatted-price",
        ],
    )
});
static DESCRIPTION_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "eventbrite description",
        &[".event-description", ".eds-event-card__primary-content", "p"],
    )
});
static IMAGE_CHAIN: Lazy<SelectorChain> =
    Lazy::new(|| SelectorChain::new("eventbrite image", &["img"]));

pub struct Eventbrite;

impl SiteProfile for Eventbrite {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn urls(&self) -> &'static [&'static str] {
        URLS
    }

    fn scroll(&self) -> Option<ScrollPlan> {
        Some(ScrollPlan::default())
    }

    fn cards(&self) -> &SelectorChain {
        &CARD_CHAIN
    }

    fn extract(&self, card: ElementRef<'_>, page_url: &str) -> Option<RawRecord> {
        let title = TITLE_CHAIN.text(card)?;
        let original_url = base::absolute_url(page_url, LINK_CHAIN.attr(card, "href"))?;
        let description = DESCRIPTION_CHAIN
            .text(card)
            .unwrap_or_else(|| title.clone());

        Some(RawRecord {
            description,
            date_text: DATE_CHAIN.text(card).unwrap_or_default(),
            venue_text: VENUE_CHAIN.text(card).unwrap_or_default(),
            price_text: PRICE_CHAIN.text(card).unwrap_or_default(),
            image_url: base::absolute_url(page_url, IMAGE_CHAIN.attr(card, "src"))
                .unwrap_or_default(),
            organizer: Some(ORGANIZER.to_string()),
            source: Some(Source::Eventbrite),
            title,
            original_url,
            ..RawRecord::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Region;
    use crate::scraping::browser::{BrowserAdapter, SessionTimeouts};
    use crate::scraping::testing::StaticLauncher;
    use crate::scraping::SourceAdapter;

    const SAMPLE_HTML: &str = r#"
    <html><body>
    <section>
        <div data-testid="event-card">
            <img src="https://img.evbuc.com/jazz.jpg">
            <h3><a href="https://www.eventbrite.com.au/e/jazz-by-the-harbour-tickets-1001">Jazz by the Harbour</a></h3>
            <p data-testid="event-datetime">Sat, Jan 20, 2024 7:30 PM</p>
            <p data-testid="event-location">Sydney Opera House, Bennelong Point</p>
            <p data-testid="event-price">From $45.00</p>
        </div>
        <div data-testid="event-card">
            <div class="event-title">Startup Breakfast</div>
            <div class="event-date">Tomorrow 8:00 AM</div>
            <a href="/e/startup-breakfast-1002">Details</a>
            <div class="event-price">Free</div>
        </div>
        <div data-testid="event-card">
            <span>Sponsored</span>
        </div>
    </section>
    </body></html>
    "#;

    #[tokio::test(start_paused = true)]
    async fn parses_listing_cards() {
        let launcher = Arc::new(StaticLauncher::new().page(URLS[0], SAMPLE_HTML));
        let adapter = BrowserAdapter::new(
            Eventbrite,
            Arc::clone(&launcher) as _,
            SessionTimeouts::default(),
            Region::default(),
        );

        let records = adapter.scrape().await;
        assert_eq!(records.len(), 2);

        let jazz = &records[0];
        assert_eq!(jazz.title, "Jazz by the Harbour");
        assert_eq!(jazz.date_text, "Sat, Jan 20, 2024 7:30 PM");
        assert_eq!(jazz.venue_text, "Sydney Opera House, Bennelong Point");
        assert_eq!(jazz.price_text, "From $45.00");
        assert_eq!(jazz.image_url, "https://img.evbuc.com/jazz.jpg");
        assert_eq!(
            jazz.original_url,
            "https://www.eventbrite.com.au/e/jazz-by-the-harbour-tickets-1001"
        );
        assert_eq!(jazz.source, Some(Source::Eventbrite));
        assert_eq!(jazz.organizer.as_deref(), Some("Eventbrite Organizer"));

        let breakfast = &records[1];
        assert_eq!(breakfast.title, "Startup Breakfast");
        assert_eq!(
            breakfast.original_url,
            "https://www.eventbrite.com.au/e/startup-breakfast-1002"
        );
        assert_eq!(breakfast.description, "Startup Breakfast");
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_site_yields_nothing() {
        let launcher = Arc::new(StaticLauncher::new());
        let adapter = BrowserAdapter::new(
            Eventbrite,
            Arc::clone(&launcher) as _,
            SessionTimeouts::default(),
            Region::default(),
        );
        assert!(adapter.scrape().await.is_empty());
        assert_eq!(launcher.closes(), 1);
    }
}
