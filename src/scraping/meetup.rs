use std::time::Duration;

use once_cell::sync::Lazy;
use scraper::ElementRef;

use super::base;
use super::browser::SiteProfile;
use super::chain::SelectorChain;
use super::fallback::{FallbackPlan, FallbackTemplate};
use super::session::RequestIdentity;
use crate::models::{RawRecord, Source};

const URLS: &[&str] = &[
    "https://www.meetup.com/find/?location=Sydney%2C%20Australia&source=EVENTS",
    "https://www.meetup.com/find/events/?allMeetups=false&keywords=&radius=25&userFreeform=Sydney%2C+Australia",
    "https://www.meetup.com/cities/au/sydney/events/",
];
const WARMUP_URL: &str = "https://www.meetup.com/";
const SOURCE_ID: &str = "meetup";
const SOURCE_NAME: &str = "Meetup";
const ORGANIZER: &str = "Meetup Organizer";
const MIN_TITLE_LEN: usize = 4;

const FETCH_HEADERS: &[(&str, &str)] = &[
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
];

const FALLBACK: FallbackPlan = FallbackPlan {
    templates: &[
        FallbackTemplate {
            title: "Sydney Tech Professionals Meetup",
            description: "Monthly gathering for technology professionals in Sydney. Networking, knowledge sharing, and career development.",
            venue: "WeWork, Martin Place, Sydney",
            group: "Sydney Tech Professionals",
            url: "https://www.meetup.com/sydney-tech-professionals/events/fallback-1",
        },
        FallbackTemplate {
            title: "React Sydney Developer Meetup",
            description: "Learn about React, JavaScript, and modern web development with fellow developers.",
            venue: "Atlassian, 341 George Street, Sydney",
            group: "React Sydney",
            url: "https://www.meetup.com/react-sydney/events/fallback-2",
        },
        FallbackTemplate {
            title: "Sydney Startup Founders Networking",
            description: "Connect with fellow entrepreneurs, share experiences, and build your network.",
            venue: "Tank Stream Labs, North Sydney",
            group: "Sydney Startup Network",
            url: "https://www.meetup.com/sydney-startup-founders/events/fallback-3",
        },
        FallbackTemplate {
            title: "Python Sydney User Group",
            description: "Monthly Python programming meetup. All skill levels welcome.",
            venue: "Google Australia, Pyrmont",
            group: "Python Sydney",
            url: "https://www.meetup.com/python-sydney/events/fallback-4",
        },
        FallbackTemplate {
            title: "Sydney Digital Marketing Meetup",
            description: "Learn about digital marketing trends, tools, and strategies.",
            venue: "IAG Building, 388 George Street, Sydney",
            group: "Sydney Digital Marketers",
            url: "https://www.meetup.com/sydney-digital-marketing/events/fallback-5",
        },
    ],
    spacing_days: 3,
    time: "18:30",
};

static CARD_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "meetup card",
        &[
            r#"[data-testid="event-card"]"#,
            r#"[data-testid="searchResult"]"#,
            ".event-listing",
            ".searchResult",
            "article",
            r#"[href*="/events/"]"#,
            ".event-card",
            r#"[class*="event"]"#,
        ],
    )
});
// Headings and event links compete in document order, so they share a group.
static TITLE_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "meetup title",
        &[r#"h1, h2, h3, h4, a[href*="/events/"]"#, "a"],
    )
});
static LINK_CHAIN: Lazy<SelectorChain> =
    Lazy::new(|| SelectorChain::new("meetup link", &["a[href]"]));
static DATE_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "meetup date",
        &["time, [datetime], .date, [class*=\"date\"]"],
    )
});
static VENUE_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "meetup venue",
        &[r#"[class*="venue"], [class*="location"]"#],
    )
});
static GROUP_CHAIN: Lazy<SelectorChain> = Lazy::new(|| {
    SelectorChain::new(
        "meetup group",
        &[r#"[data-testid="group-name"]"#, r#"[class*="groupName"]"#],
    )
});
static IMAGE_CHAIN: Lazy<SelectorChain> =
    Lazy::new(|| SelectorChain::new("meetup image", &["img"]));

pub struct Meetup;

impl SiteProfile for Meetup {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn urls(&self) -> &'static [&'static str] {
        URLS
    }

    fn warmup_url(&self) -> Option<&'static str> {
        Some(WARMUP_URL)
    }

    fn identity(&self) -> RequestIdentity {
        RequestIdentity::desktop().with_headers(FETCH_HEADERS)
    }

    fn navigation_timeout(&self, configured: Duration) -> Duration {
        configured + Duration::from_secs(15)
    }

    fn settle(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn cards(&self) -> &SelectorChain {
        &CARD_CHAIN
    }

    fn extract(&self, card: ElementRef<'_>, page_url: &str) -> Option<RawRecord> {
        let heading = TITLE_CHAIN.first(card);
        let title = heading
            .map(base::inner_text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| base::inner_text(card));
        if title.chars().count() < MIN_TITLE_LEN {
            return None;
        }

        let href = heading
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string)
            .or_else(|| LINK_CHAIN.attr(card, "href"))
            .or_else(|| card.value().attr("href").map(str::to_string));
        let original_url = base::absolute_url(page_url, href)?;
        if !original_url.contains("meetup.com") {
            return None;
        }

        let date_text = DATE_CHAIN
            .text(card)
            .or_else(|| DATE_CHAIN.attr(card, "datetime"))
            .unwrap_or_default();
        let group = GROUP_CHAIN.text(card);

        Some(RawRecord {
            description: title.clone(),
            date_text,
            venue_text: VENUE_CHAIN.text(card).unwrap_or_default(),
            image_url: base::absolute_url(page_url, IMAGE_CHAIN.attr(card, "src"))
                .unwrap_or_default(),
            organizer: Some(group.clone().unwrap_or_else(|| ORGANIZER.to_string())),
            group,
            source: Some(Source::Meetup),
            title,
            original_url,
            ..RawRecord::default()
        })
    }

    fn fallback(&self) -> Option<&FallbackPlan> {
        Some(&FALLBACK)
    }
}
