use scraper::{ElementRef, Selector};

pub use crate::normalize::clean_text;

const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "protection",
    "blocked",
    "are you a robot",
    "unusual traffic",
];

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

pub fn absolute_url(base: &str, href: Option<String>) -> Option<String> {
    let href = href?;
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base_url = reqwest::Url::parse(base).ok()?;
    base_url.join(href).ok().map(|u| u.to_string())
}

/// Whether a page looks like an anti-bot interstitial rather than listings.
pub fn looks_blocked(html: &str) -> Option<&'static str> {
    let lower = html.to_lowercase();
    BLOCK_MARKERS
        .iter()
        .copied()
        .find(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn text_helpers_clean_whitespace() {
        let document = Html::parse_fragment("<div><p>  Jazz \n  Night </p><p></p></div>");
        let div = Selector::parse("div").expect("div");
        let p = Selector::parse("p").expect("p");
        let root = document.select(&div).next().expect("root");
        assert_eq!(first_text(&root, &p).as_deref(), Some("Jazz Night"));
        assert_eq!(inner_text(root), "Jazz Night");
    }

    #[test]
    fn relative_links_resolve_against_page() {
        assert_eq!(
            absolute_url("https://www.meetup.com/find/", Some("/sydney/events/1".into()))
                .as_deref(),
            Some("https://www.meetup.com/sydney/events/1")
        );
        assert_eq!(
            absolute_url("https://x.test/", Some("https://y.test/e".into())).as_deref(),
            Some("https://y.test/e")
        );
        assert_eq!(absolute_url("https://x.test/", Some("  ".into())), None);
        assert_eq!(absolute_url("https://x.test/", None), None);
    }

    #[test]
    fn block_pages_are_recognised() {
        assert_eq!(
            looks_blocked("<h1>Please complete the CAPTCHA</h1>"),
            Some("captcha")
        );
        assert_eq!(looks_blocked("<div class=\"event-card\"></div>"), None);
    }
}
