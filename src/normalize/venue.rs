use crate::config::Region;
use crate::models::Venue;

use super::clean_text;

const UNKNOWN_VENUE: &str = "TBA";

pub fn parse_venue(input: &str, region: &Region) -> Venue {
    let text = clean_text(input);
    let in_region = |name: String, address: String| Venue {
        name,
        address,
        city: region.city.clone(),
        state: region.state.clone(),
        country: region.country.clone(),
    };

    if text.is_empty() {
        return in_region(UNKNOWN_VENUE.to_string(), String::new());
    }
    if text.to_lowercase().contains("online") {
        return in_region(text, "Online".to_string());
    }

    let name = text
        .split(',')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_VENUE)
        .to_string();
    in_region(name, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_comma() {
        let venue = parse_venue(
            "Sydney Opera House, Bennelong Point, Sydney NSW",
            &Region::default(),
        );
        assert_eq!(venue.name, "Sydney Opera House");
        assert_eq!(venue.address, "Sydney Opera House, Bennelong Point, Sydney NSW");
        assert_eq!(venue.city, "Sydney");
        assert_eq!(venue.state, "NSW");
        assert_eq!(venue.country, "Australia");
    }

    #[test]
    fn empty_is_tba() {
        let venue = parse_venue("  ", &Region::default());
        assert_eq!(venue.name, "TBA");
        assert_eq!(venue.address, "");
        assert_eq!(venue.city, "Sydney");
    }

    #[test]
    fn online_events_keep_their_label() {
        let venue = parse_venue("Online event", &Region::default());
        assert_eq!(venue.name, "Online event");
        assert_eq!(venue.address, "Online");
    }

    #[test]
    fn leading_comma_falls_back_to_tba_name() {
        let venue = parse_venue(", George Street", &Region::default());
        assert_eq!(venue.name, "TBA");
        assert_eq!(venue.address, ", George Street");
    }
}
