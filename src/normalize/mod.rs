//! Turns [`RawRecord`]s into [`EventRecord`]s. Everything here is pure: no I/O,
//! and "today" is supplied by the caller.

pub mod category;
pub mod date;
pub mod price;
pub mod venue;

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::Region;
use crate::models::{EventRecord, Organizer, RawRecord, Source};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record has no title")]
    MissingTitle,
    #[error("record {title:?} has no original url")]
    MissingUrl { title: String },
    #[error("record {title:?} has unparseable date {text:?}")]
    UnparseableDate { title: String, text: String },
}

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct Normalizer {
    region: Region,
    today: NaiveDate,
}

impl Normalizer {
    pub fn new(region: Region) -> Self {
        let today = region.today();
        Self { region, today }
    }

    pub fn with_today(region: Region, today: NaiveDate) -> Self {
        Self { region, today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn normalize(&self, raw: RawRecord) -> Result<EventRecord, NormalizeError> {
        let title = clean_text(&raw.title);
        if title.is_empty() {
            return Err(NormalizeError::MissingTitle);
        }

        let original_url = raw.original_url.trim().to_string();
        if original_url.is_empty() {
            return Err(NormalizeError::MissingUrl { title });
        }

        let date = date::parse_date(&raw.date_text, self.today).ok_or_else(|| {
            NormalizeError::UnparseableDate {
                title: title.clone(),
                text: raw.date_text.clone(),
            }
        })?;

        let time = raw
            .time_text
            .as_deref()
            .map(clean_text)
            .filter(|time| !time.is_empty())
            .unwrap_or_else(|| date::extract_time(&raw.date_text));

        let description = Some(clean_text(&raw.description))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| title.clone());

        let group = raw.group.as_deref().filter(|g| !g.trim().is_empty());
        let category = raw
            .category_hint
            .unwrap_or_else(|| category::categorize(&title, &description, group));
        let tags = match raw.tags_hint {
            Some(hint) => dedup(hint),
            None => category::extract_tags(&title, &description, group),
        };

        let organizer = raw
            .organizer
            .as_deref()
            .or(group)
            .map(clean_text)
            .filter(|name| !name.is_empty())
            .map(|name| Organizer {
                name,
                url: original_url.clone(),
            });

        Ok(EventRecord {
            venue: venue::parse_venue(&raw.venue_text, &self.region),
            price: price::parse_price(&raw.price_text, &self.region.currency),
            image_url: raw.image_url.trim().to_string(),
            source: raw.source.unwrap_or(Source::Other),
            is_active: true,
            title,
            description,
            date,
            time,
            category,
            original_url,
            organizer,
            tags,
        })
    }
}

fn dedup(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
