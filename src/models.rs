use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Music,
    Arts,
    Sports,
    Technology,
    Business,
    Food,
    Health,
    Education,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Music,
        Category::Arts,
        Category::Sports,
        Category::Technology,
        Category::Business,
        Category::Food,
        Category::Health,
        Category::Education,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Music => "Music",
            Category::Arts => "Arts",
            Category::Sports => "Sports",
            Category::Technology => "Technology",
            Category::Business => "Business",
            Category::Food => "Food",
            Category::Health => "Health",
            Category::Education => "Education",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Where a record came from. `Synthetic` covers both the demo adapter and
/// fallback synthesis, so placeholder data is never mistaken for a live listing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Eventbrite,
    Meetup,
    Synthetic,
    Other,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Eventbrite => "eventbrite",
            Source::Meetup => "meetup",
            Source::Synthetic => "synthetic",
            Source::Other => "other",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eventbrite" => Ok(Source::Eventbrite),
            "meetup" => Ok(Source::Meetup),
            "synthetic" => Ok(Source::Synthetic),
            "other" => Ok(Source::Other),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Venue {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Price {
    pub min: f64,
    pub max: f64,
    pub currency: String,
    pub is_free: bool,
}

impl Price {
    pub fn free(currency: &str) -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            currency: currency.to_string(),
            is_free: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Organizer {
    pub name: String,
    pub url: String,
}

/// A normalized listing, ready for the store. `original_url` is the identity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub venue: Venue,
    pub price: Price,
    pub category: Category,
    pub image_url: String,
    pub original_url: String,
    pub source: Source,
    pub organizer: Option<Organizer>,
    pub tags: Vec<String>,
    pub is_active: bool,
}

/// A persisted record plus the bookkeeping the store maintains.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoredEvent {
    #[serde(flatten)]
    pub event: EventRecord,
    pub scraped_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What an adapter pulls off a page before any interpretation. All fields are
/// free text; the hints are only set by sources that already know the answer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawRecord {
    pub title: String,
    pub description: String,
    pub date_text: String,
    pub time_text: Option<String>,
    pub venue_text: String,
    pub price_text: String,
    pub image_url: String,
    pub original_url: String,
    pub group: Option<String>,
    pub organizer: Option<String>,
    pub category_hint: Option<Category>,
    pub tags_hint: Option<Vec<String>>,
    pub source: Option<Source>,
}

impl RawRecord {
    /// A record worth handing to the normalizers: something to call it, somewhere
    /// to find it, and some date text to interpret.
    pub fn is_viable(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.original_url.trim().is_empty()
            && !self.date_text.trim().is_empty()
    }
}
