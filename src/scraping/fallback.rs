//! Placeholder listings for sources that came back empty. Every record is
//! marked [`Source::Synthetic`] so it can be told apart from live data.

use chrono::{Duration, NaiveDate};

use crate::models::{RawRecord, Source};

#[derive(Debug, Clone, Copy)]
pub struct FallbackTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub venue: &'static str,
    pub group: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct FallbackPlan {
    pub templates: &'static [FallbackTemplate],
    pub spacing_days: i64,
    pub time: &'static str,
}

/// Template `i` lands on `today + (i + 1) * spacing_days`.
pub fn synthesize(plan: &FallbackPlan, today: NaiveDate) -> Vec<RawRecord> {
    plan.templates
        .iter()
        .zip(1_i64..)
        .map(|(template, slot)| {
            let date = today + Duration::days(slot * plan.spacing_days);
            RawRecord {
                title: template.title.to_string(),
                description: template.description.to_string(),
                date_text: date.format("%Y-%m-%d").to_string(),
                time_text: Some(plan.time.to_string()),
                venue_text: template.venue.to_string(),
                original_url: template.url.to_string(),
                group: Some(template.group.to_string()),
                organizer: Some(template.group.to_string()),
                source: Some(Source::Synthetic),
                ..RawRecord::default()
            }
        })
        .collect()
}
