//! Keyword heuristics for category and tags.
//!
//! Rules are checked top to bottom and the first hit wins, so the order below
//! is part of the behaviour: specific technology words sit above the generic
//! business vocabulary ("tech startup" is Technology, "startup" alone is
//! Business).

use crate::models::Category;

#[derive(Clone, Copy, Debug)]
enum Keyword {
    /// Matches anywhere in the text.
    Part(&'static str),
    /// Matches a whole word only; for short words that hide inside others.
    Word(&'static str),
}

use Keyword::{Part, Word};

const RULES: &[(Category, &[Keyword])] = &[
    (
        Category::Technology,
        &[
            Part("tech"),
            Part("coding"),
            Part("programming"),
            Part("developer"),
            Part("software"),
            Part("machine learning"),
            Part("artificial intelligence"),
            Part("data science"),
            Word("ai"),
        ],
    ),
    (
        Category::Business,
        &[
            Part("business"),
            Part("entrepreneur"),
            Part("startup"),
            Part("networking"),
            Part("conference"),
            Part("marketing"),
        ],
    ),
    (
        Category::Health,
        &[
            Part("health"),
            Part("fitness"),
            Part("wellness"),
            Part("yoga"),
            Part("meditation"),
        ],
    ),
    (
        Category::Arts,
        &[
            Word("art"),
            Word("arts"),
            Part("artist"),
            Part("gallery"),
            Part("exhibition"),
            Part("design"),
            Part("creative"),
            Part("photography"),
            Part("theatre"),
        ],
    ),
    (
        Category::Education,
        &[
            Part("education"),
            Part("learning"),
            Part("skill"),
            Part("workshop"),
            Part("course"),
            Part("seminar"),
        ],
    ),
    (
        Category::Food,
        &[
            Part("food"),
            Part("cooking"),
            Part("wine"),
            Part("dining"),
            Part("restaurant"),
            Part("culinary"),
        ],
    ),
    (
        Category::Music,
        &[
            Part("music"),
            Part("concert"),
            Word("band"),
            Part("singing"),
            Part("jazz"),
            Part("orchestra"),
        ],
    ),
    (
        Category::Sports,
        &[
            Part("sport"),
            Part("running"),
            Word("run"),
            Part("hiking"),
            Part("cycling"),
            Part("marathon"),
        ],
    ),
];

const TAG_VOCABULARY: &[&str] = &[
    "networking",
    "workshop",
    "conference",
    "exhibition",
    "festival",
    "seminar",
    "meetup",
    "community",
    "professional",
    "beginner",
    "advanced",
    "free",
];

pub fn categorize(title: &str, description: &str, group: Option<&str>) -> Category {
    let text = combined(title, description, group);
    let words = words(&text);

    RULES
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|keyword| match keyword {
                Part(part) => text.contains(part),
                Word(word) => words.contains(word),
            })
        })
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

pub fn extract_tags(title: &str, description: &str, group: Option<&str>) -> Vec<String> {
    let text = combined(title, description, group);
    TAG_VOCABULARY
        .iter()
        .filter(|keyword| text.contains(*keyword))
        .map(|keyword| keyword.to_string())
        .collect()
}

fn combined(title: &str, description: &str, group: Option<&str>) -> String {
    format!("{} {} {}", title, description, group.unwrap_or_default()).to_lowercase()
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}
