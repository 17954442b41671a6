//! Synthetic listings with no network dependency, for demos and for exercising
//! normalization and storage on their own.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::SourceAdapter;
use crate::config::Region;
use crate::models::{Category, RawRecord, Source};

const SOURCE_ID: &str = "synthetic";
const SOURCE_NAME: &str = "Synthetic listings";
const URL: &str = "https://www.eventbrite.com.au/e/";
const BATCH_SIZE: usize = 15;
const HORIZON_DAYS: i64 = 30;

struct Template {
    title: &'static str,
    description: &'static str,
    category: Category,
    venue: &'static str,
    price: &'static str,
    tags: &'static [&'static str],
}

const TEMPLATES: &[Template] = &[
    Template {
        title: "Sydney Tech Meetup - AI & Machine Learning",
        description: "Join us for an exciting evening discussing the latest trends in AI and machine learning. Network with fellow tech enthusiasts and learn from industry experts.",
        category: Category::Technology,
        venue: "The Sydney Startup Hub, 11 York Street, Sydney NSW",
        price: "Free",
        tags: &["networking", "workshop", "tech", "ai"],
    },
    Template {
        title: "Sydney Symphony Orchestra - Classical Night",
        description: "Experience a magical evening with Sydney's premier orchestra performing classical masterpieces from Mozart, Beethoven, and Chopin.",
        category: Category::Music,
        venue: "Sydney Opera House, Bennelong Point, Sydney NSW",
        price: "$45 - $120",
        tags: &["concert", "classical", "music"],
    },
    Template {
        title: "Business Networking Breakfast",
        description: "Connect with Sydney's business leaders over breakfast. Great opportunity for entrepreneurs and professionals to expand their network.",
        category: Category::Business,
        venue: "Hilton Sydney, 488 George Street, Sydney NSW",
        price: "$35",
        tags: &["networking", "business", "breakfast"],
    },
    Template {
        title: "Contemporary Art Exhibition Opening",
        description: "Discover emerging Australian artists in this curated contemporary art exhibition. Wine and canapés provided.",
        category: Category::Arts,
        venue: "Art Gallery of NSW, Art Gallery Road, The Domain NSW",
        price: "Free",
        tags: &["exhibition", "art", "opening"],
    },
    Template {
        title: "Sydney Harbour Bridge Climb",
        description: "Experience breathtaking 360-degree views of Sydney from the top of the iconic Harbour Bridge.",
        category: Category::Sports,
        venue: "BridgeClimb Sydney, 3 Cumberland Street, The Rocks NSW",
        price: "$174 - $388",
        tags: &["adventure", "tourism", "sports"],
    },
    Template {
        title: "Cooking Class - Modern Australian Cuisine",
        description: "Learn to cook modern Australian dishes with native ingredients. Hands-on class with professional chef.",
        category: Category::Food,
        venue: "Sydney Cooking School, 4 Glebe Point Road, Glebe NSW",
        price: "$95",
        tags: &["workshop", "cooking", "food"],
    },
    Template {
        title: "Yoga in the Park",
        description: "Start your weekend with a peaceful yoga session in the beautiful Royal Botanic Gardens. All levels welcome.",
        category: Category::Health,
        venue: "Royal Botanic Gardens, Mrs Macquaries Road, Sydney NSW",
        price: "Free",
        tags: &["yoga", "wellness", "outdoor"],
    },
    Template {
        title: "Digital Marketing Workshop",
        description: "Learn the latest digital marketing strategies and tools. Perfect for small business owners and marketing professionals.",
        category: Category::Education,
        venue: "University of Technology Sydney, 15 Broadway, Ultimo NSW",
        price: "$75",
        tags: &["workshop", "education", "marketing"],
    },
    Template {
        title: "Sydney Startup Pitch Night",
        description: "Watch innovative startups pitch their ideas to investors and vote for your favorite. Networking drinks included.",
        category: Category::Business,
        venue: "Tank Stream Labs, 15 Blue Street, North Sydney NSW",
        price: "$25",
        tags: &["startup", "networking", "pitch"],
    },
    Template {
        title: "Jazz Night at The Basement",
        description: "Enjoy smooth jazz performances by local and international artists in Sydney's premier jazz venue.",
        category: Category::Music,
        venue: "The Basement, 29 Reiby Place, Circular Quay NSW",
        price: "$30 - $50",
        tags: &["jazz", "music", "concert"],
    },
];

pub struct SyntheticAdapter {
    region: Region,
    seed: Option<u64>,
}

impl SyntheticAdapter {
    pub fn new(region: Region) -> Self {
        Self { region, seed: None }
    }

    /// Same seed and same day give the same batch.
    pub fn seeded(region: Region, seed: u64) -> Self {
        Self {
            region,
            seed: Some(seed),
        }
    }

    pub fn generate(&self, today: NaiveDate) -> Vec<RawRecord> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let organizer = format!("{} Events Organizer", self.region.city);

        (0..BATCH_SIZE)
            .map(|idx| {
                let template = &TEMPLATES[idx % TEMPLATES.len()];
                let date = today + Duration::days(rng.gen_range(1..=HORIZON_DAYS));
                let hour: u32 = rng.gen_range(9..=20);
                let minute = if rng.gen_bool(0.5) { 0 } else { 30 };
                let title = if idx >= TEMPLATES.len() {
                    format!("{} #{}", template.title, idx / TEMPLATES.len() + 1)
                } else {
                    template.title.to_string()
                };

                RawRecord {
                    title,
                    description: template.description.to_string(),
                    date_text: date.format("%Y-%m-%d").to_string(),
                    time_text: Some(twelve_hour(hour, minute)),
                    venue_text: template.venue.to_string(),
                    price_text: template.price.to_string(),
                    image_url: format!("https://picsum.photos/400/300?random={idx}"),
                    original_url: format!(
                        "{URL}sydney-tech-meetup-ai-machine-learning-{}",
                        idx + 1
                    ),
                    organizer: Some(organizer.clone()),
                    category_hint: Some(template.category),
                    tags_hint: Some(template.tags.iter().map(|t| t.to_string()).collect()),
                    source: Some(Source::Synthetic),
                    ..RawRecord::default()
                }
            })
            .collect()
    }
}

fn twelve_hour(hour: u32, minute: u32) -> String {
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display = if hour > 12 { hour - 12 } else { hour };
    format!("{display}:{minute:02} {period}")
}

#[async_trait]
impl SourceAdapter for SyntheticAdapter {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn url(&self) -> &'static str {
        URL
    }

    async fn scrape(&self) -> Vec<RawRecord> {
        let records = self.generate(self.region.today());
        info!(adapter = SOURCE_ID, count = records.len(), "generated synthetic listings");
        records
    }
}
