use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};

use crate::models::{Category, EventRecord, Organizer, Price, Source, StoredEvent, Venue};
use crate::utils;

const EVENT_COLUMNS: &str = "title, description, date, time,
    venue_name, venue_address, venue_city, venue_state, venue_country,
    price_min, price_max, price_currency, price_is_free,
    category, image_url, original_url, source,
    organizer_name, organizer_url, tags, is_active,
    scraped_at, updated_at";

pub struct Store {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Read-side query. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<Category>,
    pub active: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

impl Store {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events(
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                venue_name TEXT NOT NULL,
                venue_address TEXT NOT NULL,
                venue_city TEXT NOT NULL,
                venue_state TEXT NOT NULL,
                venue_country TEXT NOT NULL,
                price_min REAL NOT NULL,
                price_max REAL NOT NULL,
                price_currency TEXT NOT NULL,
                price_is_free INTEGER NOT NULL,
                category TEXT NOT NULL,
                image_url TEXT NOT NULL,
                original_url TEXT NOT NULL UNIQUE,
                source TEXT NOT NULL,
                organizer_name TEXT,
                organizer_url TEXT,
                tags TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                scraped_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS events_date_active ON events(date, is_active);
            CREATE INDEX IF NOT EXISTS events_category_date ON events(category, date);",
        )?;
        Ok(())
    }

    /// Health probe run before a pipeline touches any adapter.
    pub fn ping(&self) -> rusqlite::Result<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))
    }

    /// Inserts a new record or overwrites every field of the existing one with
    /// the same `original_url`. `scraped_at` survives updates.
    pub fn upsert_event(&self, event: &EventRecord) -> rusqlite::Result<UpsertOutcome> {
        let now = timestamp(Utc::now());
        let tags = serde_json::to_string(&event.tags)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
        let (organizer_name, organizer_url) = match &event.organizer {
            Some(org) => (Some(org.name.as_str()), Some(org.url.as_str())),
            None => (None, None),
        };

        // Write lock up front: a deferred read-then-write upgrade under WAL
        // fails with SQLITE_BUSY_SNAPSHOT without consulting busy_timeout.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let existed = tx
            .query_row(
                "SELECT 1 FROM events WHERE original_url = ?1",
                params![event.original_url],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        tx.execute(
            &format!(
                "INSERT INTO events ({EVENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                         ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?22)
                 ON CONFLICT(original_url) DO UPDATE SET
                   title = excluded.title,
                   description = excluded.description,
                   date = excluded.date,
                   time = excluded.time,
                   venue_name = excluded.venue_name,
                   venue_address = excluded.venue_address,
                   venue_city = excluded.venue_city,
                   venue_state = excluded.venue_state,
                   venue_country = excluded.venue_country,
                   price_min = excluded.price_min,
                   price_max = excluded.price_max,
                   price_currency = excluded.price_currency,
                   price_is_free = excluded.price_is_free,
                   category = excluded.category,
                   image_url = excluded.image_url,
                   source = excluded.source,
                   organizer_name = excluded.organizer_name,
                   organizer_url = excluded.organizer_url,
                   tags = excluded.tags,
                   is_active = excluded.is_active,
                   updated_at = excluded.updated_at"
            ),
            params![
                event.title,
                event.description,
                event.date,
                event.time,
                event.venue.name,
                event.venue.address,
                event.venue.city,
                event.venue.state,
                event.venue.country,
                event.price.min,
                event.price.max,
                event.price.currency,
                event.price.is_free,
                event.category.as_str(),
                event.image_url,
                event.original_url,
                event.source.as_str(),
                organizer_name,
                organizer_url,
                tags,
                event.is_active,
                now,
            ],
        )?;
        tx.commit()?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    /// Deactivates active records dated strictly before `cutoff` and returns
    /// how many were touched.
    pub fn sweep(&self, cutoff: NaiveDate) -> rusqlite::Result<usize> {
        let now = timestamp(Utc::now());
        self.conn.execute(
            "UPDATE events SET is_active = 0, updated_at = ?2
             WHERE date < ?1 AND is_active = 1",
            params![cutoff, now],
        )
    }

    pub fn get_event(&self, original_url: &str) -> rusqlite::Result<Option<StoredEvent>> {
        self.conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE original_url = ?1"),
                params![original_url],
                row_to_event,
            )
            .optional()
    }

    pub fn count_events(&self, active_only: bool) -> rusqlite::Result<usize> {
        let sql = if active_only {
            "SELECT COUNT(*) FROM events WHERE is_active = 1"
        } else {
            "SELECT COUNT(*) FROM events"
        };
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn find_events(&self, filter: &EventFilter) -> rusqlite::Result<Vec<StoredEvent>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(from) = filter.from {
            clauses.push("date >= ?");
            args.push(Box::new(from));
        }
        if let Some(to) = filter.to {
            clauses.push("date <= ?");
            args.push(Box::new(to));
        }
        if let Some(category) = filter.category {
            clauses.push("category = ?");
            args.push(Box::new(category.as_str()));
        }
        if let Some(active) = filter.active {
            clauses.push("is_active = ?");
            args.push(Box::new(active));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push(
                "(title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\' \
                 OR venue_name LIKE ? ESCAPE '\\')",
            );
            let pattern = format!("%{}%", escape_like(search));
            for _ in 0..3 {
                args.push(Box::new(pattern.clone()));
            }
        }

        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY date ASC, time ASC, title ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push(Box::new(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), row_to_event)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn parse_timestamp(idx: usize, text: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| conversion_error(idx, err))
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<StoredEvent> {
    let category: String = row.get(13)?;
    let source: String = row.get(16)?;
    let organizer_name: Option<String> = row.get(17)?;
    let organizer_url: Option<String> = row.get(18)?;
    let tags: String = row.get(19)?;

    let event = EventRecord {
        title: row.get(0)?,
        description: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        venue: Venue {
            name: row.get(4)?,
            address: row.get(5)?,
            city: row.get(6)?,
            state: row.get(7)?,
            country: row.get(8)?,
        },
        price: Price {
            min: row.get(9)?,
            max: row.get(10)?,
            currency: row.get(11)?,
            is_free: row.get(12)?,
        },
        category: category
            .parse::<Category>()
            .map_err(|err| conversion_error(13, err))?,
        image_url: row.get(14)?,
        original_url: row.get(15)?,
        source: source
            .parse::<Source>()
            .map_err(|err| conversion_error(16, err))?,
        organizer: organizer_name.map(|name| Organizer {
            name,
            url: organizer_url.unwrap_or_default(),
        }),
        tags: serde_json::from_str(&tags).map_err(|err| conversion_error(19, err))?,
        is_active: row.get(20)?,
    };

    Ok(StoredEvent {
        event,
        scraped_at: parse_timestamp(21, row.get(21)?)?,
        updated_at: parse_timestamp(22, row.get(22)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn record(url: &str, title: &str, on: NaiveDate) -> EventRecord {
        EventRecord {
            title: title.to_string(),
            description: format!("{title} description"),
            date: on,
            time: "7:00 PM".to_string(),
            venue: Venue {
                name: "Town Hall".to_string(),
                address: "Town Hall, George St".to_string(),
                city: "Sydney".to_string(),
                state: "NSW".to_string(),
                country: "Australia".to_string(),
            },
            price: Price::free("AUD"),
            category: Category::Music,
            image_url: String::new(),
            original_url: url.to_string(),
            source: Source::Eventbrite,
            organizer: Some(Organizer {
                name: "Eventbrite Organizer".to_string(),
                url: url.to_string(),
            }),
            tags: vec!["concert".to_string()],
            is_active: true,
        }
    }

    #[test]
    fn upsert_creates_then_overwrites() {
        let store = Store::open_in_memory().expect("store");
        let url = "https://example.com/e/1";

        let first = record(url, "Jazz Night", date(2024, 1, 20));
        assert_eq!(store.upsert_event(&first).expect("insert"), UpsertOutcome::Created);
        let stored = store.get_event(url).expect("get").expect("present");

        let mut second = record(url, "Jazz Night (moved)", date(2024, 1, 27));
        second.price = Price {
            min: 20.0,
            max: 40.0,
            currency: "AUD".to_string(),
            is_free: false,
        };
        second.organizer = None;
        assert_eq!(store.upsert_event(&second).expect("update"), UpsertOutcome::Updated);

        assert_eq!(store.count_events(false).expect("count"), 1);
        let updated = store.get_event(url).expect("get").expect("present");
        assert_eq!(updated.event, second);
        assert_eq!(updated.scraped_at, stored.scraped_at);
        assert!(updated.updated_at >= stored.updated_at);
    }

    #[test]
    fn sweep_deactivates_only_past_records() {
        let store = Store::open_in_memory().expect("store");
        let yesterday = date(2024, 1, 16);
        store
            .upsert_event(&record("https://example.com/old", "Old", date(2024, 1, 15)))
            .expect("old");
        store
            .upsert_event(&record("https://example.com/edge", "Edge", yesterday))
            .expect("edge");
        store
            .upsert_event(&record("https://example.com/new", "New", date(2024, 1, 18)))
            .expect("new");

        assert_eq!(store.sweep(yesterday).expect("sweep"), 1);
        assert_eq!(store.sweep(yesterday).expect("sweep again"), 0);

        let active = store
            .find_events(&EventFilter {
                active: Some(true),
                ..EventFilter::default()
            })
            .expect("find");
        let titles: Vec<_> = active.iter().map(|e| e.event.title.as_str()).collect();
        assert_eq!(titles, vec!["Edge", "New"]);
    }

    #[test]
    fn filters_combine() {
        let store = Store::open_in_memory().expect("store");
        let mut talk = record("https://example.com/talk", "Rust 100% Talk", date(2024, 2, 1));
        talk.category = Category::Technology;
        store.upsert_event(&talk).expect("talk");
        store
            .upsert_event(&record("https://example.com/gig", "Harbour Gig", date(2024, 2, 3)))
            .expect("gig");

        let by_category = store
            .find_events(&EventFilter {
                category: Some(Category::Technology),
                ..EventFilter::default()
            })
            .expect("category");
        assert_eq!(by_category.len(), 1);

        let by_search = store
            .find_events(&EventFilter {
                search: Some("100%".to_string()),
                ..EventFilter::default()
            })
            .expect("search");
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].event.title, "Rust 100% Talk");

        let windowed = store
            .find_events(&EventFilter {
                from: Some(date(2024, 2, 2)),
                limit: Some(5),
                ..EventFilter::default()
            })
            .expect("window");
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].event.title, "Harbour Gig");
    }

    #[test]
    fn file_store_reopens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data/events.sqlite");
        {
            let store = Store::open(&path).expect("open");
            store
                .upsert_event(&record("https://example.com/e/9", "Persisted", date(2024, 3, 1)))
                .expect("insert");
        }
        let store = Store::open(&path).expect("reopen");
        store.ping().expect("ping");
        assert_eq!(store.count_events(true).expect("count"), 1);
    }

    #[test]
    fn concurrent_writers_share_one_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.sqlite");
        Store::open(&path).expect("create");
        let url = "https://example.com/e/shared";

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = Store::open(&path).expect("open");
                    let mut created = 0;
                    for round in 0..100 {
                        let title = format!("Shared {writer}-{round}");
                        match store.upsert_event(&record(url, &title, date(2024, 5, 1))) {
                            Ok(UpsertOutcome::Created) => created += 1,
                            Ok(UpsertOutcome::Updated) => {}
                            Err(err) => panic!("writer {writer} lost a write: {err}"),
                        }
                    }
                    created
                })
            })
            .collect();

        let created: usize = writers
            .into_iter()
            .map(|handle| handle.join().expect("writer"))
            .sum();
        assert_eq!(created, 1);

        let store = Store::open(&path).expect("reopen");
        assert_eq!(store.count_events(false).expect("count"), 1);
    }
}
