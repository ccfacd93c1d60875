//! Demo events for local and staging databases.
//!
//! Seeding is idempotent per owner: once the owner has any event, nothing
//! is inserted.

use chrono::{DateTime, Duration, Months, NaiveTime, TimeZone, Utc};
use rand::Rng;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::metrics::QueryTimer;

/// Attendee limits are drawn from this range, inclusive.
pub const DEMO_LIMIT_RANGE: std::ops::RangeInclusive<i32> = 50..=500;

/// How far ahead of the seeding time an event is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ahead {
    Days(u32),
    Weeks(u32),
    Months(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct DemoEvent {
    pub name: &'static str,
    pub description: &'static str,
    pub ahead: Ahead,
    /// Start time as (hour, minute), UTC.
    pub starts_at: (u32, u32),
    pub image: &'static str,
}

impl DemoEvent {
    /// Event date relative to `now`, at the event's start time.
    pub fn date_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let day = match self.ahead {
            Ahead::Days(n) => now.checked_add_signed(Duration::days(i64::from(n)))?,
            Ahead::Weeks(n) => now.checked_add_signed(Duration::weeks(i64::from(n)))?,
            Ahead::Months(n) => now.checked_add_months(Months::new(n))?,
        };
        let (hour, minute) = self.starts_at;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        Some(Utc.from_utc_datetime(&day.date_naive().and_time(time)))
    }
}

const fn demo(
    name: &'static str,
    description: &'static str,
    ahead: Ahead,
    starts_at: (u32, u32),
    image: &'static str,
) -> DemoEvent {
    DemoEvent {
        name,
        description,
        ahead,
        starts_at,
        image,
    }
}

pub const DEMO_EVENTS: [DemoEvent; 18] = [
    demo(
        "Tech Conference 2025",
        "Join us for the biggest tech conference of the year! Featuring keynote speakers, workshops, and networking opportunities with industry leaders. Topics include AI, cloud computing, cybersecurity, and more.",
        Ahead::Months(2),
        (9, 0),
        "https://images.unsplash.com/photo-1505373877841-8d25f7d46678?w=800&h=600&fit=crop",
    ),
    demo(
        "Summer Music Festival",
        "A three-day outdoor music festival featuring top artists from around the world. Enjoy live performances, food vendors, and a vibrant atmosphere. Tickets are selling fast!",
        Ahead::Months(3),
        (14, 0),
        "https://images.unsplash.com/photo-1470229722913-7c0e2dbbafd3?w=800&h=600&fit=crop",
    ),
    demo(
        "Web Development Workshop",
        "Hands-on workshop covering modern web development techniques. Learn React, Vue.js, and Laravel from experienced developers. Perfect for both beginners and intermediate developers.",
        Ahead::Weeks(3),
        (10, 0),
        "https://images.unsplash.com/photo-1498050108023-c5249f4df085?w=800&h=600&fit=crop",
    ),
    demo(
        "Art Gallery Opening",
        "Exclusive opening night of our new contemporary art exhibition. Featuring works from emerging and established artists. Wine and refreshments will be served.",
        Ahead::Weeks(1),
        (18, 0),
        "https://images.unsplash.com/photo-1541961017774-22349e4a1262?w=800&h=600&fit=crop",
    ),
    demo(
        "Marathon Run 2025",
        "Join thousands of runners for the annual city marathon. Choose from full marathon, half marathon, or 5K routes. All proceeds go to local charities.",
        Ahead::Months(1),
        (7, 0),
        "https://images.unsplash.com/photo-1571008887538-b36bb32f4571?w=800&h=600&fit=crop",
    ),
    demo(
        "Food & Wine Tasting",
        "Experience a curated selection of fine wines paired with gourmet dishes from renowned chefs. Limited seating available. Reserve your spot today!",
        Ahead::Days(10),
        (19, 0),
        "https://images.unsplash.com/photo-1556910103-1c02745aae4d?w=800&h=600&fit=crop",
    ),
    demo(
        "Startup Pitch Night",
        "Watch innovative startups pitch their ideas to a panel of investors. Network with entrepreneurs, investors, and fellow startup enthusiasts. Free admission!",
        Ahead::Weeks(2),
        (18, 30),
        "https://images.unsplash.com/photo-1521737604893-d14cc237f11d?w=800&h=600&fit=crop",
    ),
    demo(
        "Yoga & Wellness Retreat",
        "A weekend retreat focused on mindfulness, yoga, and wellness. Includes meditation sessions, healthy meals, and workshops on stress management.",
        Ahead::Months(2),
        (8, 0),
        "https://images.unsplash.com/photo-1506126613408-eca07ce68773?w=800&h=600&fit=crop",
    ),
    demo(
        "Photography Exhibition",
        "Stunning collection of landscape and portrait photography from award-winning photographers. Exhibition runs for two weeks.",
        Ahead::Days(5),
        (11, 0),
        "https://images.unsplash.com/photo-1492691527719-9d1e07e534b4?w=800&h=600&fit=crop",
    ),
    demo(
        "Charity Gala Dinner",
        "Elegant black-tie event raising funds for children's education. Featuring live entertainment, silent auction, and a three-course dinner.",
        Ahead::Weeks(4),
        (19, 30),
        "https://images.unsplash.com/photo-1519167758481-83f550bb49b3?w=800&h=600&fit=crop",
    ),
    demo(
        "Hackathon 2025",
        "48-hour coding competition for developers. Build innovative solutions, compete for prizes, and network with fellow developers. Food and drinks provided.",
        Ahead::Months(1),
        (9, 0),
        "https://images.unsplash.com/photo-1531482615713-2afd69097998?w=800&h=600&fit=crop",
    ),
    demo(
        "Comedy Night",
        "An evening of laughter with stand-up comedians from across the country. Perfect for a fun night out with friends. 18+ event.",
        Ahead::Days(7),
        (20, 0),
        "https://images.unsplash.com/photo-1505373877841-8d25f7d46678?w=800&h=600&fit=crop",
    ),
    demo(
        "Book Launch Party",
        "Celebrate the release of the latest bestseller with the author. Book signing, Q&A session, and refreshments included.",
        Ahead::Weeks(2),
        (17, 0),
        "https://images.unsplash.com/photo-1481627834876-b7833e8f5570?w=800&h=600&fit=crop",
    ),
    demo(
        "Cycling Tour",
        "Guided cycling tour through scenic countryside routes. Suitable for all fitness levels. Bikes and safety equipment provided.",
        Ahead::Weeks(3),
        (8, 0),
        "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=800&h=600&fit=crop",
    ),
    demo(
        "Film Screening",
        "Exclusive screening of an award-winning independent film followed by a discussion with the director and cast members.",
        Ahead::Days(12),
        (19, 0),
        "https://images.unsplash.com/photo-1489599849927-2ee91cede3ba?w=800&h=600&fit=crop",
    ),
    demo(
        "Cooking Class",
        "Learn to cook authentic Italian cuisine from a professional chef. Hands-on experience with fresh ingredients. Take home recipes included.",
        Ahead::Days(8),
        (18, 0),
        "https://images.unsplash.com/photo-1556910103-1c02745aae4d?w=800&h=600&fit=crop",
    ),
    demo(
        "Science Fair",
        "Annual science fair showcasing innovative projects from students and researchers. Interactive exhibits and demonstrations for all ages.",
        Ahead::Weeks(5),
        (10, 0),
        "https://images.unsplash.com/photo-1532619675605-1ede6c9ed2d9?w=800&h=600&fit=crop",
    ),
    demo(
        "Jazz Concert",
        "Intimate jazz performance featuring renowned musicians. Enjoy smooth melodies in an elegant setting with full bar service.",
        Ahead::Days(15),
        (20, 30),
        "https://images.unsplash.com/photo-1470229722913-7c0e2dbbafd3?w=800&h=600&fit=crop",
    ),
];

/// One random attendee limit per demo event.
fn demo_limits() -> Vec<i32> {
    let mut rng = rand::thread_rng();
    DEMO_EVENTS
        .iter()
        .map(|_| rng.gen_range(DEMO_LIMIT_RANGE))
        .collect()
}

/// Creates the owner if needed and inserts the demo events for them.
///
/// Returns the number of events inserted; 0 when the owner already has events.
pub async fn seed_demo_events(
    pool: &PgPool,
    owner_email: &str,
    owner_name: &str,
) -> Result<usize, sqlx::Error> {
    let timer = QueryTimer::new("seed_demo_events");
    let result = insert_demo_events(pool, owner_email, owner_name).await;
    timer.record();
    result
}

async fn insert_demo_events(
    pool: &PgPool,
    owner_email: &str,
    owner_name: &str,
) -> Result<usize, sqlx::Error> {
    let limits = demo_limits();
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let (owner_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (name, email)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING id
        "#,
    )
    .bind(owner_name)
    .bind(owner_email)
    .fetch_one(&mut *tx)
    .await?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events WHERE user_id = $1")
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        tx.rollback().await?;
        info!(owner_id = %owner_id, existing, "Demo owner already has events, skipping seed");
        return Ok(0);
    }

    let mut inserted = 0;
    for (event, limit) in DEMO_EVENTS.iter().zip(limits) {
        let Some(date) = event.date_from(now) else {
            continue;
        };
        sqlx::query(
            r#"
            INSERT INTO events (user_id, name, description, event_date, image, attendee_limit)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(owner_id)
        .bind(event.name)
        .bind(event.description)
        .bind(date)
        .bind(event.image)
        .bind(limit)
        .execute(&mut *tx)
        .await?;
        inserted += 1;
    }

    tx.commit().await?;
    info!(owner_id = %owner_id, inserted, "Seeded demo events");

    Ok(inserted)
}
