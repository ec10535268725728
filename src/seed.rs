//! Demo data for local development.

use chrono::Duration;
use rusqlite::params;

use crate::feed::timestamp;
use crate::state::DbPool;

struct SeedUser {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    image: &'static str,
}

// Fixed ids so re-running the seeder does not duplicate users.
const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        id: "seed-user-alex-000000000001",
        name: "Alex Chen",
        email: "alex@example.com",
        image: "https://api.dicebear.com/7.x/avataaars/svg?seed=alex",
    },
    SeedUser {
        id: "seed-user-jordan-00000000002",
        name: "Jordan Taylor",
        email: "jordan@example.com",
        image: "https://api.dicebear.com/7.x/avataaars/svg?seed=jordan",
    },
    SeedUser {
        id: "seed-user-sam-000000000003",
        name: "Sam Williams",
        email: "sam@example.com",
        image: "https://api.dicebear.com/7.x/avataaars/svg?seed=sam",
    },
];

/// (author index, caption)
const SEED_POSTS: &[(usize, &str)] = &[
    (0, "Just wrapped up an amazing study session! 📚"),
    (0, "Campus views never get old"),
    (1, "New project incoming 🚀"),
    (1, "Coffee and code – the perfect combo"),
    (1, "Collaboration is key!"),
    (2, "Sunset study vibes"),
    (2, "Breakthrough moment today"),
    (0, "Weekend mode activated"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users_added: usize,
    pub posts_added: usize,
}

/// Inserts the demo users (skipping existing ones) and one batch of posts,
/// spaced an hour apart and ending an hour before now.
pub fn seed(pool: &DbPool) -> anyhow::Result<SeedReport> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let now = timestamp::now();

    let mut users_added = 0;
    for user in SEED_USERS {
        let ts = timestamp::format(&now);
        users_added += tx.execute(
            "INSERT OR IGNORE INTO users (id, name, email, image, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user.id, user.name, user.email, user.image, ts],
        )?;
        tracing::info!("Seeded user: {}", user.name);
    }

    let total = SEED_POSTS.len() as i64;
    for (i, (author, caption)) in SEED_POSTS.iter().enumerate() {
        let created_at = now - Duration::hours(total - i as i64);
        tx.execute(
            "INSERT INTO posts (id, user_id, image, caption, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid::Uuid::now_v7().to_string(),
                SEED_USERS[*author].id,
                format!("https://picsum.photos/seed/slammedu{}/600/600", i),
                caption,
                timestamp::format(&created_at),
            ],
        )?;
    }

    tx.commit()?;
    tracing::info!("Seeded {} posts", SEED_POSTS.len());

    Ok(SeedReport {
        users_added,
        posts_added: SEED_POSTS.len(),
    })
}
