//! Paginated feed reads.
//!
//! Posts are ordered newest first with the post id as a tie break, so a
//! cursor taken from the last row of one page resumes exactly where that
//! page stopped.

mod cursor;
pub mod timestamp;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;

pub use self::cursor::{CursorError, FeedCursor};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

/// One feed entry with its author's identity joined in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: String,
    pub user_id: String,
    pub image: String,
    pub caption: String,
    #[serde(serialize_with = "timestamp::serialize")]
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub user_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub posts: Vec<FeedPost>,
    pub next_cursor: Option<FeedCursor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedFilter {
    pub user_id: Option<String>,
    pub cursor: Option<FeedCursor>,
    pub limit: usize,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            cursor: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Resolves the client's `limit` parameter.
///
/// Absent, non-numeric and non-positive values fall back to the default.
/// Leading integer prefixes are honoured (`"7abc"` is 7). The result never
/// exceeds [`MAX_LIMIT`].
pub fn clamp_limit(raw: Option<&str>) -> usize {
    let parsed = raw.and_then(leading_integer).filter(|n| *n > 0);
    match parsed {
        Some(n) => usize::try_from(n).unwrap_or(MAX_LIMIT).min(MAX_LIMIT),
        None => DEFAULT_LIMIT,
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let sign_len = usize::from(trimmed.starts_with(['-', '+']));
    let digits = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    match trimmed[..sign_len + digits].parse::<i64>() {
        Ok(n) => Some(n),
        // Overflowing digit runs are still "a big positive number" or "negative".
        Err(_) if trimmed.starts_with('-') => Some(-1),
        Err(_) => Some(i64::MAX),
    }
}

/// Reads one page of the feed.
pub fn list_posts(conn: &Connection, filter: &FeedFilter) -> rusqlite::Result<FeedPage> {
    let limit = filter.limit.clamp(1, MAX_LIMIT);

    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(user_id) = &filter.user_id {
        clauses.push("p.user_id = ?");
        args.push(Value::Text(user_id.clone()));
    }

    if let Some(cursor) = &filter.cursor {
        let ts = cursor.created_at_text();
        match &cursor.id {
            Some(id) => {
                clauses.push("(p.created_at < ? OR (p.created_at = ? AND p.id < ?))");
                args.push(Value::Text(ts.clone()));
                args.push(Value::Text(ts));
                args.push(Value::Text(id.clone()));
            }
            None => {
                clauses.push("p.created_at < ?");
                args.push(Value::Text(ts));
            }
        }
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    // One extra row tells us whether another page exists.
    args.push(Value::Integer((limit + 1) as i64));

    let sql = format!(
        "SELECT p.id, p.user_id, p.image, p.caption, p.created_at, u.name, u.image
         FROM posts p
         JOIN users u ON u.id = p.user_id
         {where_sql}
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut posts = stmt
        .query_map(params_from_iter(args), |row| {
            let created_at: String = row.get(4)?;
            let created_at = timestamp::parse(&created_at).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
            })?;
            Ok(FeedPost {
                id: row.get(0)?,
                user_id: row.get(1)?,
                image: row.get(2)?,
                caption: row.get(3)?,
                created_at,
                user_name: row.get(5)?,
                user_image: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let has_more = posts.len() > limit;
    posts.truncate(limit);

    let next_cursor = if has_more {
        posts
            .last()
            .map(|last| FeedCursor::after(last.created_at, last.id.clone()))
    } else {
        None
    };

    Ok(FeedPage { posts, next_cursor })
}
