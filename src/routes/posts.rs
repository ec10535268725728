use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::Post;
use crate::error::{AppError, AppResult};
use crate::extractors::{parse_json, CurrentUser};
use crate::feed::{self, timestamp, FeedCursor, FeedFilter, FeedPage};
use crate::state::AppState;

// --- Query / body types ---

#[derive(Debug, Default)]
pub struct ListPostsQuery {
    pub cursor: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<String>,
}

/// Body of `POST /posts`. Fields are loosely typed so a wrong type is a
/// validation error rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub image: Value,
    #[serde(default)]
    pub caption: Value,
}

impl ListPostsQuery {
    /// Reads `cursor`, `userId` and `limit` from a raw query string. Repeated
    /// keys keep their first value; unknown keys are ignored.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        let pairs = url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes());
        for (key, value) in pairs {
            let slot = match &*key {
                "cursor" => &mut query.cursor,
                "userId" => &mut query.user_id,
                "limit" => &mut query.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        query
    }

    pub fn into_filter(self) -> AppResult<FeedFilter> {
        let cursor = non_empty(self.cursor)
            .map(|raw| raw.parse::<FeedCursor>())
            .transpose()
            .map_err(|_| AppError::BadRequest("Invalid cursor".into()))?;

        Ok(FeedFilter {
            user_id: non_empty(self.user_id),
            cursor,
            limit: feed::clamp_limit(self.limit.as_deref()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new().route("/posts", get(list_posts).post(create_post))
}

// --- Handlers ---

async fn list_posts(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<FeedPage>> {
    let filter = ListPostsQuery::parse(raw.as_deref()).into_filter()?;

    let page = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| feed::list_posts(&conn, &filter).map_err(AppError::from))
        .map_err(|e| {
            tracing::error!(error = %e, "Error fetching posts");
            AppError::Upstream("Failed to fetch posts".into())
        })?;

    Ok(Json(page))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let req: CreatePostRequest = parse_json(&body)?;

    let image = match req.image {
        Value::String(image) if !image.trim().is_empty() => image,
        _ => return Err(AppError::BadRequest("Image URL is required".into())),
    };
    let caption = match req.caption {
        Value::String(caption) => caption,
        _ => String::new(),
    };

    let post = Post {
        id: uuid::Uuid::now_v7().to_string(),
        user_id: user.id,
        image,
        caption,
        created_at: timestamp::format(&timestamp::now()),
    };

    insert_post(&state, &post).map_err(|e| {
        tracing::error!(error = %e, "Error creating post");
        AppError::Upstream("Failed to create post".into())
    })?;

    tracing::info!(post_id = %post.id, user_id = %post.user_id, "Post created");
    Ok(Json(json!({ "success": true, "id": post.id })))
}

// --- Query helpers ---

fn insert_post(state: &AppState, post: &Post) -> AppResult<()> {
    let conn = state.db.get()?;
    conn.execute(
        "INSERT INTO posts (id, user_id, image, caption, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![post.id, post.user_id, post.image, post.caption, post.created_at],
    )?;
    Ok(())
}
