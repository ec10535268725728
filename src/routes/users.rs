use axum::body::Bytes;
use axum::extract::State;
use axum::routing::patch;
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{parse_json, CurrentUser};
use crate::feed::timestamp;
use crate::state::AppState;

/// `image` distinguishes "absent" (keep) from `null` (clear).
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/users/me", patch(update_profile))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let req: UpdateProfileRequest = parse_json(&body)?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
        user.name = name;
    }
    if let Some(image) = req.image {
        user.image = image.filter(|i| !i.trim().is_empty());
    }
    user.updated_at = timestamp::format(&timestamp::now());

    save_profile(&state, &user)?;
    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(json!({ "user": user })))
}

fn save_profile(state: &AppState, user: &User) -> AppResult<()> {
    let conn = state.db.get()?;
    conn.execute(
        "UPDATE users SET name = ?1, image = ?2, updated_at = ?3 WHERE id = ?4",
        params![user.name, user.image, user.updated_at, user.id],
    )?;
    Ok(())
}
