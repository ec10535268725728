use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::Deserialize;
use serde_json::json;

use crate::auth::session;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{parse_json, session_token, MaybeUser};
use crate::feed::timestamp;
use crate::state::AppState;

const MAX_PASSWORD_LEN: usize = 128;

// -- Request types --

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub image: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

fn signed_in(state: &AppState, user: User, token: &str) -> Response {
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        token,
        state.config.auth.session_hours,
    );
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "user": user })),
    )
        .into_response()
}

async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?
        .map_err(AppError::from)
}

// -- Handlers --

/// POST /auth/sign-up: create an account and start a session
pub async fn sign_up(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let req: SignUpRequest = parse_json(&body)?;

    let name = req.name.trim().to_string();
    let email = req.email.trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    if req.password.is_empty() || req.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be between 1 and {} characters",
            MAX_PASSWORD_LEN
        )));
    }
    let image = req.image.filter(|i| !i.trim().is_empty());

    let taken: bool = {
        let conn = state.db.get()?;
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
            params![email],
            |r| r.get(0),
        )?
    };
    if taken {
        return Err(AppError::BadRequest("Email is already registered".into()));
    }

    let password_hash = hash_password(req.password, state.config.auth.bcrypt_cost).await?;
    let now = timestamp::format(&timestamp::now());
    let user = User {
        id: uuid::Uuid::now_v7().to_string(),
        name,
        email,
        image,
        created_at: now.clone(),
        updated_at: now,
    };

    let conn = state.db.get()?;
    insert_user(&conn, &user, &password_hash)?;
    let token = session::create_session(&conn, &user.id, state.config.auth.session_hours)?;

    tracing::info!(user_id = %user.id, "User signed up");
    Ok(signed_in(&state, user, &token))
}

/// Inserts a new account. A concurrent sign-up that claimed the email first
/// trips the UNIQUE constraint and is reported like the pre-check.
fn insert_user(conn: &Connection, user: &User, password_hash: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, image, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.name,
            user.email,
            user.image,
            password_hash,
            user.created_at,
            user.updated_at
        ],
    )
    .map_err(|e| match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => {
            AppError::BadRequest("Email is already registered".into())
        }
        _ => AppError::from(e),
    })?;
    Ok(())
}

/// POST /auth/sign-in: verify credentials and start a session
pub async fn sign_in(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let req: SignInRequest = parse_json(&body)?;
    let email = req.email.trim().to_ascii_lowercase();

    let found = {
        let conn = state.db.get()?;
        conn.query_row(
            &format!("SELECT {}, password_hash FROM users WHERE email = ?1", User::COLUMNS),
            params![email],
            |row| Ok((User::from_row(row)?, row.get::<_, Option<String>>(6)?)),
        )
        .optional()?
    };

    let (user, hash) = match found {
        Some((user, Some(hash))) => (user, hash),
        _ => return Err(AppError::Unauthorized),
    };

    if !verify_password(req.password, hash).await? {
        return Err(AppError::Unauthorized);
    }

    let token = {
        let conn = state.db.get()?;
        session::create_session(&conn, &user.id, state.config.auth.session_hours)?
    };

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(signed_in(&state, user, &token))
}

/// POST /auth/sign-out: delete the session and clear the cookie
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = session_token(&headers, &state.config.auth.cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// GET /auth/session: the signed-in user, or null
pub async fn current_session(MaybeUser(user): MaybeUser) -> Json<serde_json::Value> {
    Json(json!({ "user": user }))
}
