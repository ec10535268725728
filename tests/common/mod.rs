#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

use campus_feed::config::Config;
use campus_feed::state::{AppState, DbPool};
use campus_feed::storage::{BlobClients, BlobStore, StorageError};
use campus_feed::{db, routes};

pub const BOUNDARY: &str = "campus-feed-test-boundary";

/// In-memory blob store that behaves like the real one: a bucket must
/// exist before uploads succeed, and paths are never overwritten.
#[derive(Default)]
pub struct FakeBlobStore {
    pub bucket_exists: Mutex<bool>,
    pub reject_create: bool,
    pub reject_upload: bool,
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeBlobStore {
    pub fn with_bucket() -> Self {
        Self {
            bucket_exists: Mutex::new(true),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.calls.lock().unwrap().push(format!("upload {bucket}"));
        if self.reject_upload {
            return Err(StorageError::Api {
                status: 403,
                message: "new row violates row-level security policy".into(),
            });
        }
        if !*self.bucket_exists.lock().unwrap() {
            return Err(StorageError::classify(400, Some("404"), Some("not_found"), "Bucket not found"));
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(StorageError::AlreadyExists("The resource already exists".into()));
        }
        objects.insert(path.to_string(), data);
        Ok(path.to_string())
    }

    async fn create_bucket(&self, bucket: &str, _public: bool) -> Result<(), StorageError> {
        self.calls.lock().unwrap().push(format!("create {bucket}"));
        if self.reject_create {
            return Err(StorageError::Api {
                status: 403,
                message: "new row violates row-level security policy".into(),
            });
        }
        *self.bucket_exists.lock().unwrap() = true;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://blobs.test/storage/v1/object/public/{bucket}/{path}")
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DbPool,
    pub store: Arc<FakeBlobStore>,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(FakeBlobStore::with_bucket())
    }

    pub fn with_store(store: FakeBlobStore) -> Self {
        Self::build(store, |_| {})
    }

    pub fn build(store: FakeBlobStore, configure: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().unwrap();
        let db = db::create_pool(&dir.path().join("test.db")).unwrap();
        db::run_migrations(&db).unwrap();

        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        configure(&mut config);

        let store = Arc::new(store);
        let blobs = BlobClients::new(store.clone(), None);
        let router = routes::app(AppState::new(db.clone(), config, blobs));

        Self {
            router,
            db,
            store,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value, session: Option<&str>) -> TestResponse {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = session {
            builder = builder.header(header::COOKIE, format!("campus_session={token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Signs up a fresh user and returns (user id, session token).
    pub async fn sign_up(&self, name: &str, email: &str) -> (String, String) {
        let response = self
            .post_json(
                "/auth/sign-up",
                &serde_json::json!({ "name": name, "email": email, "password": "hunter2" }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        let token = session_cookie(&response.headers).expect("session cookie set");
        let id = response.body["user"]["id"].as_str().unwrap().to_string();
        (id, token)
    }

    pub fn insert_user(&self, id: &str, name: &str) {
        let conn = self.db.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, name, email, image) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, name, format!("{id}@example.com"), format!("https://avatars/{id}.svg")],
        )
        .unwrap();
    }

    pub fn drop_posts_table(&self) {
        let conn = self.db.get().unwrap();
        conn.execute_batch("DROP TABLE posts").unwrap();
    }

    pub fn insert_post(&self, id: &str, user_id: &str, created_at: &str) {
        let conn = self.db.get().unwrap();
        conn.execute(
            "INSERT INTO posts (id, user_id, image, caption, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, user_id, format!("https://img/{id}.jpg"), "", created_at],
        )
        .unwrap();
    }
}

pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("campus_session="))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        .filter(|token| !token.is_empty())
}

pub fn multipart_request(parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n")
                    .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
            ),
        }
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
