#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use casefile_server::{
    build_router,
    config::Config,
    db::{models::User, Database, PlanRepo, UserRepo},
    routes::auth::{create_token, hash_password},
    services::storage::StorageService,
    validation::{CreatePlan, RegisterUser},
    AppState,
};

pub const TEST_SECRET: &str = "test-secret";

/// A migrated database and storage directory that live as long as this value.
pub struct TestContext {
    pub state: AppState,
    _dir: TempDir,
}

impl TestContext {
    pub fn pool(&self) -> &SqlitePool {
        &self.state.db.pool
    }

    pub fn storage(&self) -> &StorageService {
        &self.state.storage
    }

    pub fn app(&self) -> Router {
        build_router(self.state.clone())
    }
}

/// Fresh database with the schema applied but no seed data.
pub async fn setup() -> TestContext {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_url = format!("sqlite:{}?mode=rwc", dir.path().join("test.db").display());

    let db = Database::connect(&db_url).await.expect("connect");
    db.run_migrations().await.expect("migrations");

    let storage = StorageService::new(dir.path().join("documents"));
    storage.init().await.expect("storage init");

    let config = Config {
        database_url: db_url,
        storage_path: dir.path().join("documents").display().to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        ..Config::default()
    };

    TestContext {
        state: AppState {
            db,
            config,
            storage,
        },
        _dir: dir,
    }
}

/// Fresh database with the default plans and system tags.
pub async fn setup_seeded() -> TestContext {
    let ctx = setup().await;
    ctx.state.db.seed().await.expect("seed");
    ctx
}

pub fn plan_input(name: &str, max_file_size: i64, max_documents: i64, max_collaborators: i64) -> CreatePlan {
    CreatePlan {
        name: name.to_string(),
        description: None,
        max_file_size,
        max_documents,
        max_collaborators,
    }
}

pub fn register_input(username: &str, plan_id: Option<i64>) -> RegisterUser {
    RegisterUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: format!("{username} test"),
        password: "correct-horse".to_string(),
        plan_id,
    }
}

pub async fn create_plan(pool: &SqlitePool, name: &str, max_file_size: i64, max_documents: i64, max_collaborators: i64) -> i64 {
    PlanRepo::create(pool, &plan_input(name, max_file_size, max_documents, max_collaborators))
        .await
        .expect("plan creation should succeed")
        .id
}

pub async fn create_user(pool: &SqlitePool, username: &str, plan_id: i64) -> User {
    let hash = hash_password("correct-horse").expect("hashing should succeed");
    UserRepo::create(pool, &register_input(username, Some(plan_id)), &hash)
        .await
        .expect("user creation should succeed")
}

pub fn token_for(user: &User) -> String {
    create_token(user, TEST_SECRET, 1).expect("token")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should complete")
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

pub async fn json_request(app: Router, method: Method, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    json_request(app, Method::POST, uri, token, body).await
}

const BOUNDARY: &str = "casefile-test-boundary";

/// Builds a multipart upload with one file part plus text fields.
pub fn multipart_upload(file_name: &str, data: &[u8], fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn upload(app: Router, token: &str, file_name: &str, data: &[u8], fields: &[(&str, &str)]) -> Response<Body> {
    let (content_type, body) = multipart_upload(file_name, data, fields);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/documents")
        .header(header::CONTENT_TYPE, content_type)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}
