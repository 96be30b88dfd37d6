mod common;

use axum::http::{header, Method, StatusCode};
use serde_json::{json, Value};

use common::{body_json, get, json_request, post_json, setup_seeded, upload};

async fn register(app: axum::Router, username: &str, plan_id: Option<i64>) -> (StatusCode, Value) {
    let res = post_json(
        app,
        "/api/auth/register",
        None,
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "full_name": "Test User",
            "password": "correct-horse",
            "plan_id": plan_id,
        }),
    )
    .await;
    let status = res.status();
    (status, body_json(res).await)
}

async fn token(app: axum::Router, username: &str) -> String {
    let (status, body) = register(app, username, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check() {
    let ctx = setup_seeded().await;
    let res = get(ctx.app(), "/health", None).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn certificate_lookup_is_public() {
    let ctx = setup_seeded().await;

    let res = get(ctx.app(), "/api/certificates/ISO-9001-2024-TR-001", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["company"], "ABC Teknoloji A.Ş.");
    assert_eq!(body["type"], "ISO 9001:2015");
    assert_eq!(body["status"], "active");

    let res = get(ctx.app(), "/api/certificates/NOPE-0000", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let ctx = setup_seeded().await;

    let res = get(ctx.app(), "/api/documents", None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = get(ctx.app(), "/api/documents", Some("not-a-token")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_profile() {
    let ctx = setup_seeded().await;

    let (status, body) = register(ctx.app(), "ayse", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "ayse");
    assert!(body["user"].get("password_hash").is_none());

    for login in ["ayse", "ayse@example.com"] {
        let res = post_json(
            ctx.app(),
            "/api/auth/login",
            None,
            json!({ "login": login, "password": "correct-horse" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = post_json(
        ctx.app(),
        "/api/auth/login",
        None,
        json!({ "login": "ayse", "password": "wrong-horse" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = body["token"].as_str().unwrap();
    let res = get(ctx.app(), "/api/users/me", Some(token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let me = body_json(res).await;
    assert_eq!(me["email"], "ayse@example.com");

    let res = get(ctx.app(), "/api/plans/usage", Some(token)).await;
    let usage = body_json(res).await;
    assert_eq!(usage["plan"]["name"], "free");
    assert_eq!(usage["usage"]["documents"], 0);
    assert_eq!(usage["upload_limit"], 10 * 1024 * 1024);
}

#[tokio::test]
async fn invalid_registration_lists_fields() {
    let ctx = setup_seeded().await;
    let res = post_json(
        ctx.app(),
        "/api/auth/register",
        None,
        json!({
            "username": "x",
            "email": "not-an-email",
            "full_name": "Test",
            "password": "correct-horse",
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "username"]);

    let (status, body) = register(ctx.app(), "ayse", Some(9999)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "BAD_REFERENCE");
}

#[tokio::test]
async fn concurrent_duplicate_registration_conflicts_once() {
    let ctx = setup_seeded().await;

    let ((first, _), (second, _)) = tokio::join!(
        register(ctx.app(), "ayse", None),
        register(ctx.app(), "ayse", None)
    );
    let mut statuses = vec![first.as_u16(), second.as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);

    let (status, body) = register(ctx.app(), "ayse", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn upload_list_and_download() {
    let ctx = setup_seeded().await;
    let token = token(ctx.app(), "ayse").await;

    let res = upload(
        ctx.app(),
        &token,
        "tutanak.pdf",
        b"%PDF-1.4 hearing minutes",
        &[("category", "Tutanak"), ("document_date", "2024-05-02")],
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let doc = body_json(res).await;
    assert_eq!(doc["original_name"], "tutanak.pdf");
    assert_eq!(doc["file_type"], "pdf");
    assert_eq!(doc["category"], "Tutanak");
    assert!(doc["document_date"].as_str().unwrap().starts_with("2024-05-02"));
    let id = doc["id"].as_i64().unwrap();

    let res = get(ctx.app(), "/api/documents?category=Tutanak", Some(&token)).await;
    let list = body_json(res).await;
    assert_eq!(list["documents"].as_array().unwrap().len(), 1);

    let res = get(ctx.app(), &format!("/api/documents/{id}/content"), Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("filename=\"tutanak.pdf\""));
    let bytes = http_body_util::BodyExt::collect(res.into_body())
        .await
        .unwrap()
        .to_bytes();
    assert_eq!(&bytes[..], b"%PDF-1.4 hearing minutes");

    let other = token_for_other(&ctx).await;
    let res = get(ctx.app(), &format!("/api/documents/{id}"), Some(&other)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = json_request(ctx.app(), Method::DELETE, &format!("/api/documents/{id}"), Some(&token), json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = get(ctx.app(), &format!("/api/documents/{id}"), Some(&token)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

async fn token_for_other(ctx: &common::TestContext) -> String {
    token(ctx.app(), "mehmet").await
}

#[tokio::test]
async fn upload_rejections_report_quota() {
    let ctx = setup_seeded().await;
    let admin = token(ctx.app(), "admin").await;

    let res = post_json(
        ctx.app(),
        "/api/plans",
        Some(&admin),
        json!({ "name": "deneme", "max_file_size": 16, "max_documents": 1, "max_collaborators": 0 }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let plan_id = body_json(res).await["id"].as_i64().unwrap();

    let (status, body) = register(ctx.app(), "ayse", Some(plan_id)).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let res = upload(ctx.app(), &token, "big.txt", &[b'x'; 17], &[("category", "Not")]).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = body_json(res).await;
    assert_eq!(body["code"], "QUOTA_EXCEEDED");
    assert_eq!(body["limit"], "file_size");
    assert_eq!(body["max"], 16);
    assert_eq!(body["actual"], 17);

    let res = upload(ctx.app(), &token, "ok.txt", &[b'x'; 16], &[("category", "Not")]).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = upload(ctx.app(), &token, "two.txt", b"x", &[("category", "Not")]).await;
    let body = body_json(res).await;
    assert_eq!(body["limit"], "documents");

    let res = upload(ctx.app(), &token, "blank.txt", b"x", &[("category", "  ")]).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn annotations_flat_and_threaded() {
    let ctx = setup_seeded().await;
    let token = token(ctx.app(), "ayse").await;

    let res = upload(ctx.app(), &token, "rapor.pdf", b"%PDF", &[("category", "Rapor")]).await;
    let doc_id = body_json(res).await["id"].as_i64().unwrap();

    let res = post_json(
        ctx.app(),
        "/api/annotations",
        Some(&token),
        json!({
            "document_id": doc_id,
            "type": "contradiction",
            "content": "Dates on page 2 and 5 disagree",
            "position": { "x": 0.1, "y": 0.2, "width": 0.3, "height": 0.05, "page": 2 },
            "tags": ["contradiction"],
            "priority": "high"
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let root = body_json(res).await;
    assert_eq!(root["type"], "contradiction");
    assert_eq!(root["priority"], "high");
    assert_eq!(root["position"]["page"], 2);
    let root_id = root["id"].as_i64().unwrap();

    let res = post_json(
        ctx.app(),
        "/api/annotations",
        Some(&token),
        json!({ "document_id": doc_id, "type": "comment", "content": "Confirmed", "parent_id": root_id }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = get(ctx.app(), &format!("/api/documents/{doc_id}/annotations"), Some(&token)).await;
    let flat = body_json(res).await;
    assert_eq!(flat["annotations"].as_array().unwrap().len(), 2);

    let res = get(ctx.app(), &format!("/api/documents/{doc_id}/annotations?threaded=true"), Some(&token)).await;
    let threaded = body_json(res).await;
    let threads = threaded["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["replies"].as_array().unwrap().len(), 1);

    let res = post_json(ctx.app(), &format!("/api/annotations/{root_id}/resolve"), Some(&token), json!({})).await;
    let resolved = body_json(res).await;
    assert!(resolved["resolved_at"].is_string());
    assert!(resolved["resolved_by"].is_number());

    let res = post_json(
        ctx.app(),
        "/api/annotations",
        Some(&token),
        json!({ "document_id": doc_id, "type": "gossip", "content": "?" }),
    )
    .await;
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn timeline_is_chronological() {
    let ctx = setup_seeded().await;
    let token = token(ctx.app(), "ayse").await;

    for (title, date, category) in [
        ("Karar", "2024-09-10T10:00:00Z", "Duruşma"),
        ("Dava açıldı", "2023-01-15T09:00:00Z", "Dava"),
        ("Bilirkişi raporu", "2024-02-01T12:00:00Z", "Rapor"),
    ] {
        let res = post_json(
            ctx.app(),
            "/api/timeline",
            Some(&token),
            json!({ "title": title, "date": date, "category": category, "institution": "Ankara 3. Asliye" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = get(ctx.app(), "/api/timeline", Some(&token)).await;
    let body = body_json(res).await;
    let titles: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Dava açıldı", "Bilirkişi raporu", "Karar"]);

    let res = get(ctx.app(), "/api/timeline?category=Rapor", Some(&token)).await;
    assert_eq!(body_json(res).await["events"].as_array().unwrap().len(), 1);

    let res = post_json(
        ctx.app(),
        "/api/timeline",
        Some(&token),
        json!({ "title": "no date", "category": "Dava" }),
    )
    .await;
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn tags_are_unique_and_system_tags_locked() {
    let ctx = setup_seeded().await;
    let token = token(ctx.app(), "ayse").await;

    let res = post_json(ctx.app(), "/api/tags", Some(&token), json!({ "name": "tanık" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let tag = body_json(res).await;
    assert_eq!(tag["color"], "#3B82F6");
    assert_eq!(tag["usage_count"], 0);

    let res = post_json(ctx.app(), "/api/tags", Some(&token), json!({ "name": "tanık" })).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = post_json(ctx.app(), "/api/tags", Some(&token), json!({ "name": "renk", "color": "blue" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = post_json(
        ctx.app(),
        "/api/tags",
        Some(&token),
        json!({ "name": "bilirkişi", "is_system_tag": true }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let own = body_json(res).await;
    assert_eq!(own["is_system_tag"], false);
    let res = json_request(
        ctx.app(),
        Method::PATCH,
        &format!("/api/tags/{}", own["id"]),
        Some(&token),
        json!({ "color": "#10B981" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["color"], "#10B981");

    let res = get(ctx.app(), "/api/tags", Some(&token)).await;
    let tags = body_json(res).await["tags"].as_array().unwrap().clone();
    let urgent = tags.iter().find(|t| t["name"] == "urgent").unwrap();
    assert_eq!(urgent["is_system_tag"], true);

    let res = json_request(
        ctx.app(),
        Method::PATCH,
        &format!("/api/tags/{}", urgent["id"]),
        Some(&token),
        json!({ "color": "#000000" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
