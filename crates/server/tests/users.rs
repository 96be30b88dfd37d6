mod common;

use assert_matches::assert_matches;

use casefile_server::{
    db::{PlanRepo, UserRepo},
    error::AppError,
    routes::auth::{hash_password, verify_password},
    validation::UpdateProfile,
};
use common::{create_plan, register_input, setup, setup_seeded};

#[tokio::test]
async fn created_user_reads_back_unchanged() {
    let ctx = setup().await;
    let plan_id = create_plan(ctx.pool(), "team", 1024, 10, 2).await;
    let input = register_input("ayse", Some(plan_id));
    let hash = hash_password(&input.password).unwrap();

    let created = UserRepo::create(ctx.pool(), &input, &hash).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(created.username, "ayse");
    assert_eq!(created.email, "ayse@example.com");
    assert_eq!(created.full_name, input.full_name);
    assert_eq!(created.plan_id, plan_id);
    assert_eq!(created.password_hash, hash);
    assert!(verify_password(&input.password, &created.password_hash).unwrap());

    let first = UserRepo::find_by_id(ctx.pool(), created.id).await.unwrap().unwrap();
    let second = UserRepo::find_by_id(ctx.pool(), created.id).await.unwrap().unwrap();
    for read in [&first, &second] {
        assert_eq!(read.id, created.id);
        assert_eq!(read.username, created.username);
        assert_eq!(read.password_hash, created.password_hash);
        assert_eq!(read.full_name, created.full_name);
        assert_eq!(read.email, created.email);
        assert_eq!(read.plan_id, created.plan_id);
        assert_eq!(read.created_at, created.created_at);
    }

    let by_name = UserRepo::find_by_username(ctx.pool(), "ayse").await.unwrap().unwrap();
    let by_email = UserRepo::find_by_login(ctx.pool(), "ayse@example.com").await.unwrap().unwrap();
    assert_eq!(by_name.id, created.id);
    assert_eq!(by_email.id, created.id);
    assert!(UserRepo::find_by_id(ctx.pool(), created.id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn registration_defaults_to_free_plan() {
    let ctx = setup_seeded().await;
    let hash = hash_password("correct-horse").unwrap();
    let user = UserRepo::create(ctx.pool(), &register_input("mehmet", None), &hash)
        .await
        .unwrap();

    let plan = PlanRepo::for_user(ctx.pool(), user.id).await.unwrap();
    assert_eq!(plan.name, "free");
    assert_eq!(plan.max_file_size, 10 * 1024 * 1024);
}

#[tokio::test]
async fn duplicate_username_and_email_conflict() {
    let ctx = setup().await;
    let plan_id = create_plan(ctx.pool(), "team", 1024, 10, 2).await;
    let hash = hash_password("correct-horse").unwrap();
    UserRepo::create(ctx.pool(), &register_input("ayse", Some(plan_id)), &hash)
        .await
        .unwrap();

    let err = UserRepo::create(ctx.pool(), &register_input("ayse", Some(plan_id)), &hash)
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Conflict(_));

    let mut same_email = register_input("ayse2", Some(plan_id));
    same_email.email = "ayse@example.com".to_string();
    let err = UserRepo::create(ctx.pool(), &same_email, &hash).await.unwrap_err();
    assert_matches!(err, AppError::Conflict(_));
}

#[tokio::test]
async fn profile_update_keeps_other_fields() {
    let ctx = setup().await;
    let plan_id = create_plan(ctx.pool(), "team", 1024, 10, 2).await;
    let user = common::create_user(ctx.pool(), "ayse", plan_id).await;

    let updated = UserRepo::update_profile(
        ctx.pool(),
        user.id,
        &UpdateProfile {
            full_name: Some("Ayşe Kaya".to_string()),
            email: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.full_name, "Ayşe Kaya");
    assert_eq!(updated.email, user.email);
    assert_eq!(updated.created_at, user.created_at);
}
