//! Repository for the `plans` table.

use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{DbId, Plan};
use crate::error::{AppError, Result};
use crate::services::quota::Usage;
use crate::validation::CreatePlan;

const COLUMNS: &str =
    "id, name, description, max_file_size, max_documents, max_collaborators, created_at";

pub const DEFAULT_PLAN: &str = "free";

pub struct PlanRepo;

impl PlanRepo {
    pub async fn create(pool: &SqlitePool, input: &CreatePlan) -> Result<Plan> {
        if Self::find_by_name(pool, &input.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Plan '{}' already exists",
                input.name
            )));
        }

        let query = format!(
            "INSERT INTO plans (name, description, max_file_size, max_documents, max_collaborators, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        let plan = sqlx::query_as::<_, Plan>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.max_file_size)
            .bind(input.max_documents)
            .bind(input.max_collaborators)
            .bind(Utc::now())
            .fetch_one(pool)
            .await?;
        Ok(plan)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Plan>> {
        let query = format!("SELECT {COLUMNS} FROM plans WHERE id = ?");
        Ok(sqlx::query_as::<_, Plan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Plan>> {
        let query = format!("SELECT {COLUMNS} FROM plans WHERE name = ?");
        Ok(sqlx::query_as::<_, Plan>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await?)
    }

    /// Plans ordered from smallest to largest file size allowance.
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Plan>> {
        let query = format!("SELECT {COLUMNS} FROM plans ORDER BY max_file_size ASC, id ASC");
        Ok(sqlx::query_as::<_, Plan>(&query).fetch_all(pool).await?)
    }

    /// The plan a user is currently subscribed to.
    pub async fn for_user(pool: &SqlitePool, user_id: DbId) -> Result<Plan> {
        sqlx::query_as::<_, Plan>(
            "SELECT p.id, p.name, p.description, p.max_file_size, p.max_documents, p.max_collaborators, p.created_at
             FROM plans p JOIN users u ON u.plan_id = p.id
             WHERE u.id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Live documents and collaborator grants owned by `user_id`.
    pub async fn usage_for_user(pool: &SqlitePool, user_id: DbId) -> Result<Usage> {
        let usage = sqlx::query_as::<_, Usage>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM documents WHERE user_id = ? AND deleted_at IS NULL) AS documents,
                (SELECT COUNT(*) FROM collaborators WHERE owner_id = ?) AS collaborators
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(usage)
    }

    pub async fn seed_defaults(pool: &SqlitePool) -> Result<()> {
        let defaults: [(&str, &str, i64, i64, i64); 3] = [
            (DEFAULT_PLAN, "Individual use", 10 * 1024 * 1024, 100, 5),
            ("pro", "Professional practice", 100 * 1024 * 1024, 1_000, 25),
            ("kurumsal", "Institutional", 1024 * 1024 * 1024, 10_000, 100),
        ];

        for (name, description, max_file_size, max_documents, max_collaborators) in defaults {
            sqlx::query(
                "INSERT INTO plans (name, description, max_file_size, max_documents, max_collaborators, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(name)
            .bind(description)
            .bind(max_file_size)
            .bind(max_documents)
            .bind(max_collaborators)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        }

        tracing::debug!("Default plans seeded");
        Ok(())
    }
}
