//! Repository for the `collaborators` table.
//!
//! A row grants `collaborator_id` access to every document owned by
//! `owner_id`. Grants count against the owner's plan.

use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{Collaborator, CollaboratorRole, DbId};
use super::plans::PlanRepo;
use crate::error::{AppError, Result};
use crate::services::quota::{self, QuotaExceeded, QuotaLimit};

const SELECT: &str = r#"
    SELECT c.owner_id, c.collaborator_id, u.username, u.full_name, u.email, c.role, c.created_at
    FROM collaborators c
    JOIN users u ON u.id = c.collaborator_id
"#;

pub struct CollaboratorRepo;

impl CollaboratorRepo {
    pub async fn list_for_owner(pool: &SqlitePool, owner_id: DbId) -> Result<Vec<Collaborator>> {
        let query = format!("{SELECT} WHERE c.owner_id = ? ORDER BY u.full_name ASC");
        Ok(sqlx::query_as::<_, Collaborator>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await?)
    }

    pub async fn find(
        pool: &SqlitePool,
        owner_id: DbId,
        collaborator_id: DbId,
    ) -> Result<Option<Collaborator>> {
        let query = format!("{SELECT} WHERE c.owner_id = ? AND c.collaborator_id = ?");
        Ok(sqlx::query_as::<_, Collaborator>(&query)
            .bind(owner_id)
            .bind(collaborator_id)
            .fetch_optional(pool)
            .await?)
    }

    /// Grants access, or changes the role of an existing grant.
    ///
    /// New grants are inserted only while the owner's grant count is below
    /// `max_collaborators`; the count is evaluated inside the insert.
    pub async fn grant(
        pool: &SqlitePool,
        owner_id: DbId,
        collaborator_id: DbId,
        role: CollaboratorRole,
    ) -> Result<Collaborator> {
        if owner_id == collaborator_id {
            return Err(AppError::invalid(
                "email",
                "Cannot add yourself as a collaborator",
            ));
        }

        if Self::find(pool, owner_id, collaborator_id).await?.is_some() {
            sqlx::query("UPDATE collaborators SET role = ? WHERE owner_id = ? AND collaborator_id = ?")
                .bind(role)
                .bind(owner_id)
                .bind(collaborator_id)
                .execute(pool)
                .await?;
        } else {
            let plan = PlanRepo::for_user(pool, owner_id).await?;
            let usage = PlanRepo::usage_for_user(pool, owner_id).await?;
            quota::check_collaborator_slot(&plan, &usage)?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO collaborators (owner_id, collaborator_id, role, created_at)
                SELECT u.id, ?, ?, ?
                FROM users u
                JOIN plans p ON p.id = u.plan_id
                WHERE u.id = ?
                  AND (SELECT COUNT(*) FROM collaborators c WHERE c.owner_id = u.id) < p.max_collaborators
                "#,
            )
            .bind(collaborator_id)
            .bind(role)
            .bind(Utc::now())
            .bind(owner_id)
            .execute(pool)
            .await?
            .rows_affected();

            if inserted == 0 {
                tracing::warn!(owner_id, "Collaborator quota reached during grant");
                return Err(QuotaExceeded {
                    limit: QuotaLimit::Collaborators,
                    max: plan.max_collaborators,
                    actual: plan.max_collaborators + 1,
                }
                .into());
            }
            tracing::info!(owner_id, collaborator_id, ?role, "Collaborator added");
        }

        Self::find(pool, owner_id, collaborator_id)
            .await?
            .ok_or_else(|| AppError::Internal("Collaborator grant vanished".to_string()))
    }

    /// Removes a grant. Returns `false` if there was none.
    pub async fn revoke(pool: &SqlitePool, owner_id: DbId, collaborator_id: DbId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM collaborators WHERE owner_id = ? AND collaborator_id = ?")
            .bind(owner_id)
            .bind(collaborator_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The role `user_id` holds on `owner_id`'s documents, if any.
    pub async fn role_for(
        pool: &SqlitePool,
        owner_id: DbId,
        user_id: DbId,
    ) -> Result<Option<CollaboratorRole>> {
        Ok(sqlx::query_scalar::<_, CollaboratorRole>(
            "SELECT role FROM collaborators WHERE owner_id = ? AND collaborator_id = ?",
        )
        .bind(owner_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
    }
}
