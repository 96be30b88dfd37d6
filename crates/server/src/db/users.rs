//! Repository for the `users` table.

use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{DbId, Plan, User, UserSummary};
use super::plans::{PlanRepo, DEFAULT_PLAN};
use crate::error::{AppError, Result};
use crate::services::quota;
use crate::validation::{RegisterUser, UpdateProfile};

const COLUMNS: &str = "id, username, password_hash, full_name, email, plan_id, created_at";

pub struct UserRepo;

impl UserRepo {
    /// Inserts a new account. The password must already be hashed.
    ///
    /// Username and email uniqueness is checked up front for a readable
    /// error; the unique indexes still decide concurrent races, and their
    /// violation surfaces as `AppError::Conflict` as well.
    pub async fn create(pool: &SqlitePool, input: &RegisterUser, password_hash: &str) -> Result<User> {
        let plan = match input.plan_id {
            Some(id) => PlanRepo::find_by_id(pool, id)
                .await?
                .ok_or_else(|| AppError::BadReference(format!("Plan {id} does not exist")))?,
            None => PlanRepo::find_by_name(pool, DEFAULT_PLAN)
                .await?
                .ok_or_else(|| AppError::Internal("Default plan is missing".to_string()))?,
        };

        if Self::find_by_username(pool, &input.username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if Self::find_by_email(pool, &input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let query = format!(
            "INSERT INTO users (username, password_hash, full_name, email, plan_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(password_hash)
            .bind(input.full_name.trim())
            .bind(&input.email)
            .bind(plan.id)
            .bind(Utc::now())
            .fetch_one(pool)
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, plan = %plan.name, "User registered");
        Ok(user)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = ?");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = ?");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await?)
    }

    /// Looks a user up by username, or by email when the login contains '@'.
    pub async fn find_by_login(pool: &SqlitePool, login: &str) -> Result<Option<User>> {
        if login.contains('@') {
            Self::find_by_email(pool, login).await
        } else {
            Self::find_by_username(pool, login).await
        }
    }

    /// Resolves a user id that a request refers to, or fails with a bad reference.
    pub async fn require(pool: &SqlitePool, id: DbId, what: &str) -> Result<User> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::BadReference(format!("{what} user {id} does not exist")))
    }

    pub async fn list_summaries(pool: &SqlitePool) -> Result<Vec<UserSummary>> {
        Ok(sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, full_name FROM users ORDER BY username ASC",
        )
        .fetch_all(pool)
        .await?)
    }

    /// Resolves usernames to ids, ignoring names with no account.
    pub async fn ids_for_usernames(pool: &SqlitePool, usernames: &[String]) -> Result<Vec<DbId>> {
        let mut ids = Vec::with_capacity(usernames.len());
        for name in usernames {
            if let Some(user) = Self::find_by_username(pool, name).await? {
                ids.push(user.id);
            }
        }
        Ok(ids)
    }

    pub async fn update_profile(pool: &SqlitePool, id: DbId, input: &UpdateProfile) -> Result<User> {
        if let Some(email) = &input.email {
            if let Some(other) = Self::find_by_email(pool, email).await? {
                if other.id != id {
                    return Err(AppError::Conflict("Email already registered".to_string()));
                }
            }
        }

        let query = format!(
            "UPDATE users SET
                full_name = COALESCE(?, full_name),
                email = COALESCE(?, email)
             WHERE id = ?
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(input.full_name.as_deref().map(str::trim))
            .bind(&input.email)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Moves a user onto another plan, refusing if current usage would not fit.
    ///
    /// The usage comparison is part of the `UPDATE`, so an upload or grant
    /// racing with a downgrade cannot leave the user over the new limits.
    pub async fn change_plan(pool: &SqlitePool, id: DbId, plan_id: DbId) -> Result<(User, Plan)> {
        let plan = PlanRepo::find_by_id(pool, plan_id)
            .await?
            .ok_or_else(|| AppError::BadReference(format!("Plan {plan_id} does not exist")))?;

        let usage = PlanRepo::usage_for_user(pool, id).await?;
        quota::check_fits(&plan, &usage)?;

        let query = format!(
            "UPDATE users SET plan_id = ?
             WHERE id = ?
               AND (SELECT COUNT(*) FROM documents d
                    WHERE d.user_id = users.id AND d.deleted_at IS NULL) <= ?
               AND (SELECT COUNT(*) FROM collaborators c
                    WHERE c.owner_id = users.id) <= ?
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, User>(&query)
            .bind(plan.id)
            .bind(id)
            .bind(plan.max_documents)
            .bind(plan.max_collaborators)
            .fetch_optional(pool)
            .await?;

        let user = match updated {
            Some(user) => user,
            None => {
                Self::find_by_id(pool, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
                // Usage grew between the check and the update.
                let usage = PlanRepo::usage_for_user(pool, id).await?;
                quota::check_fits(&plan, &usage)?;
                return Err(AppError::Conflict(
                    "Usage changed while switching plans, try again".to_string(),
                ));
            }
        };

        tracing::info!(user_id = id, plan = %plan.name, "Plan changed");
        Ok((user, plan))
    }
}
