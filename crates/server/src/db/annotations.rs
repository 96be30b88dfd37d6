//! Repository for the `annotations` table, plus thread reconstruction.
//!
//! Replies point at their parent through `parent_id`. Threads are rebuilt in
//! memory from the per-document listing, which is served by the
//! `(document_id, parent_id)` index.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, Executor, Sqlite, SqliteConnection, SqlitePool};

use super::models::{Annotation, DbId};
use crate::error::{AppError, Result};
use crate::validation::{CreateAnnotation, UpdateAnnotation};

const COLUMNS: &str = "id, document_id, author_id, kind, content, position, tags, is_private, \
                       parent_id, resolved_at, resolved_by, priority, assigned_to, due_date, \
                       created_at, updated_at, deleted_at";

/// An annotation with its replies, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationNode {
    #[serde(flatten)]
    pub annotation: Annotation,
    pub replies: Vec<AnnotationNode>,
}

pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Inserts an annotation written by `author_id`.
    ///
    /// A `parent_id` must name a live annotation on the same document that
    /// the author can see; another user's private annotation counts as missing.
    pub async fn create(
        conn: &mut SqliteConnection,
        author_id: DbId,
        input: &CreateAnnotation,
    ) -> Result<Annotation> {
        if let Some(parent_id) = input.parent_id {
            let parent = Self::find_by_id(&mut *conn, parent_id)
                .await?
                .filter(|p| !p.is_private || p.author_id == author_id)
                .ok_or_else(|| {
                    AppError::BadReference(format!("Parent annotation {parent_id} does not exist"))
                })?;
            if parent.document_id != input.document_id {
                return Err(AppError::BadReference(format!(
                    "Parent annotation {parent_id} belongs to another document"
                )));
            }
        }

        let now = Utc::now();
        let query = format!(
            "INSERT INTO annotations (document_id, author_id, kind, content, position, tags, is_private,
                                      parent_id, priority, assigned_to, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        let annotation = sqlx::query_as::<_, Annotation>(&query)
            .bind(input.document_id)
            .bind(author_id)
            .bind(input.kind)
            .bind(&input.content)
            .bind(input.position.map(Json))
            .bind(Json(&input.tags))
            .bind(input.is_private)
            .bind(input.parent_id)
            .bind(input.priority)
            .bind(input.assigned_to)
            .bind(input.due_date)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
        Ok(annotation)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Annotation>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!("SELECT {COLUMNS} FROM annotations WHERE id = ? AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await?)
    }

    /// All annotations on a document visible to `viewer_id`, oldest first.
    /// Private annotations are only visible to their author.
    pub async fn list_for_document(
        pool: &SqlitePool,
        document_id: DbId,
        viewer_id: DbId,
    ) -> Result<Vec<Annotation>> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE document_id = ? AND deleted_at IS NULL
               AND (is_private = 0 OR author_id = ?)
             ORDER BY created_at ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Annotation>(&query)
            .bind(document_id)
            .bind(viewer_id)
            .fetch_all(pool)
            .await?)
    }

    /// Open annotations assigned to a user, most urgent due date first.
    /// Only annotations on live documents the user can still see are listed.
    pub async fn list_assigned(pool: &SqlitePool, user_id: DbId) -> Result<Vec<Annotation>> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE assigned_to = ? AND resolved_at IS NULL AND deleted_at IS NULL
               AND (is_private = 0 OR author_id = ?)
               AND document_id IN (
                   SELECT d.id FROM documents d
                   WHERE d.deleted_at IS NULL
                     AND (d.user_id = ?
                          OR EXISTS (SELECT 1 FROM collaborators c
                                     WHERE c.owner_id = d.user_id AND c.collaborator_id = ?)))
             ORDER BY due_date IS NULL, due_date ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Annotation>(&query)
            .bind(user_id)
            .bind(user_id)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(pool)
            .await?)
    }

    pub async fn update(
        conn: &mut SqliteConnection,
        id: DbId,
        input: &UpdateAnnotation,
    ) -> Result<Annotation> {
        let query = format!(
            "UPDATE annotations SET
                content = COALESCE(?, content),
                position = COALESCE(?, position),
                tags = COALESCE(?, tags),
                is_private = COALESCE(?, is_private),
                priority = COALESCE(?, priority),
                due_date = COALESCE(?, due_date),
                updated_at = ?
             WHERE id = ? AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(&input.content)
            .bind(input.position.map(Json))
            .bind(input.tags.as_ref().map(Json))
            .bind(input.is_private)
            .bind(input.priority)
            .bind(input.due_date)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Annotation not found".to_string()))
    }

    /// Sets or clears the assignee and due date.
    pub async fn assign(
        pool: &SqlitePool,
        id: DbId,
        assigned_to: Option<DbId>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Annotation> {
        let query = format!(
            "UPDATE annotations SET assigned_to = ?, due_date = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(assigned_to)
            .bind(due_date)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Annotation not found".to_string()))
    }

    /// Marks an annotation resolved. `resolved_at` and `resolved_by` are
    /// always written together.
    pub async fn resolve(pool: &SqlitePool, id: DbId, resolved_by: DbId) -> Result<Annotation> {
        let now = Utc::now();
        let query = format!(
            "UPDATE annotations SET resolved_at = ?, resolved_by = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(now)
            .bind(resolved_by)
            .bind(now)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Annotation not found".to_string()))
    }

    pub async fn reopen(pool: &SqlitePool, id: DbId) -> Result<Annotation> {
        let query = format!(
            "UPDATE annotations SET resolved_at = NULL, resolved_by = NULL, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Annotation not found".to_string()))
    }

    /// Soft-deletes an annotation. Replies stay and surface as thread roots.
    pub async fn soft_delete(pool: &SqlitePool, id: DbId) -> Result<bool> {
        let result =
            sqlx::query("UPDATE annotations SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn children_index(annotations: &[Annotation]) -> HashMap<DbId, Vec<&Annotation>> {
    let mut index: HashMap<DbId, Vec<&Annotation>> = HashMap::new();
    for annotation in annotations {
        if let Some(parent_id) = annotation.parent_id {
            index.entry(parent_id).or_default().push(annotation);
        }
    }
    index
}

fn attach(annotation: &Annotation, index: &HashMap<DbId, Vec<&Annotation>>) -> AnnotationNode {
    let replies = index
        .get(&annotation.id)
        .map(|children| children.iter().map(|c| attach(c, index)).collect())
        .unwrap_or_default();
    AnnotationNode {
        annotation: annotation.clone(),
        replies,
    }
}

/// Builds the subtree rooted at `root_id` from a document's annotations.
pub fn build_thread(root_id: DbId, annotations: &[Annotation]) -> Option<AnnotationNode> {
    let root = annotations.iter().find(|a| a.id == root_id)?;
    let index = children_index(annotations);
    Some(attach(root, &index))
}

/// Groups a document's annotations into threads. An annotation whose parent
/// is not in `annotations` (deleted, or private to someone else) becomes a root.
pub fn build_forest(annotations: &[Annotation]) -> Vec<AnnotationNode> {
    let present: std::collections::HashSet<DbId> = annotations.iter().map(|a| a.id).collect();
    let index = children_index(annotations);
    annotations
        .iter()
        .filter(|a| a.parent_id.map_or(true, |p| !present.contains(&p)))
        .map(|a| attach(a, &index))
        .collect()
}
