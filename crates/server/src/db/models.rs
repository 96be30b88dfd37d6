use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

pub type DbId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub max_file_size: i64,
    pub max_documents: i64,
    pub max_collaborators: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub plan_id: DbId,
    pub created_at: DateTime<Utc>,
}

/// Public directory entry, used for mention pickers and collaborator lists.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: DbId,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CollaboratorRole {
    Editor,
    Viewer,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Collaborator {
    pub owner_id: DbId,
    pub collaborator_id: DbId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: CollaboratorRole,
    pub created_at: DateTime<Utc>,
}

/// Structured document metadata. Known keys are explicit; anything else a
/// client sends lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Document {
    pub id: DbId,
    pub filename: String,
    pub original_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub upload_date: DateTime<Utc>,
    pub category: String,
    pub institution: Option<String>,
    pub document_date: Option<DateTime<Utc>>,
    pub metadata: Option<Json<DocumentMetadata>>,
    pub user_id: DbId,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Everything needed to insert a document row once the payload is stored.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub original_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub category: String,
    pub institution: Option<String>,
    pub document_date: Option<DateTime<Utc>>,
    pub metadata: Option<DocumentMetadata>,
    pub user_id: DbId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AnnotationKind {
    Contradiction,
    Verification,
    Error,
    Note,
    Relation,
    Highlight,
    Comment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Rectangle on a page, in page-relative units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page: u32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Annotation {
    pub id: DbId,
    pub document_id: DbId,
    pub author_id: DbId,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub content: String,
    pub position: Option<Json<Position>>,
    pub tags: Json<Vec<String>>,
    pub is_private: bool,
    pub parent_id: Option<DbId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<DbId>,
    pub priority: Priority,
    pub assigned_to: Option<DbId>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Annotation {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnnotationMention {
    pub id: DbId,
    pub annotation_id: DbId,
    pub user_id: DbId,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A mention joined with the annotation it points at, for inbox listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MentionDetail {
    pub id: DbId,
    pub annotation_id: DbId,
    pub document_id: DbId,
    pub author_username: String,
    pub content: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: DbId,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_system_tag: bool,
    pub usage_count: i64,
    pub created_by: Option<DbId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TimelineEvent {
    pub id: DbId,
    pub title: String,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub category: String,
    pub institution: Option<String>,
    pub user_id: DbId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}
