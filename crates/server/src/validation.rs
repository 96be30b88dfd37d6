//! Client-facing record schemas.
//!
//! Every create/update payload is deserialized into one of these types and
//! checked with [`validated`] before it reaches a repository. Fields the
//! server owns (ids, timestamps, usage counters, read and resolution state)
//! have no place here, so a client cannot set them.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::db::models::{
    AnnotationKind, CollaboratorRole, DbId, DocumentMetadata, Position, Priority,
};
use crate::error::Result;

pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";
pub const DEFAULT_MAX_FILE_SIZE: i64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_DOCUMENTS: i64 = 100;
pub const DEFAULT_MAX_COLLABORATORS: i64 = 5;

/// Validates `input`, converting failures into `AppError::Validation`.
pub fn validated<T: Validate>(input: T) -> Result<T> {
    input.validate()?;
    Ok(input)
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "Must not be blank"));
    }
    Ok(())
}

fn username_chars(value: &str) -> std::result::Result<(), ValidationError> {
    let ok = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !ok {
        return Err(error(
            "username_chars",
            "Username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(())
}

pub fn hex_color(value: &str) -> std::result::Result<(), ValidationError> {
    let digits = value.strip_prefix('#').unwrap_or("");
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(error("hex_color", "Color must be a hex code like #3B82F6"));
    }
    Ok(())
}

fn valid_position(position: &Position) -> std::result::Result<(), ValidationError> {
    let dims = [position.x, position.y, position.width, position.height];
    if dims.iter().any(|v| !v.is_finite()) {
        return Err(error("position", "Position values must be finite numbers"));
    }
    if position.width < 0.0 || position.height < 0.0 {
        return Err(error("position", "Width and height must not be negative"));
    }
    if position.page == 0 {
        return Err(error("position", "Pages are numbered from 1"));
    }
    Ok(())
}

fn tag_names(tags: &[String]) -> std::result::Result<(), ValidationError> {
    if tags.iter().any(|t| t.trim().is_empty() || t.len() > 64) {
        return Err(error("tags", "Tags must be 1 to 64 characters"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Users and plans
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(
        length(min = 3, max = 32, message = "Username must be 3 to 32 characters"),
        custom(function = "username_chars")
    )]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub full_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// Defaults to the `free` plan when omitted.
    pub plan_id: Option<DbId>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(custom(function = "not_blank"))]
    pub full_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePlan {
    pub plan_id: DbId,
}

fn default_max_file_size() -> i64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_documents() -> i64 {
    DEFAULT_MAX_DOCUMENTS
}

fn default_max_collaborators() -> i64 {
    DEFAULT_MAX_COLLABORATORS
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlan {
    #[validate(
        length(min = 1, max = 64, message = "Plan name must be 1 to 64 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_max_file_size")]
    #[validate(range(min = 0, message = "Must not be negative"))]
    pub max_file_size: i64,
    #[serde(default = "default_max_documents")]
    #[validate(range(min = 0, message = "Must not be negative"))]
    pub max_documents: i64,
    #[serde(default = "default_max_collaborators")]
    #[validate(range(min = 0, message = "Must not be negative"))]
    pub max_collaborators: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddCollaborator {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub role: CollaboratorRole,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Descriptive fields sent alongside an uploaded file.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DocumentFields {
    #[validate(custom(function = "not_blank"))]
    pub category: String,
    pub institution: Option<String>,
    pub document_date: Option<DateTime<Utc>>,
    pub metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDocument {
    #[validate(custom(function = "not_blank"))]
    pub category: Option<String>,
    pub institution: Option<String>,
    pub document_date: Option<DateTime<Utc>>,
    pub metadata: Option<DocumentMetadata>,
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAnnotation {
    pub document_id: DbId,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    #[validate(custom(function = "valid_position"))]
    pub position: Option<Position>,
    #[serde(default)]
    #[validate(custom(function = "tag_names"))]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_private: bool,
    pub parent_id: Option<DbId>,
    #[serde(default)]
    pub priority: Priority,
    pub assigned_to: Option<DbId>,
    pub due_date: Option<DateTime<Utc>>,
    /// Users to notify, in addition to any `@username` found in `content`.
    #[serde(default)]
    pub mentions: Vec<DbId>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAnnotation {
    #[validate(custom(function = "not_blank"))]
    pub content: Option<String>,
    #[validate(custom(function = "valid_position"))]
    pub position: Option<Position>,
    #[validate(custom(function = "tag_names"))]
    pub tags: Option<Vec<String>>,
    pub is_private: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignAnnotation {
    pub assigned_to: Option<DbId>,
    pub due_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTag {
    #[validate(
        length(min = 1, max = 64, message = "Tag name must be 1 to 64 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(custom(function = "hex_color"))]
    pub color: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTag {
    #[validate(custom(function = "hex_color"))]
    pub color: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTimelineEvent {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub category: String,
    pub institution: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTimelineEvent {
    #[validate(custom(function = "not_blank"))]
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub category: Option<String>,
    pub institution: Option<String>,
}
