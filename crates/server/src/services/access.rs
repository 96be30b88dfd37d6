//! Who may see or change a document.

use sqlx::SqlitePool;

use crate::db::models::{CollaboratorRole, DbId, Document};
use crate::db::{CollaboratorRepo, DocumentRepo};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    Editor,
    Viewer,
}

impl Access {
    pub fn can_annotate(self) -> bool {
        matches!(self, Access::Owner | Access::Editor)
    }

    pub fn is_owner(self) -> bool {
        self == Access::Owner
    }
}

impl From<CollaboratorRole> for Access {
    fn from(role: CollaboratorRole) -> Self {
        match role {
            CollaboratorRole::Editor => Access::Editor,
            CollaboratorRole::Viewer => Access::Viewer,
        }
    }
}

/// Loads a document together with the caller's access to it.
///
/// Documents the caller cannot see are reported as not found.
pub async fn document_access(
    pool: &SqlitePool,
    document_id: DbId,
    user_id: DbId,
) -> Result<(Document, Access)> {
    let document = DocumentRepo::find_by_id(pool, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    if document.user_id == user_id {
        return Ok((document, Access::Owner));
    }

    match CollaboratorRepo::role_for(pool, document.user_id, user_id).await? {
        Some(role) => Ok((document, role.into())),
        None => Err(AppError::NotFound("Document not found".to_string())),
    }
}

/// Like [`document_access`] but requires permission to write annotations.
pub async fn annotatable_document(
    pool: &SqlitePool,
    document_id: DbId,
    user_id: DbId,
) -> Result<(Document, Access)> {
    let (document, access) = document_access(pool, document_id, user_id).await?;
    if !access.can_annotate() {
        return Err(AppError::Forbidden(
            "Viewers cannot annotate this document".to_string(),
        ));
    }
    Ok((document, access))
}

pub fn require_owner(access: Access, action: &str) -> Result<()> {
    if !access.is_owner() {
        return Err(AppError::Forbidden(format!(
            "Only the owner can {action} this document"
        )));
    }
    Ok(())
}

/// Whether `user_id` can see documents owned by `owner_id`.
pub async fn can_view_owner(pool: &SqlitePool, owner_id: DbId, user_id: DbId) -> Result<bool> {
    if owner_id == user_id {
        return Ok(true);
    }
    Ok(CollaboratorRepo::role_for(pool, owner_id, user_id)
        .await?
        .is_some())
}
