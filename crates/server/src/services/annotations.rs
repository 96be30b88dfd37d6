//! Annotation writes that touch more than one table.
//!
//! Creating or editing an annotation may also record mentions and bump tag
//! usage counters; each operation runs in a single transaction.

use std::collections::BTreeSet;

use serde::Serialize;
use sqlx::SqlitePool;

use super::access;
use crate::db::models::{Annotation, AnnotationMention, DbId, Document};
use crate::db::{AnnotationRepo, MentionRepo, TagRepo, UserRepo};
use crate::error::{AppError, Result};
use crate::validation::{CreateAnnotation, UpdateAnnotation};

#[derive(Debug, Serialize)]
pub struct AnnotationWithMentions {
    #[serde(flatten)]
    pub annotation: Annotation,
    pub mentions: Vec<AnnotationMention>,
}

/// `@username` handles in `content`, in order of first appearance.
///
/// A handle must start the text or follow whitespace or an opening bracket,
/// so email addresses are not picked up. A trailing '.' is sentence
/// punctuation, not part of the name.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = content.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let at_boundary = prev.map_or(true, |p| p.is_whitespace() || matches!(p, '(' | '['));
        prev = Some(c);
        if c != '@' || !at_boundary {
            continue;
        }

        let start = i + 1;
        let mut end = start;
        while let Some(&(j, n)) = chars.peek() {
            if n.is_ascii_alphanumeric() || matches!(n, '_' | '-' | '.') {
                end = j + n.len_utf8();
                prev = Some(n);
                chars.next();
            } else {
                break;
            }
        }

        let name = content[start..end].trim_end_matches('.');
        if name.len() >= 3 && seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }
    names
}

/// Users to notify: explicit ids plus `@handles`, minus the author.
///
/// Explicit ids must exist and be able to see the document. Handles that do
/// not resolve, or name someone without access, are skipped.
async fn mention_targets(
    pool: &SqlitePool,
    document: &Document,
    author_id: DbId,
    explicit: &[DbId],
    handles: &[String],
) -> Result<Vec<DbId>> {
    let mut targets = BTreeSet::new();

    for &id in explicit {
        UserRepo::require(pool, id, "Mentioned").await?;
        if !access::can_view_owner(pool, document.user_id, id).await? {
            return Err(AppError::invalid(
                "mentions",
                format!("User {id} cannot see this document"),
            ));
        }
        targets.insert(id);
    }

    for id in UserRepo::ids_for_usernames(pool, handles).await? {
        if access::can_view_owner(pool, document.user_id, id).await? {
            targets.insert(id);
        }
    }

    targets.remove(&author_id);
    Ok(targets.into_iter().collect())
}

pub async fn create(
    pool: &SqlitePool,
    document: &Document,
    author_id: DbId,
    input: &CreateAnnotation,
) -> Result<AnnotationWithMentions> {
    if let Some(assignee) = input.assigned_to {
        UserRepo::require(pool, assignee, "Assigned").await?;
        if !access::can_view_owner(pool, document.user_id, assignee).await? {
            return Err(AppError::invalid(
                "assigned_to",
                "Assignee cannot see this document",
            ));
        }
    }

    // Nobody but the author can read a private annotation, so it notifies no one.
    let targets = if input.is_private {
        Vec::new()
    } else {
        let handles = extract_mentions(&input.content);
        mention_targets(pool, document, author_id, &input.mentions, &handles).await?
    };

    let mut tx = pool.begin().await?;
    let annotation = AnnotationRepo::create(&mut *tx, author_id, input).await?;
    let mentions = MentionRepo::create_many(&mut *tx, annotation.id, &targets).await?;
    TagRepo::increment_usage(&mut *tx, &input.tags).await?;
    tx.commit().await?;

    tracing::info!(
        annotation_id = annotation.id,
        document_id = document.id,
        author_id,
        mentions = mentions.len(),
        "Annotation created"
    );
    Ok(AnnotationWithMentions {
        annotation,
        mentions,
    })
}

/// Applies a partial edit. Tags new to the annotation are counted, and
/// handles new to the content are notified.
pub async fn update(
    pool: &SqlitePool,
    document: &Document,
    existing: &Annotation,
    editor_id: DbId,
    input: &UpdateAnnotation,
) -> Result<AnnotationWithMentions> {
    let added_tags: Vec<String> = match &input.tags {
        Some(tags) => tags
            .iter()
            .filter(|t| !existing.tags.0.contains(t))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let private = input.is_private.unwrap_or(existing.is_private);
    let targets = match (&input.content, private) {
        (Some(content), false) => {
            let before: BTreeSet<String> = extract_mentions(&existing.content).into_iter().collect();
            let fresh: Vec<String> = extract_mentions(content)
                .into_iter()
                .filter(|n| !before.contains(n))
                .collect();
            mention_targets(pool, document, existing.author_id, &[], &fresh).await?
        }
        _ => Vec::new(),
    };

    let mut tx = pool.begin().await?;
    let annotation = AnnotationRepo::update(&mut *tx, existing.id, input).await?;
    let mentions = MentionRepo::create_many(&mut *tx, annotation.id, &targets).await?;
    TagRepo::increment_usage(&mut *tx, &added_tags).await?;
    tx.commit().await?;

    tracing::info!(annotation_id = annotation.id, editor_id, "Annotation updated");
    Ok(AnnotationWithMentions {
        annotation,
        mentions,
    })
}
