//! Plan quota rules.
//!
//! These checks are pure: callers load the owner's [`Plan`] and current
//! [`Usage`] and ask whether one more document or collaborator fits. The
//! repositories repeat the count guard inside the insert statement itself so
//! concurrent requests cannot overrun a limit between check and insert.

use std::fmt;

use serde::Serialize;

use crate::db::models::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaLimit {
    FileSize,
    Documents,
    Collaborators,
}

impl fmt::Display for QuotaLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuotaLimit::FileSize => "file size",
            QuotaLimit::Documents => "document",
            QuotaLimit::Collaborators => "collaborator",
        };
        f.write_str(name)
    }
}

/// A plan limit was breached. `actual` is the value the request would have
/// produced (file size in bytes, or the resulting count).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("Plan {limit} limit exceeded: {actual} exceeds maximum of {max}")]
pub struct QuotaExceeded {
    pub limit: QuotaLimit,
    pub max: i64,
    pub actual: i64,
}

/// Current resource consumption of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Usage {
    pub documents: i64,
    pub collaborators: i64,
}

pub fn check_file_size(plan: &Plan, file_size: i64) -> Result<(), QuotaExceeded> {
    if file_size > plan.max_file_size {
        return Err(QuotaExceeded {
            limit: QuotaLimit::FileSize,
            max: plan.max_file_size,
            actual: file_size,
        });
    }
    Ok(())
}

pub fn check_document_slot(plan: &Plan, usage: &Usage) -> Result<(), QuotaExceeded> {
    if usage.documents >= plan.max_documents {
        return Err(QuotaExceeded {
            limit: QuotaLimit::Documents,
            max: plan.max_documents,
            actual: usage.documents + 1,
        });
    }
    Ok(())
}

pub fn check_collaborator_slot(plan: &Plan, usage: &Usage) -> Result<(), QuotaExceeded> {
    if usage.collaborators >= plan.max_collaborators {
        return Err(QuotaExceeded {
            limit: QuotaLimit::Collaborators,
            max: plan.max_collaborators,
            actual: usage.collaborators + 1,
        });
    }
    Ok(())
}

/// Runs every check a new document must pass.
pub fn check_new_document(plan: &Plan, usage: &Usage, file_size: i64) -> Result<(), QuotaExceeded> {
    check_file_size(plan, file_size)?;
    check_document_slot(plan, usage)
}

/// Whether the user's existing usage still fits inside `plan`. Used before
/// switching a user onto a smaller plan.
pub fn check_fits(plan: &Plan, usage: &Usage) -> Result<(), QuotaExceeded> {
    if usage.documents > plan.max_documents {
        return Err(QuotaExceeded {
            limit: QuotaLimit::Documents,
            max: plan.max_documents,
            actual: usage.documents,
        });
    }
    if usage.collaborators > plan.max_collaborators {
        return Err(QuotaExceeded {
            limit: QuotaLimit::Collaborators,
            max: plan.max_collaborators,
            actual: usage.collaborators,
        });
    }
    Ok(())
}

/// The largest payload a user may upload: the lesser of the upload layer's
/// configured cap and the plan's file size limit.
pub fn effective_upload_limit(plan: &Plan, upload_cap: usize) -> i64 {
    let cap = i64::try_from(upload_cap).unwrap_or(i64::MAX);
    cap.min(plan.max_file_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn free_plan() -> Plan {
        Plan {
            id: 1,
            name: "free".to_string(),
            description: None,
            max_file_size: 10_485_760,
            max_documents: 100,
            max_collaborators: 5,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn file_at_limit_is_accepted() {
        assert!(check_file_size(&free_plan(), 10_485_760).is_ok());
    }

    #[test]
    fn file_over_limit_is_rejected() {
        let err = check_file_size(&free_plan(), 10_485_761).unwrap_err();
        assert_eq!(err.limit, QuotaLimit::FileSize);
        assert_eq!(err.max, 10_485_760);
        assert_eq!(err.actual, 10_485_761);
    }

    #[test]
    fn document_slot_full() {
        let usage = Usage {
            documents: 100,
            collaborators: 0,
        };
        let err = check_document_slot(&free_plan(), &usage).unwrap_err();
        assert_eq!(err.limit, QuotaLimit::Documents);
        assert_eq!(err.actual, 101);

        let usage = Usage {
            documents: 99,
            collaborators: 0,
        };
        assert!(check_document_slot(&free_plan(), &usage).is_ok());
    }

    #[test]
    fn collaborator_slot_full() {
        let usage = Usage {
            documents: 0,
            collaborators: 5,
        };
        let err = check_collaborator_slot(&free_plan(), &usage).unwrap_err();
        assert_eq!(err.limit, QuotaLimit::Collaborators);
    }

    #[test]
    fn zero_limit_plan_rejects_everything() {
        let plan = Plan {
            max_documents: 0,
            max_collaborators: 0,
            max_file_size: 0,
            ..free_plan()
        };
        let usage = Usage::default();
        assert!(check_document_slot(&plan, &usage).is_err());
        assert!(check_collaborator_slot(&plan, &usage).is_err());
        assert!(check_file_size(&plan, 0).is_ok());
        assert!(check_file_size(&plan, 1).is_err());
    }

    #[test]
    fn new_document_checks_size_first() {
        let usage = Usage {
            documents: 100,
            collaborators: 0,
        };
        let err = check_new_document(&free_plan(), &usage, 20_000_000).unwrap_err();
        assert_eq!(err.limit, QuotaLimit::FileSize);
    }

    #[test]
    fn downgrade_fit() {
        let usage = Usage {
            documents: 100,
            collaborators: 5,
        };
        assert!(check_fits(&free_plan(), &usage).is_ok());
        let small = Plan {
            max_documents: 10,
            ..free_plan()
        };
        assert_eq!(
            check_fits(&small, &usage).unwrap_err().limit,
            QuotaLimit::Documents
        );
    }

    #[test]
    fn upload_limit_is_the_lesser_cap() {
        assert_eq!(effective_upload_limit(&free_plan(), 5 * 1024 * 1024), 5_242_880);
        assert_eq!(effective_upload_limit(&free_plan(), 50 * 1024 * 1024), 10_485_760);
    }

    #[test]
    fn message_names_the_limit() {
        let err = check_file_size(&free_plan(), 10_485_761).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Plan file size limit exceeded: 10485761 exceeds maximum of 10485760"
        );
    }
}
