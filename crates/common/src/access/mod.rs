//! Record-level access control
//!
//! One rule, applied uniformly: the requester may touch a record if they
//! created it, are assigned to it, or hold a privileged role. Resources
//! nested under a lead/client inherit the parent's access. The check is
//! synchronous and must run before any side effect.

use uuid::Uuid;

use crate::auth::UserRole;
use crate::errors::{AppError, Result};

/// Ownership facts of a record, extracted from the row before checking
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordAccess {
    pub created_by: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
}

impl RecordAccess {
    pub fn new(created_by: Option<Uuid>, assigned_to: Option<Uuid>) -> Self {
        Self {
            created_by,
            assigned_to,
        }
    }
}

/// Allow if the requester created or is assigned to the record, or holds
/// an admin/manager role.
pub fn can_access(user_id: Uuid, role: UserRole, record: &RecordAccess) -> bool {
    if role.is_privileged() {
        return true;
    }
    record.created_by == Some(user_id) || record.assigned_to == Some(user_id)
}

/// Deny with a 403 and no side effects
pub fn require_access(user_id: Uuid, role: UserRole, record: &RecordAccess) -> Result<()> {
    if can_access(user_id, role, record) {
        Ok(())
    } else {
        Err(AppError::Forbidden {
            message: "You do not have access to this record".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_allowed() {
        let user = Uuid::new_v4();
        let record = RecordAccess::new(Some(user), None);
        assert!(can_access(user, UserRole::Agent, &record));
    }

    #[test]
    fn test_assignee_allowed() {
        let user = Uuid::new_v4();
        let record = RecordAccess::new(Some(Uuid::new_v4()), Some(user));
        assert!(can_access(user, UserRole::Agent, &record));
    }

    #[test]
    fn test_privileged_roles_allowed() {
        let record = RecordAccess::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        assert!(can_access(Uuid::new_v4(), UserRole::Admin, &record));
        assert!(can_access(Uuid::new_v4(), UserRole::Manager, &record));
    }

    #[test]
    fn test_stranger_denied() {
        let record = RecordAccess::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        let err = require_access(Uuid::new_v4(), UserRole::Agent, &record).unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[test]
    fn test_unowned_record_denied_for_agents() {
        let record = RecordAccess::default();
        assert!(!can_access(Uuid::new_v4(), UserRole::Agent, &record));
    }
}
