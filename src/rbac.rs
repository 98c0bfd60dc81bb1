//! Role-based access rules.
//!
//! The backend enforces these as well; the client checks them first so a
//! forbidden action never produces a request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NyayaError, Result};
use crate::models::Principal;

/// Role of an authenticated principal, as stored in `user_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    /// Citizen filing complaints.
    User,
    /// Law enforcement reviewer.
    Cop,
}

impl RoleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::User => "user",
            RoleType::Cop => "cop",
        }
    }

    /// Check if this role has a specific permission.
    pub fn has_permission(&self, permission: Permission) -> bool {
        match permission {
            Permission::SubmitComplaint => matches!(self, RoleType::User),
            Permission::DeleteComplaint => matches!(self, RoleType::User),
            Permission::ViewAllComplaints => matches!(self, RoleType::Cop),
            Permission::ReviewComplaints => matches!(self, RoleType::Cop),
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(RoleType::User),
            "cop" => Ok(RoleType::Cop),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// All actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    SubmitComplaint,
    DeleteComplaint,
    ViewAllComplaints,
    ReviewComplaints,
}

impl Permission {
    fn describe(&self) -> &'static str {
        match self {
            Permission::SubmitComplaint => "only citizens can submit complaints",
            Permission::DeleteComplaint => "only the submitting citizen can delete a complaint",
            Permission::ViewAllComplaints => "only reviewers can view all complaints",
            Permission::ReviewComplaints => "only reviewers can update complaint status",
        }
    }
}

/// Fail with [`NyayaError::Forbidden`] unless the principal holds `permission`.
pub fn require_permission(principal: &Principal, permission: Permission) -> Result<()> {
    if principal.role.has_permission(permission) {
        Ok(())
    } else {
        tracing::warn!(
            principal_id = principal.id,
            role = %principal.role,
            permission = ?permission,
            "Permission denied"
        );
        Err(NyayaError::Forbidden(permission.describe().to_string()))
    }
}
