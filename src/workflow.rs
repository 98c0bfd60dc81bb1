//! Review workflow: how a reviewer moves a complaint between review states.
//!
//! The machine is flat. A reviewer may move a complaint to `under_review`,
//! `reviewed` or `failed` from any other state, in any order. Nothing ever
//! goes back to `pending`.

use std::sync::Arc;

use crate::error::{NyayaError, Result};
use crate::models::{Complaint, ComplaintStatus, Principal, ReviewTarget};
use crate::rbac::{require_permission, Permission};
use crate::repository::ComplaintRepository;
use crate::session::Credential;

/// Note sent and displayed when a reviewer leaves the notes empty.
///
/// Rendering a stored complaint without notes uses the same table, so a
/// complaint looks the same before and after a refetch.
pub fn default_review_note(status: ComplaintStatus) -> &'static str {
    match status {
        ComplaintStatus::UnderReview => "Complaint marked for review. Investigation in progress.",
        ComplaintStatus::Reviewed => "Complaint has been reviewed and processed.",
        ComplaintStatus::Failed => "Complaint review completed - case closed.",
        ComplaintStatus::Pending => "Status updated by law enforcement.",
    }
}

/// Trimmed `notes`, or the default note for `target` when they are blank.
pub fn resolve_review_notes(target: ReviewTarget, notes: &str) -> &str {
    let trimmed = notes.trim();
    if trimmed.is_empty() {
        default_review_note(target.status())
    } else {
        trimmed
    }
}

/// Issues status transitions through a [`ComplaintRepository`].
pub struct ReviewWorkflow<R: ComplaintRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: ComplaintRepository + ?Sized> Clone for ReviewWorkflow<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ComplaintRepository + ?Sized> ReviewWorkflow<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Move `complaint` to `target`.
    ///
    /// Rejected locally, without a request, when the principal is not a
    /// reviewer or the complaint is already in `target`. Does not touch any
    /// cached copy of the complaint; callers refetch on success.
    pub async fn transition(
        &self,
        principal: &Principal,
        credential: &Credential,
        complaint: &Complaint,
        target: ReviewTarget,
        notes: &str,
    ) -> Result<()> {
        require_permission(principal, Permission::ReviewComplaints)?;

        if complaint.status == target.status() {
            return Err(NyayaError::InvalidTransition(format!(
                "complaint {} is already {}",
                complaint.id,
                complaint.status.as_str()
            )));
        }

        let notes = resolve_review_notes(target, notes);
        tracing::info!(
            complaint_id = %complaint.id,
            principal_id = principal.id,
            target = target.as_str(),
            "Submitting status transition"
        );

        self.repository
            .update_status(complaint.id, target, notes, credential)
            .await
            .map_err(NyayaError::from)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Whitespace-only notes always resolve to the target's default.
        #[test]
        fn prop_blank_notes_use_default(index in 0usize..3, blank in "[ \t\n]{0,8}") {
            let target = ReviewTarget::ALL[index];
            prop_assert_eq!(
                resolve_review_notes(target, &blank),
                default_review_note(target.status())
            );
        }

        /// Notes with visible characters are sent as typed, minus outer whitespace.
        #[test]
        fn prop_non_blank_notes_are_kept(index in 0usize..3, notes in "[a-zA-Z0-9][a-zA-Z0-9 .,]{0,40}") {
            let target = ReviewTarget::ALL[index];
            prop_assert_eq!(resolve_review_notes(target, &notes), notes.trim());
        }
    }
}
