//! Complaint board: the client-side read model of the complaints list.
//!
//! Holds the collection from the last completed fetch and derives the visible
//! subset from it. Mutations go to the backend and are followed by a full
//! refetch; cached records are never patched by hand.

use std::sync::Arc;

use crate::error::{ErrorContext, NyayaError, RepositoryError, Result};
use crate::filter::FilterSet;
use crate::models::{Complaint, ComplaintId, Principal, ReviewTarget};
use crate::rbac::{require_permission, Permission};
use crate::repository::ComplaintRepository;
use crate::session::{Credential, SessionContext};
use crate::workflow::ReviewWorkflow;

/// Handle for one issued fetch. Only the most recent ticket is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    seq: u64,
}

/// The complaint opened in the detail view, with the reviewer's draft notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub complaint_id: ComplaintId,
    pub draft_notes: String,
}

pub struct ComplaintBoard<R: ComplaintRepository + ?Sized> {
    repository: Arc<R>,
    workflow: ReviewWorkflow<R>,
    session: SessionContext,
    complaints: Vec<Complaint>,
    loaded: bool,
    filters: FilterSet,
    issued: u64,
    closed: bool,
    detail: Option<DetailView>,
    last_error: Option<String>,
}

impl<R: ComplaintRepository + ?Sized> ComplaintBoard<R> {
    pub fn new(repository: Arc<R>, session: SessionContext) -> Self {
        Self {
            workflow: ReviewWorkflow::new(Arc::clone(&repository)),
            repository,
            session,
            complaints: Vec::new(),
            loaded: false,
            filters: FilterSet::default(),
            issued: 0,
            closed: false,
            detail: None,
            last_error: None,
        }
    }

    /// Collection from the last applied fetch.
    pub fn complaints(&self) -> &[Complaint] {
        &self.complaints
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn filters(&self) -> FilterSet {
        self.filters
    }

    pub fn set_filters(&mut self, filters: FilterSet) {
        self.filters = filters;
    }

    /// Complaints passing the current filters, in fetch order.
    pub fn visible(&self) -> Vec<Complaint> {
        self.filters.apply(&self.complaints)
    }

    pub fn find(&self, id: ComplaintId) -> Option<&Complaint> {
        self.complaints.iter().find(|c| c.id == id)
    }

    /// User-visible message of the last failed action.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Stop applying results; anything still in flight is discarded.
    pub fn close(&mut self) {
        self.closed = true;
        self.detail = None;
    }

    /// Issue a new fetch. Earlier tickets become stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        RefreshTicket { seq: self.issued }
    }

    /// Apply a fetch result if `ticket` is still the latest.
    ///
    /// Returns `Ok(false)` when the result was discarded as stale.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: std::result::Result<Vec<Complaint>, RepositoryError>,
    ) -> Result<bool> {
        if self.closed || ticket.seq != self.issued {
            tracing::debug!(
                ticket = ticket.seq,
                latest = self.issued,
                closed = self.closed,
                "Discarding stale complaint fetch"
            );
            return Ok(false);
        }

        match result {
            Ok(complaints) => {
                tracing::debug!(count = complaints.len(), "Complaint list applied");
                self.complaints = complaints;
                self.loaded = true;
                self.last_error = None;

                let still_present = self
                    .detail
                    .as_ref()
                    .map(|d| self.find(d.complaint_id).is_some())
                    .unwrap_or(true);
                if !still_present {
                    self.detail = None;
                }
                Ok(true)
            }
            Err(e) => Err(self.record_failure(e.into(), ErrorContext::new("list_complaints"))),
        }
    }

    /// Fetch the full collection and apply it.
    pub async fn refresh(&mut self) -> Result<()> {
        let (_, credential) = self.require_session("list_complaints")?;
        let ticket = self.begin_refresh();
        let result = self.repository.list_complaints(&credential).await;
        self.complete_refresh(ticket, result).map(|_| ())
    }

    /// Open the detail view, starting with empty draft notes.
    pub fn open(&mut self, id: ComplaintId) -> Result<&Complaint> {
        if self.find(id).is_none() {
            return Err(NyayaError::Repository(RepositoryError::NotFound));
        }
        self.detail = Some(DetailView {
            complaint_id: id,
            draft_notes: String::new(),
        });
        self.find(id)
            .ok_or(NyayaError::Repository(RepositoryError::NotFound))
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn selected(&self) -> Option<&Complaint> {
        self.detail.as_ref().and_then(|d| self.find(d.complaint_id))
    }

    pub fn set_draft_notes(&mut self, notes: impl Into<String>) {
        if let Some(detail) = self.detail.as_mut() {
            detail.draft_notes = notes.into();
        }
    }

    /// Move a complaint to `target`, then refetch once.
    ///
    /// On failure the cached collection is left exactly as it was.
    pub async fn review(
        &mut self,
        id: ComplaintId,
        target: ReviewTarget,
        notes: &str,
    ) -> Result<()> {
        let (principal, credential) = self.require_session("update_status")?;
        let complaint = match self.find(id).cloned() {
            Some(complaint) => complaint,
            None => {
                return Err(self.record_failure(
                    RepositoryError::NotFound.into(),
                    ErrorContext::new("update_status").with_complaint_id(id),
                ))
            }
        };

        if let Err(e) = self
            .workflow
            .transition(&principal, &credential, &complaint, target, notes)
            .await
        {
            return Err(self.record_failure(
                e,
                ErrorContext::new("update_status")
                    .with_principal_id(principal.id)
                    .with_complaint_id(id),
            ));
        }

        if self.detail.as_ref().map(|d| d.complaint_id) == Some(id) {
            self.detail = None;
        }
        self.refresh_after("Status updated", id).await
    }

    /// Review the complaint open in the detail view using its draft notes.
    pub async fn review_selected(&mut self, target: ReviewTarget) -> Result<()> {
        let detail = self
            .detail
            .clone()
            .ok_or_else(|| NyayaError::Validation("No complaint is open".to_string()))?;
        self.review(detail.complaint_id, target, &detail.draft_notes)
            .await
    }

    /// Delete one of the principal's own complaints, then refetch.
    ///
    /// If the backend refuses, the complaint stays in the list.
    pub async fn delete(&mut self, id: ComplaintId) -> Result<()> {
        let (principal, credential) = self.require_session("delete_complaint")?;
        let ctx = ErrorContext::new("delete_complaint")
            .with_principal_id(principal.id)
            .with_complaint_id(id);

        if let Err(e) = require_permission(&principal, Permission::DeleteComplaint) {
            return Err(self.record_failure(e, ctx));
        }

        if let Err(e) = self.repository.delete_complaint(id, &credential).await {
            return Err(self.record_failure(e.into(), ctx));
        }

        if self.detail.as_ref().map(|d| d.complaint_id) == Some(id) {
            self.detail = None;
        }
        self.refresh_after("Complaint deleted", id).await
    }

    /// Refetch after a change the backend already accepted.
    ///
    /// A failure here does not undo `change`; the error says so.
    async fn refresh_after(&mut self, change: &str, id: ComplaintId) -> Result<()> {
        match self.refresh().await {
            Ok(()) => Ok(()),
            Err(source) => {
                tracing::warn!(
                    complaint_id = %id,
                    change = change,
                    error = %source,
                    "Change accepted but refresh failed"
                );
                let err = NyayaError::RefreshAfterChange {
                    change: change.to_string(),
                    source: Box::new(source),
                };
                self.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    fn require_session(&mut self, operation: &str) -> Result<(Principal, Credential)> {
        match self.session.require() {
            Ok(session) => Ok(session),
            Err(e) => Err(self.record_failure(e, ErrorContext::new(operation))),
        }
    }

    /// Surface a failure; an auth failure also ends the session.
    fn record_failure(&mut self, err: NyayaError, ctx: ErrorContext) -> NyayaError {
        err.log_with_context(&ctx);
        self.last_error = Some(err.user_message());

        if err.requires_reauthentication() {
            if let Err(clear_err) = self.session.clear() {
                tracing::warn!(error = %clear_err, "Failed to clear session after auth failure");
            }
        }
        err
    }
}
