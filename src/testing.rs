//! In-memory repository used by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::models::{Complaint, ComplaintId, ReviewTarget, ReviewerRef};
use crate::repository::ComplaintRepository;
use crate::session::Credential;

/// Behaves like the backend store and records every call made against it.
#[derive(Default)]
pub(crate) struct RecordingRepository {
    complaints: Mutex<Vec<Complaint>>,
    list_calls: AtomicUsize,
    deletes: Mutex<Vec<ComplaintId>>,
    updates: Mutex<Vec<(ComplaintId, ReviewTarget, String)>>,
    list_failure: Mutex<Option<RepositoryError>>,
    delete_failure: Mutex<Option<RepositoryError>>,
    update_failure: Mutex<Option<RepositoryError>>,
}

impl RecordingRepository {
    pub(crate) fn new(complaints: Vec<Complaint>) -> Self {
        Self {
            complaints: Mutex::new(complaints),
            ..Default::default()
        }
    }

    pub(crate) fn fail_list_with(&self, err: RepositoryError) {
        *self.list_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_deletes_with(&self, err: RepositoryError) {
        *self.delete_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_updates_with(&self, err: RepositoryError) {
        *self.update_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn deleted(&self) -> Vec<ComplaintId> {
        self.deletes.lock().unwrap().clone()
    }

    pub(crate) fn status_updates(&self) -> Vec<(ComplaintId, ReviewTarget, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.list_calls() + self.deleted().len() + self.status_updates().len()
    }
}

#[async_trait]
impl ComplaintRepository for RecordingRepository {
    async fn list_complaints(
        &self,
        _credential: &Credential,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.complaints.lock().unwrap().clone())
    }

    async fn delete_complaint(
        &self,
        id: ComplaintId,
        _credential: &Credential,
    ) -> Result<(), RepositoryError> {
        self.deletes.lock().unwrap().push(id);
        if let Some(err) = self.delete_failure.lock().unwrap().clone() {
            return Err(err);
        }
        let mut complaints = self.complaints.lock().unwrap();
        let before = complaints.len();
        complaints.retain(|c| c.id != id);
        if complaints.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: ComplaintId,
        target: ReviewTarget,
        review_notes: &str,
        _credential: &Credential,
    ) -> Result<(), RepositoryError> {
        self.updates
            .lock()
            .unwrap()
            .push((id, target, review_notes.to_string()));
        if let Some(err) = self.update_failure.lock().unwrap().clone() {
            return Err(err);
        }
        let mut complaints = self.complaints.lock().unwrap();
        let complaint = complaints
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        complaint.status = target.status();
        complaint.review_notes = Some(review_notes.to_string());
        complaint.reviewed_by = Some(ReviewerRef {
            cop_id: Some("KL-5".to_string()),
            username: None,
        });
        Ok(())
    }
}
