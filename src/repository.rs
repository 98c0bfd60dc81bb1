//! Complaint repository: the backend's complaint endpoints as typed calls.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::client::BackendClient;
use crate::error::RepositoryError;
use crate::models::{Complaint, ComplaintId, ComplaintWire, ReviewTarget, SubmissionReceipt};
use crate::session::Credential;
use crate::workflow::resolve_review_notes;

/// Access to the backend's complaint store.
///
/// The backend scopes `list_complaints` by role: citizens see their own
/// complaints, reviewers see all of them.
#[async_trait]
pub trait ComplaintRepository: Send + Sync {
    async fn list_complaints(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Complaint>, RepositoryError>;

    async fn delete_complaint(
        &self,
        id: ComplaintId,
        credential: &Credential,
    ) -> Result<(), RepositoryError>;

    /// Blank `review_notes` are replaced by the default for `target`.
    async fn update_status(
        &self,
        id: ComplaintId,
        target: ReviewTarget,
        review_notes: &str,
        credential: &Credential,
    ) -> Result<(), RepositoryError>;
}

#[derive(Debug, Serialize)]
struct StatusUpdateRequest<'a> {
    status: ReviewTarget,
    review_notes: &'a str,
}

#[derive(Debug, Serialize)]
struct TextComplaintRequest<'a> {
    name: &'a str,
    location: &'a str,
    content: &'a str,
}

/// A complaint about to be filed as text.
#[derive(Debug, Clone)]
pub struct TextComplaint {
    pub name: String,
    pub location: String,
    pub content: String,
}

/// A complaint about to be filed as a recording.
#[derive(Debug, Clone)]
pub struct AudioComplaint {
    pub name: String,
    pub location: String,
    pub file_name: String,
    pub audio: Vec<u8>,
}

/// [`ComplaintRepository`] over the backend's HTTP API.
#[derive(Clone)]
pub struct HttpComplaintRepository {
    client: BackendClient,
}

impl HttpComplaintRepository {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// File a text complaint and return the backend's analysis.
    pub async fn submit_text(
        &self,
        complaint: &TextComplaint,
        credential: &Credential,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        let body = TextComplaintRequest {
            name: &complaint.name,
            location: &complaint.location,
            content: &complaint.content,
        };
        let request = self
            .client
            .request(Method::POST, "/api/complaints/text/", Some(credential))
            .json(&body);

        let receipt = decode_receipt(self.client.send_value("submit_text", request).await?)?;
        tracing::info!(
            complaint_id = ?receipt.complaint_id,
            priority = ?receipt.priority,
            "Text complaint submitted"
        );
        Ok(receipt)
    }

    /// File an audio complaint and return the transcript and analysis.
    pub async fn submit_audio(
        &self,
        complaint: AudioComplaint,
        credential: &Credential,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        let size = complaint.audio.len();
        let request = self
            .client
            .request(Method::POST, "/api/complaints/audio/", Some(credential))
            .multipart(audio_form(complaint));

        let receipt = decode_receipt(self.client.send_value("submit_audio", request).await?)?;
        tracing::info!(
            complaint_id = ?receipt.complaint_id,
            audio_bytes = size,
            language = ?receipt.language,
            "Audio complaint submitted"
        );
        Ok(receipt)
    }

    /// Transcribe and analyse a recording without filing it.
    ///
    /// The receipt carries no complaint id.
    pub async fn transcribe(
        &self,
        recording: AudioComplaint,
        credential: Option<&Credential>,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        let size = recording.audio.len();
        let request = self
            .client
            .request(Method::POST, "/api/transcribe/", credential)
            .multipart(audio_form(recording));

        let receipt = decode_receipt(self.client.send_value("transcribe", request).await?)?;
        tracing::debug!(
            audio_bytes = size,
            language = ?receipt.language,
            priority = ?receipt.priority,
            "Recording transcribed"
        );
        Ok(receipt)
    }
}

fn audio_form(recording: AudioComplaint) -> Form {
    let audio = Part::bytes(recording.audio).file_name(recording.file_name);
    Form::new()
        .part("audio", audio)
        .text("name", recording.name)
        .text("location", recording.location)
}

fn decode_receipt(value: Value) -> Result<SubmissionReceipt, RepositoryError> {
    let wire: ComplaintWire =
        serde_json::from_value(value).map_err(|e| RepositoryError::Malformed(e.to_string()))?;
    SubmissionReceipt::try_from(wire)
}

#[async_trait]
impl ComplaintRepository for HttpComplaintRepository {
    async fn list_complaints(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Complaint>, RepositoryError> {
        let request = self
            .client
            .request(Method::GET, "/api/complaints/", Some(credential));
        let wires: Vec<ComplaintWire> = self.client.send_json("list_complaints", request).await?;

        let complaints = wires
            .into_iter()
            .map(Complaint::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = complaints.len(), "Fetched complaints");
        Ok(complaints)
    }

    async fn delete_complaint(
        &self,
        id: ComplaintId,
        credential: &Credential,
    ) -> Result<(), RepositoryError> {
        let path = format!("/api/complaints/{}/", id);
        let request = self.client.request(Method::DELETE, &path, Some(credential));
        self.client.send_empty("delete_complaint", request).await?;
        tracing::info!(complaint_id = %id, "Complaint deleted");
        Ok(())
    }

    async fn update_status(
        &self,
        id: ComplaintId,
        target: ReviewTarget,
        review_notes: &str,
        credential: &Credential,
    ) -> Result<(), RepositoryError> {
        let path = format!("/api/complaints/{}/status/", id);
        let body = StatusUpdateRequest {
            status: target,
            review_notes: resolve_review_notes(target, review_notes),
        };
        let request = self
            .client
            .request(Method::POST, &path, Some(credential))
            .json(&body);

        self.client.send_value("update_status", request).await?;
        tracing::info!(complaint_id = %id, status = target.as_str(), "Complaint status updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::default_review_note;

    #[test]
    fn status_request_serializes_snake_case() {
        let body = StatusUpdateRequest {
            status: ReviewTarget::UnderReview,
            review_notes: "on it",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "under_review");
        assert_eq!(json["review_notes"], "on it");
    }

    #[test]
    fn blank_notes_resolve_before_serialization() {
        let body = StatusUpdateRequest {
            status: ReviewTarget::Failed,
            review_notes: resolve_review_notes(ReviewTarget::Failed, "   "),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json["review_notes"],
            default_review_note(ReviewTarget::Failed.status())
        );
    }

    #[test]
    fn receipt_decoding_reports_malformed_shapes() {
        let err = decode_receipt(serde_json::json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, RepositoryError::Malformed(_)));
    }
}
