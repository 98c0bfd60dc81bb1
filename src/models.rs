//! Core data models for the Nyayasathi client.
//!
//! The backend is loose about field names across endpoints, so responses are
//! decoded into wire structs first and normalized into [`Complaint`] here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;
use crate::rbac::RoleType;

/// Backend-assigned complaint identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplaintId(pub u64);

impl fmt::Display for ComplaintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ComplaintId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(ComplaintId)
            .map_err(|_| format!("invalid complaint id: {}", s))
    }
}

/// Emotion detected by the backend's analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Fear,
    Anger,
    Sadness,
    Disgust,
    Happy,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Fear,
        Emotion::Anger,
        Emotion::Sadness,
        Emotion::Disgust,
        Emotion::Happy,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Fear => "fear",
            Emotion::Anger => "anger",
            Emotion::Sadness => "sadness",
            Emotion::Disgust => "disgust",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
        }
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown emotion: {}", s))
    }
}

/// Triage priority assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown priority: {}", s))
    }
}

/// Threat level assigned by the backend. Unset renders as [`ThreatLevel::Low`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    High,
    Medium,
    #[default]
    Low,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::High => "high",
            ThreatLevel::Medium => "medium",
            ThreatLevel::Low => "low",
        }
    }
}

impl FromStr for ThreatLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(ThreatLevel::High),
            "medium" => Ok(ThreatLevel::Medium),
            "low" => Ok(ThreatLevel::Low),
            _ => Err(format!("unknown threat level: {}", s)),
        }
    }
}

/// Review status of a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    #[default]
    Pending,
    UnderReview,
    Reviewed,
    Failed,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 4] = [
        ComplaintStatus::Pending,
        ComplaintStatus::UnderReview,
        ComplaintStatus::Reviewed,
        ComplaintStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::UnderReview => "under_review",
            ComplaintStatus::Reviewed => "reviewed",
            ComplaintStatus::Failed => "failed",
        }
    }
}

impl FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComplaintStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown status: {}", s))
    }
}

/// A status a reviewer may move a complaint to. `pending` is not one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewTarget {
    UnderReview,
    Reviewed,
    Failed,
}

impl ReviewTarget {
    pub const ALL: [ReviewTarget; 3] = [
        ReviewTarget::UnderReview,
        ReviewTarget::Reviewed,
        ReviewTarget::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }

    /// The complaint status this target produces.
    pub fn status(&self) -> ComplaintStatus {
        match self {
            ReviewTarget::UnderReview => ComplaintStatus::UnderReview,
            ReviewTarget::Reviewed => ComplaintStatus::Reviewed,
            ReviewTarget::Failed => ComplaintStatus::Failed,
        }
    }
}

impl FromStr for ReviewTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("not a review target: {}", s))
    }
}

/// Identity of the reviewer who last changed a complaint's status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerRef {
    #[serde(default)]
    pub cop_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// The authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: u64,
    pub role: RoleType,
    pub username: String,
    pub cop_id: Option<String>,
    pub display_name: String,
}

impl Principal {
    pub fn is_reviewer(&self) -> bool {
        self.role == RoleType::Cop
    }
}

/// User object as returned by the auth endpoints and kept in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub user_type: RoleType,
    #[serde(default)]
    pub cop_id: Option<String>,
}

impl From<UserRecord> for Principal {
    fn from(user: UserRecord) -> Self {
        let username = user
            .username
            .clone()
            .or_else(|| user.cop_id.clone())
            .unwrap_or_default();

        let display_name = match user.user_type {
            RoleType::Cop => format!("Cop {}", user.cop_id.as_deref().unwrap_or(&username)),
            RoleType::User => user
                .first_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| username.clone()),
        };

        Principal {
            id: user.id,
            role: user.user_type,
            username,
            cop_id: user.cop_id,
            display_name,
        }
    }
}

/// A reviewable complaint as held by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Complaint {
    pub id: ComplaintId,
    pub submitter_name: String,
    pub location: String,
    pub content: String,
    pub language: Option<String>,
    pub complaint_type: Option<String>,
    pub emotion: Option<Emotion>,
    pub priority: Option<Priority>,
    pub threat_level: Option<ThreatLevel>,
    pub status: ComplaintStatus,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<ReviewerRef>,
    pub exact_keywords: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub audio_file: Option<String>,
}

impl Complaint {
    /// Threat level for display; unset counts as low.
    pub fn threat_level_or_default(&self) -> ThreatLevel {
        self.threat_level.unwrap_or_default()
    }
}

/// Analysis returned by the backend after a complaint submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionReceipt {
    pub complaint_id: Option<ComplaintId>,
    pub content: Option<String>,
    pub language: Option<String>,
    pub translated_text: Option<String>,
    pub emotion: Option<Emotion>,
    pub priority: Option<Priority>,
    pub threat_level: Option<ThreatLevel>,
    pub risk_factors: Vec<String>,
    pub exact_keywords: Vec<String>,
    pub requires_immediate_attention: bool,
}

/// Complaint as it appears on the wire, across all complaint endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ComplaintWire {
    id: Option<u64>,
    name: Option<String>,
    location: Option<String>,
    content: Option<String>,
    transcript: Option<String>,
    language: Option<String>,
    detected_language: Option<String>,
    complaint_type: Option<String>,
    emotion: Option<String>,
    priority: Option<String>,
    threat_level: Option<String>,
    status: Option<String>,
    review_notes: Option<String>,
    reviewed_by: Option<ReviewerRef>,
    exact_keywords: Option<Vec<String>>,
    submitted_at: Option<String>,
    audio_file: Option<String>,
    risk_factors: Option<Vec<String>>,
    requires_immediate_attention: Option<bool>,
    translated_text: Option<String>,
}

/// Parse an optional enum field; empty strings mean unset.
fn parse_optional<T: FromStr<Err = String>>(
    value: Option<String>,
) -> Result<Option<T>, RepositoryError> {
    match value {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(RepositoryError::Malformed),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parse a backend timestamp. Naive timestamps are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| RepositoryError::Malformed(format!("invalid timestamp: {}", raw)))
}

impl ComplaintWire {
    fn body(&mut self) -> Option<String> {
        non_blank(self.content.take()).or_else(|| non_blank(self.transcript.take()))
    }

    fn language(&mut self) -> Option<String> {
        non_blank(self.language.take()).or_else(|| non_blank(self.detected_language.take()))
    }
}

impl TryFrom<ComplaintWire> for Complaint {
    type Error = RepositoryError;

    fn try_from(mut wire: ComplaintWire) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .map(ComplaintId)
            .ok_or_else(|| RepositoryError::Malformed("complaint without id".to_string()))?;
        let content = wire
            .body()
            .ok_or_else(|| RepositoryError::Malformed(format!("complaint {} has no content", id)))?;
        let language = wire.language();
        let submitted_at = wire
            .submitted_at
            .as_deref()
            .ok_or_else(|| {
                RepositoryError::Malformed(format!("complaint {} has no submitted_at", id))
            })
            .and_then(parse_timestamp)?;

        Ok(Complaint {
            id,
            submitter_name: wire.name.unwrap_or_default(),
            location: wire.location.unwrap_or_default(),
            content,
            language,
            complaint_type: non_blank(wire.complaint_type),
            emotion: parse_optional(wire.emotion)?,
            priority: parse_optional(wire.priority)?,
            threat_level: parse_optional(wire.threat_level)?,
            status: parse_optional(wire.status)?.unwrap_or_default(),
            review_notes: non_blank(wire.review_notes),
            reviewed_by: wire.reviewed_by,
            exact_keywords: wire.exact_keywords.unwrap_or_default(),
            submitted_at,
            audio_file: non_blank(wire.audio_file),
        })
    }
}

impl TryFrom<ComplaintWire> for SubmissionReceipt {
    type Error = RepositoryError;

    fn try_from(mut wire: ComplaintWire) -> Result<Self, Self::Error> {
        let content = wire.body();
        let language = wire.language().filter(|lang| lang != "unknown");

        Ok(SubmissionReceipt {
            complaint_id: wire.id.map(ComplaintId),
            content,
            language,
            translated_text: non_blank(wire.translated_text),
            emotion: parse_optional(wire.emotion)?,
            priority: parse_optional(wire.priority)?,
            threat_level: parse_optional(wire.threat_level)?,
            risk_factors: wire.risk_factors.unwrap_or_default(),
            exact_keywords: wire.exact_keywords.unwrap_or_default(),
            requires_immediate_attention: wire.requires_immediate_attention.unwrap_or(false),
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_complaint(
    id: u64,
    priority: Option<Priority>,
    emotion: Option<Emotion>,
    status: ComplaintStatus,
) -> Complaint {
    Complaint {
        id: ComplaintId(id),
        submitter_name: format!("Submitter {}", id),
        location: "Kochi".to_string(),
        content: format!("Complaint body {}", id),
        language: Some("en".to_string()),
        complaint_type: Some("text".to_string()),
        emotion,
        priority,
        threat_level: None,
        status,
        review_notes: None,
        reviewed_by: None,
        exact_keywords: Vec::new(),
        submitted_at: DateTime::from_timestamp(1_700_000_000 + id as i64, 0).unwrap_or_default(),
        audio_file: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Complaint, RepositoryError> {
        let wire: ComplaintWire = serde_json::from_str(json).unwrap();
        Complaint::try_from(wire)
    }

    #[test]
    fn decodes_full_complaint() {
        let complaint = decode(
            r#"{
                "id": 12,
                "name": "Asha",
                "location": "Thrissur",
                "content": "My bag was stolen",
                "language": "en",
                "complaint_type": "text",
                "emotion": "fear",
                "priority": "high",
                "threat_level": "medium",
                "status": "under_review",
                "review_notes": "Looking into it",
                "reviewed_by": {"cop_id": "KL-101"},
                "exact_keywords": ["stolen", "bag"],
                "submitted_at": "2024-06-01T10:15:00Z",
                "audio_file": null
            }"#,
        )
        .unwrap();

        assert_eq!(complaint.id, ComplaintId(12));
        assert_eq!(complaint.submitter_name, "Asha");
        assert_eq!(complaint.emotion, Some(Emotion::Fear));
        assert_eq!(complaint.priority, Some(Priority::High));
        assert_eq!(complaint.threat_level, Some(ThreatLevel::Medium));
        assert_eq!(complaint.status, ComplaintStatus::UnderReview);
        assert_eq!(
            complaint.reviewed_by.and_then(|r| r.cop_id),
            Some("KL-101".to_string())
        );
        assert_eq!(complaint.exact_keywords, vec!["stolen", "bag"]);
        assert!(complaint.audio_file.is_none());
    }

    #[test]
    fn transcript_and_detected_language_are_normalized() {
        let complaint = decode(
            r#"{"id": 3, "transcript": "spoken words", "detected_language": "ml",
                "submitted_at": "2024-06-01T10:15:00.123456"}"#,
        )
        .unwrap();

        assert_eq!(complaint.content, "spoken words");
        assert_eq!(complaint.language.as_deref(), Some("ml"));
        assert_eq!(complaint.status, ComplaintStatus::Pending);
    }

    #[test]
    fn empty_enum_fields_are_unset() {
        let complaint = decode(
            r#"{"id": 4, "content": "x", "emotion": "", "priority": null,
                "submitted_at": "2024-06-01T10:15:00+05:30"}"#,
        )
        .unwrap();

        assert!(complaint.emotion.is_none());
        assert!(complaint.priority.is_none());
        assert_eq!(complaint.threat_level_or_default(), ThreatLevel::Low);
    }

    #[test]
    fn unknown_enum_value_is_malformed() {
        let err = decode(
            r#"{"id": 5, "content": "x", "emotion": "Fear", "submitted_at": "2024-06-01T10:15:00Z"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RepositoryError::Malformed(_)));
    }

    #[test]
    fn missing_id_or_content_is_malformed() {
        assert!(matches!(
            decode(r#"{"content": "x", "submitted_at": "2024-06-01T10:15:00Z"}"#),
            Err(RepositoryError::Malformed(_))
        ));
        assert!(matches!(
            decode(r#"{"id": 1, "submitted_at": "2024-06-01T10:15:00Z"}"#),
            Err(RepositoryError::Malformed(_))
        ));
    }

    #[test]
    fn receipt_keeps_analysis_fields() {
        let wire: ComplaintWire = serde_json::from_str(
            r#"{"id": 9, "transcript": "help", "detected_language": "unknown",
                "emotion": "anger", "risk_factors": ["weapon"],
                "requires_immediate_attention": true}"#,
        )
        .unwrap();
        let receipt = SubmissionReceipt::try_from(wire).unwrap();

        assert_eq!(receipt.complaint_id, Some(ComplaintId(9)));
        assert_eq!(receipt.content.as_deref(), Some("help"));
        assert!(receipt.language.is_none());
        assert_eq!(receipt.emotion, Some(Emotion::Anger));
        assert_eq!(receipt.risk_factors, vec!["weapon"]);
        assert!(receipt.requires_immediate_attention);
    }

    #[test]
    fn principal_display_names() {
        let cop: UserRecord = serde_json::from_str(
            r#"{"id": 1, "user_type": "cop", "cop_id": "KL-7", "username": null}"#,
        )
        .unwrap();
        let cop = Principal::from(cop);
        assert_eq!(cop.display_name, "Cop KL-7");
        assert!(cop.is_reviewer());

        let user: UserRecord = serde_json::from_str(
            r#"{"id": 2, "user_type": "user", "username": "meera", "first_name": ""}"#,
        )
        .unwrap();
        let user = Principal::from(user);
        assert_eq!(user.display_name, "meera");
        assert!(!user.is_reviewer());
    }

    #[test]
    fn review_target_never_maps_to_pending() {
        for target in ReviewTarget::ALL {
            assert_ne!(target.status(), ComplaintStatus::Pending);
        }
        assert!("pending".parse::<ReviewTarget>().is_err());
    }
}
