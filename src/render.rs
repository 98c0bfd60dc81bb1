//! Terminal presentation of principals, complaints and submission receipts.

use std::fmt::Write as _;

use crate::models::{Complaint, ComplaintStatus, Principal, SubmissionReceipt};
use crate::rbac::{Permission, RoleType};
use crate::workflow::default_review_note;

/// Placeholder for fields the backend left unset.
pub const NOT_AVAILABLE: &str = "N/A";

const CONTENT_PREVIEW_CHARS: usize = 48;

/// `under_review` -> `Under Review`.
pub fn status_label(status: ComplaintStatus) -> String {
    status
        .as_str()
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(NOT_AVAILABLE)
}

/// Notes to show for a complaint; nothing while it is still pending.
pub fn review_notes_display(complaint: &Complaint) -> Option<&str> {
    if complaint.status == ComplaintStatus::Pending {
        return None;
    }
    Some(
        complaint
            .review_notes
            .as_deref()
            .filter(|notes| !notes.trim().is_empty())
            .unwrap_or_else(|| default_review_note(complaint.status)),
    )
}

/// Badge id of the reviewer, falling back to their username.
pub fn reviewer_label(complaint: &Complaint) -> Option<&str> {
    let reviewer = complaint.reviewed_by.as_ref()?;
    reviewer
        .cop_id
        .as_deref()
        .or(reviewer.username.as_deref())
        .filter(|label| !label.is_empty())
}

/// True when the complaint was written in a language other than English.
pub fn is_translated(language: Option<&str>) -> bool {
    match language {
        Some(lang) if !lang.trim().is_empty() => {
            let lang = lang.trim().to_lowercase();
            lang != "en" && lang != "english"
        }
        _ => false,
    }
}

pub fn welcome_line(principal: &Principal) -> String {
    let role = match principal.role {
        RoleType::Cop => "law enforcement",
        RoleType::User => "citizen",
    };
    format!("Welcome, {} ({})", principal.display_name, role)
}

/// Reviewers see every complaint, citizens only their own.
pub fn list_heading(role: RoleType) -> &'static str {
    if role.has_permission(Permission::ViewAllComplaints) {
        "All Complaints"
    } else {
        "My Complaints"
    }
}

pub fn empty_list_message(filtered: bool) -> &'static str {
    if filtered {
        "No complaints match the selected filters."
    } else {
        "No complaints found."
    }
}

fn preview(content: &str) -> String {
    let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= CONTENT_PREVIEW_CHARS {
        return single_line;
    }
    let cut: String = single_line.chars().take(CONTENT_PREVIEW_CHARS - 3).collect();
    format!("{}...", cut)
}

/// One line of the complaint table.
pub fn table_row(complaint: &Complaint) -> String {
    format!(
        "{:>5}  {:<12}  {:<8}  {:<8}  {:<6}  {:<19}  {}",
        complaint.id,
        status_label(complaint.status),
        or_na(complaint.priority.map(|p| p.as_str())),
        or_na(complaint.emotion.map(|e| e.as_str())),
        complaint.threat_level_or_default().as_str(),
        complaint.submitted_at.format("%Y-%m-%d %H:%M:%S"),
        preview(&complaint.content)
    )
}

pub fn table_header() -> String {
    format!(
        "{:>5}  {:<12}  {:<8}  {:<8}  {:<6}  {:<19}  {}",
        "ID", "Status", "Priority", "Emotion", "Threat", "Submitted", "Content"
    )
}

/// Heading, column header and one row per complaint.
pub fn complaint_table(role: RoleType, complaints: &[Complaint], filtered: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", list_heading(role), complaints.len());
    if complaints.is_empty() {
        let _ = writeln!(out, "{}", empty_list_message(filtered));
        return out;
    }
    let _ = writeln!(out, "{}", table_header());
    for complaint in complaints {
        let _ = writeln!(out, "{}", table_row(complaint));
    }
    out
}

/// Full view of one complaint.
pub fn complaint_detail(complaint: &Complaint) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Complaint #{}", complaint.id);
    let _ = writeln!(out, "  Submitted by: {}", or_na(Some(complaint.submitter_name.as_str())));
    let _ = writeln!(out, "  Location:     {}", or_na(Some(complaint.location.as_str())));
    let _ = writeln!(
        out,
        "  Submitted at: {}",
        complaint.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "  Type:         {}", or_na(complaint.complaint_type.as_deref()));
    let _ = writeln!(out, "  Language:     {}", or_na(complaint.language.as_deref()));
    let _ = writeln!(out, "  Status:       {}", status_label(complaint.status));
    let _ = writeln!(
        out,
        "  Priority:     {}",
        or_na(complaint.priority.map(|p| p.as_str()))
    );
    let _ = writeln!(
        out,
        "  Emotion:      {}",
        or_na(complaint.emotion.map(|e| e.as_str()))
    );
    let _ = writeln!(
        out,
        "  Threat level: {}",
        complaint.threat_level_or_default().as_str()
    );
    if !complaint.exact_keywords.is_empty() {
        let _ = writeln!(out, "  Keywords:     {}", complaint.exact_keywords.join(", "));
    }
    if let Some(audio) = complaint.audio_file.as_deref() {
        let _ = writeln!(out, "  Audio:        {}", audio);
    }
    if is_translated(complaint.language.as_deref()) {
        let _ = writeln!(out, "  [Translated from {}]", or_na(complaint.language.as_deref()));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", complaint.content);

    if let Some(notes) = review_notes_display(complaint) {
        let _ = writeln!(out);
        let _ = writeln!(out, "Review notes: {}", notes);
        if let Some(reviewer) = reviewer_label(complaint) {
            let _ = writeln!(out, "Reviewed by:  {}", reviewer);
        }
    }
    out
}

/// Analysis shown after a complaint submission.
pub fn submission_receipt(receipt: &SubmissionReceipt) -> String {
    let mut out = String::new();
    match receipt.complaint_id {
        Some(id) => {
            let _ = writeln!(out, "Complaint #{} submitted.", id);
        }
        None => {
            let _ = writeln!(out, "Complaint submitted.");
        }
    }
    write_analysis(&mut out, receipt);
    out
}

/// Analysis of a recording that was transcribed but not filed.
pub fn transcription_preview(receipt: &SubmissionReceipt) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Transcription preview (not filed).");
    write_analysis(&mut out, receipt);
    out
}

fn write_analysis(out: &mut String, receipt: &SubmissionReceipt) {
    if receipt.requires_immediate_attention {
        let _ = writeln!(out, "  !! Requires immediate attention");
    }
    if let Some(language) = receipt.language.as_deref() {
        let _ = writeln!(out, "  Detected language: {}", language);
    }
    if let Some(content) = receipt.content.as_deref() {
        let _ = writeln!(out, "  Content:           {}", content);
    }
    if let Some(translated) = receipt.translated_text.as_deref() {
        let _ = writeln!(out, "  Translation:       {}", translated);
    }
    let _ = writeln!(
        out,
        "  Priority:          {}",
        or_na(receipt.priority.map(|p| p.as_str()))
    );
    let _ = writeln!(
        out,
        "  Emotion:           {}",
        or_na(receipt.emotion.map(|e| e.as_str()))
    );
    let _ = writeln!(
        out,
        "  Threat level:      {}",
        receipt.threat_level.unwrap_or_default().as_str()
    );
    if !receipt.risk_factors.is_empty() {
        let _ = writeln!(out, "  Risk factors:      {}", receipt.risk_factors.join(", "));
    }
    if !receipt.exact_keywords.is_empty() {
        let _ = writeln!(out, "  Keywords:          {}", receipt.exact_keywords.join(", "));
    }
}
