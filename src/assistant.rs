//! Legal assistance endpoints: language detection, the legal chatbot and
//! document summarisation / question answering.
//!
//! All of these work without a session; the credential is attached when one
//! is available.

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::BackendClient;
use crate::error::{NyayaError, RepositoryError, Result};
use crate::session::Credential;

/// Language code the backend returns when detection fails.
const UNKNOWN_LANGUAGE: &str = "unknown";

#[derive(Debug, Serialize)]
struct DetectLanguageRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetectLanguageResponse {
    language: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatbotRequest<'a> {
    question: &'a str,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct DocumentQuestionRequest<'a> {
    document_text: &'a str,
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: Option<String>,
    original_text: Option<String>,
    text: Option<String>,
}

/// Summary of an uploaded document plus the text follow-up questions use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub summary: String,
    pub document_text: String,
}

impl From<SummaryResponse> for DocumentSummary {
    fn from(response: SummaryResponse) -> Self {
        let summary = response.summary.unwrap_or_default();
        let document_text = response
            .original_text
            .filter(|t| !t.is_empty())
            .or(response.text.filter(|t| !t.is_empty()))
            .unwrap_or_else(|| summary.clone());
        Self {
            summary,
            document_text,
        }
    }
}

pub struct LegalAssistant {
    client: BackendClient,
    model: String,
}

impl LegalAssistant {
    pub fn new(client: BackendClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Detected language code, or `None` when the backend cannot tell.
    pub async fn detect_language(
        &self,
        text: &str,
        credential: Option<&Credential>,
    ) -> Result<Option<String>> {
        let text = require_text(text, "Text")?;
        let request = self
            .client
            .request(Method::POST, "/api/detect-language/", credential)
            .json(&DetectLanguageRequest { text });

        let response: DetectLanguageResponse =
            self.client.send_json("detect_language", request).await?;
        Ok(response
            .language
            .filter(|lang| !lang.is_empty() && lang != UNKNOWN_LANGUAGE))
    }

    /// Ask the legal chatbot a free-form question.
    pub async fn legal_chatbot(
        &self,
        question: &str,
        credential: Option<&Credential>,
    ) -> Result<String> {
        let question = require_text(question, "Question")?;
        let request = self
            .client
            .request(Method::POST, "/api/complaints/legal-chatbot/", credential)
            .json(&ChatbotRequest {
                question,
                model: &self.model,
            });

        let response: AnswerResponse = self.client.send_json("legal_chatbot", request).await?;
        tracing::debug!(model = %self.model, "Chatbot answered");
        answer_or_malformed(response)
    }

    /// Upload a document and get back its summary and extracted text.
    pub async fn summarize_document(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        credential: Option<&Credential>,
    ) -> Result<DocumentSummary> {
        if contents.is_empty() {
            return Err(NyayaError::Validation("Document is empty".to_string()));
        }

        let size = contents.len();
        let form = Form::new().part("file", Part::bytes(contents).file_name(file_name.to_string()));
        let request = self
            .client
            .request(
                Method::POST,
                "/api/complaints/summarize-legal-document/",
                credential,
            )
            .multipart(form);

        let response: SummaryResponse = self
            .client
            .send_json("summarize_document", request)
            .await?;
        tracing::info!(file_name = file_name, bytes = size, "Document summarised");
        Ok(response.into())
    }

    /// Ask a question about a previously summarised document.
    pub async fn ask_document(
        &self,
        document_text: &str,
        question: &str,
        credential: Option<&Credential>,
    ) -> Result<String> {
        let question = require_text(question, "Question")?;
        let document_text = require_text(document_text, "Document text")?;
        let request = self
            .client
            .request(Method::POST, "/api/complaints/ask-legal-document/", credential)
            .json(&DocumentQuestionRequest {
                document_text,
                question,
            });

        let response: AnswerResponse = self.client.send_json("ask_document", request).await?;
        answer_or_malformed(response)
    }
}

fn require_text<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NyayaError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

fn answer_or_malformed(response: AnswerResponse) -> Result<String> {
    response
        .answer
        .ok_or_else(|| RepositoryError::Malformed("response has no answer".to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_prefers_original_text() {
        let response: SummaryResponse = serde_json::from_value(json!({
            "summary": "short",
            "original_text": "full text",
            "text": "other"
        }))
        .unwrap();
        let summary = DocumentSummary::from(response);
        assert_eq!(summary.summary, "short");
        assert_eq!(summary.document_text, "full text");
    }

    #[test]
    fn summary_falls_back_to_text_then_summary() {
        let response: SummaryResponse =
            serde_json::from_value(json!({"summary": "short", "text": "body"})).unwrap();
        assert_eq!(DocumentSummary::from(response).document_text, "body");

        let response: SummaryResponse =
            serde_json::from_value(json!({"summary": "short", "original_text": ""})).unwrap();
        assert_eq!(DocumentSummary::from(response).document_text, "short");
    }

    #[test]
    fn blank_question_is_rejected() {
        assert!(matches!(
            require_text("   ", "Question"),
            Err(NyayaError::Validation(_))
        ));
        assert_eq!(require_text("  why? ", "Question").unwrap(), "why?");
    }

    #[test]
    fn missing_answer_is_malformed() {
        let err = answer_or_malformed(AnswerResponse { answer: None }).unwrap_err();
        assert!(matches!(
            err,
            NyayaError::Repository(RepositoryError::Malformed(_))
        ));
    }

    #[test]
    fn chatbot_request_carries_model() {
        let json = serde_json::to_value(ChatbotRequest {
            question: "Is this legal?",
            model: "llama-3.1-8b-instant",
        })
        .unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
    }
}
