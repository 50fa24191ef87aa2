use async_trait::async_trait;
use proctor_core::model::QuestionType;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::camera::Frame;
use crate::config::ProctorConfig;
use crate::error::ClassifierError;

/// Decides from a frame whether the candidate is looking away.
#[async_trait]
pub trait AttentionClassifier: Send + Sync {
    /// # Errors
    ///
    /// Returns `ClassifierError` when no verdict could be obtained.
    async fn classify_frame(&self, frame: &Frame) -> Result<bool, ClassifierError>;
}

/// Decides whether a question is theoretical or numerical.
#[async_trait]
pub trait QuestionTypeClassifier: Send + Sync {
    /// # Errors
    ///
    /// Returns `ClassifierError` when no type could be obtained. Unknown labels
    /// are reported as `ClassifierError::UnexpectedResponse`.
    async fn classify_question(&self, question: &str) -> Result<QuestionType, ClassifierError>;
}

/// HTTP client for the classification service.
///
/// `POST {base}/analyze_face` takes a multipart `file` field and answers
/// `{"lookAway": bool}`. `POST {base}/classify` takes `{"question": text}` and
/// answers `{"type": "Theoretical" | "Numerical"}`.
#[derive(Clone)]
pub struct HttpClassifier {
    client: Client,
    base_url: String,
}

impl HttpClassifier {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::Http` if the HTTP client cannot be built.
    pub fn from_config(config: &ProctorConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::new(client, config.classifier_base_url.clone()))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, ClassifierError> {
        if !response.status().is_success() {
            return Err(ClassifierError::HttpStatus(response.status()));
        }
        let body = response.bytes().await.map_err(map_transport)?;
        Ok(body.to_vec())
    }
}

fn map_transport(err: reqwest::Error) -> ClassifierError {
    if err.is_timeout() {
        ClassifierError::Timeout
    } else {
        ClassifierError::Http(err)
    }
}

#[async_trait]
impl AttentionClassifier for HttpClassifier {
    async fn classify_frame(&self, frame: &Frame) -> Result<bool, ClassifierError> {
        let part = Part::bytes(frame.bytes().to_vec())
            .file_name("frame.jpg")
            .mime_str(frame.mime())?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("analyze_face"))
            .multipart(form)
            .send()
            .await
            .map_err(map_transport)?;
        let body = Self::read_body(response).await?;
        parse_attention(&body)
    }
}

#[async_trait]
impl QuestionTypeClassifier for HttpClassifier {
    async fn classify_question(&self, question: &str) -> Result<QuestionType, ClassifierError> {
        let response = self
            .client
            .post(self.endpoint("classify"))
            .json(&ClassifyRequest { question })
            .send()
            .await
            .map_err(map_transport)?;
        let body = Self::read_body(response).await?;
        parse_question_type(&body)
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeFaceResponse {
    #[serde(rename = "lookAway")]
    look_away: bool,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(rename = "type")]
    label: String,
}

fn parse_attention(body: &[u8]) -> Result<bool, ClassifierError> {
    serde_json::from_slice::<AnalyzeFaceResponse>(body)
        .map(|r| r.look_away)
        .map_err(|e| ClassifierError::UnexpectedResponse(e.to_string()))
}

fn parse_question_type(body: &[u8]) -> Result<QuestionType, ClassifierError> {
    let response: ClassifyResponse = serde_json::from_slice(body)
        .map_err(|e| ClassifierError::UnexpectedResponse(e.to_string()))?;
    QuestionType::from_label(response.label.trim()).ok_or_else(|| {
        ClassifierError::UnexpectedResponse(format!("unknown question type: {}", response.label))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attention_verdicts() {
        assert!(parse_attention(br#"{"lookAway": true}"#).unwrap());
        assert!(!parse_attention(br#"{"lookAway": false, "faces": 1}"#).unwrap());
    }

    #[test]
    fn attention_shape_errors_are_unexpected_responses() {
        let bodies: [&[u8]; 3] = [br#"{"look_away": true}"#, br#"{"lookAway": "yes"}"#, b"<html>"];
        for body in bodies {
            let err = parse_attention(body).unwrap_err();
            assert!(err.is_unexpected_response(), "{err}");
        }
    }

    #[test]
    fn parses_question_types() {
        assert_eq!(
            parse_question_type(br#"{"type": "Theoretical"}"#).unwrap(),
            QuestionType::Theoretical
        );
        assert_eq!(
            parse_question_type(br#"{"type": "Numerical"}"#).unwrap(),
            QuestionType::Numerical
        );
    }

    #[test]
    fn unknown_labels_are_unexpected_responses() {
        let err = parse_question_type(br#"{"type": "Essay"}"#).unwrap_err();
        assert!(err.is_unexpected_response());
        let err = parse_question_type(br#"{"label": "Numerical"}"#).unwrap_err();
        assert!(err.is_unexpected_response());
    }

    #[test]
    fn endpoints_ignore_trailing_slash() {
        let classifier = HttpClassifier::new(Client::new(), "http://localhost:8000/");
        assert_eq!(
            classifier.endpoint("classify"),
            "http://localhost:8000/classify"
        );
        assert_eq!(classifier.base_url(), "http://localhost:8000/");
    }

    #[test]
    fn builds_from_config() {
        let classifier = HttpClassifier::from_config(&ProctorConfig::default()).unwrap();
        assert_eq!(
            classifier.endpoint("analyze_face"),
            "http://127.0.0.1:8000/analyze_face"
        );
    }
}
