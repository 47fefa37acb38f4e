//! Error types for saving questions and loading settings.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::{identifier::QuestionId, question::QuestionType};

/// One entry of a structured validation failure reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Field path, e.g. `["choices", "1", "text"]`. Numeric segments are
    /// accepted and kept as text.
    #[serde(deserialize_with = "path_segments")]
    pub path: Vec<String>,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: &[&str], message: impl Into<String>) -> Self {
        Self {
            path: path.iter().map(|segment| segment.to_string()).collect(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path.join("."), self.message)
        }
    }
}

fn path_segments<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Segment {
        Text(String),
        Index(u64),
    }

    let segments = Vec::<Segment>::deserialize(deserializer)?;
    Ok(segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) => text,
            Segment::Index(index) => index.to_string(),
        })
        .collect())
}

/// Errors a [`crate::transport::SaveTransport`] may return.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The server refused the payload
    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<FieldIssue>),

    /// Network, storage or any other unexpected failure
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<sqlx::Error> for SaveError {
    fn from(error: sqlx::Error) -> Self {
        SaveError::Transport(error.to_string())
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error surfaced to the status badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    pub issues: Vec<FieldIssue>,
}

impl ErrorInfo {
    /// Error text from the server is tried as a JSON list of field issues
    /// first and kept verbatim otherwise.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        match serde_json::from_str::<Vec<FieldIssue>>(&text) {
            Ok(issues) if !issues.is_empty() => Self::from_issues(issues),
            _ => Self {
                message: text,
                issues: vec![],
            },
        }
    }

    pub fn from_issues(issues: Vec<FieldIssue>) -> Self {
        Self {
            message: join_issues(&issues),
            issues,
        }
    }
}

impl From<&SaveError> for ErrorInfo {
    fn from(error: &SaveError) -> Self {
        match error {
            SaveError::Validation(issues) => ErrorInfo::from_issues(issues.clone()),
            SaveError::Transport(text) => ErrorInfo::from_text(text.as_str()),
        }
    }
}

impl From<SaveError> for ErrorInfo {
    fn from(error: SaveError) -> Self {
        ErrorInfo::from(&error)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The UI talked to an autosave session that already stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Autosave session for question {0} has stopped")]
    Closed(QuestionId),
}

/// A fetched record that cannot open the requested editor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Expected a {expected} question, found {found}")]
    WrongType {
        expected: QuestionType,
        found: QuestionType,
    },

    #[error("{question_type} questions cannot hold a {kind} row ({id})")]
    UnexpectedChild {
        question_type: QuestionType,
        kind: &'static str,
        id: String,
    },
}

/// Errors while reading settings from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid database url: {0}")]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_issue_lists_are_parsed() {
        let text = r#"[{"path":["choices",1,"text"],"message":"Required"},{"path":[],"message":"Too many choices"}]"#;
        let info = ErrorInfo::from_text(text);

        assert_eq!(info.issues.len(), 2);
        assert_eq!(info.issues[0].path, vec!["choices", "1", "text"]);
        assert_eq!(info.message, "choices.1.text: Required; Too many choices");
    }

    #[test]
    fn plain_text_is_kept_verbatim() {
        let info = ErrorInfo::from_text("connection reset by peer");
        assert_eq!(info.message, "connection reset by peer");
        assert!(info.issues.is_empty());

        let empty_list = ErrorInfo::from_text("[]");
        assert_eq!(empty_list.message, "[]");
    }

    #[test]
    fn save_errors_convert() {
        let validation = SaveError::Validation(vec![FieldIssue::new(
            &["choices", "0", "points"],
            "Must not be negative",
        )]);
        let info = ErrorInfo::from(&validation);
        assert_eq!(info.message, "choices.0.points: Must not be negative");
        assert_eq!(
            validation.to_string(),
            "Validation failed: choices.0.points: Must not be negative"
        );

        let transport = ErrorInfo::from(SaveError::Transport("timeout".into()));
        assert_eq!(transport.message, "timeout");
    }
}
