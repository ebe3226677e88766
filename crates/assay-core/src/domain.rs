use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// MIME type of the exported word-processing document.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The business idea driving one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    /// Surrounding whitespace is dropped; nothing else is touched.
    pub fn new(raw: impl Into<String>) -> Result<Self, Error> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyTopic);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ranked hit returned by the search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: None,
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// The generated feasibility assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub topic: Topic,
    /// Markdown exactly as the completion provider returned it.
    pub body: String,
    pub date: NaiveDate,
    /// Number of search results the analysis was grounded on.
    pub source_count: usize,
}

/// A packed `.docx` ready to be written or offered for download.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportedDocument {
    pub fn mime_type(&self) -> &'static str {
        DOCX_MIME_TYPE
    }

    /// The file name with characters that no common filesystem accepts replaced by `_`.
    pub fn safe_file_name(&self) -> String {
        self.file_name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_rejects_blank() {
        assert!(matches!(Topic::new(""), Err(Error::EmptyTopic)));
        assert!(matches!(Topic::new("   \n\t"), Err(Error::EmptyTopic)));
    }

    #[test]
    fn test_topic_trims() {
        let topic = Topic::new("  鲜花店 ").unwrap();
        assert_eq!(topic.as_str(), "鲜花店");
        assert_eq!(topic.to_string(), "鲜花店");
    }

    #[test]
    fn test_search_result_ignores_unknown_fields() {
        let json = r#"{"title": "t", "content": "c", "raw_content": null, "favicon": "x"}"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result, SearchResult::new("t", "c"));
    }

    #[test]
    fn test_safe_file_name() {
        let doc = ExportedDocument {
            file_name: "创业评测_a/b: c?_20250101.docx".to_string(),
            bytes: Vec::new(),
        };
        assert_eq!(doc.safe_file_name(), "创业评测_a_b_ c__20250101.docx");
        assert_eq!(doc.mime_type(), DOCX_MIME_TYPE);
    }
}
