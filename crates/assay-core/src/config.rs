//! Provider configuration objects.
//!
//! Each adapter is constructed from one of these; nothing reads credentials
//! from the environment behind the caller's back.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::provider::SearchDepth;

pub const DEFAULT_SEARCH_URL: &str = "https://api.tavily.com";
pub const DEFAULT_COMPLETION_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_COMPLETION_MODEL: &str = "deepseek-chat";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_results: usize,
    pub depth: SearchDepth,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_SEARCH_URL.to_string(),
            max_results: 5,
            depth: SearchDepth::Advanced,
            timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The credential, or a configuration error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str, Error> {
        require(self.api_key.as_deref(), "TAVILY_API_KEY")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_COMPLETION_URL.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl CompletionConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn require_api_key(&self) -> Result<&str, Error> {
        require(self.api_key.as_deref(), "DEEPSEEK_API_KEY")
    }
}

fn require<'a>(value: Option<&'a str>, var: &str) -> Result<&'a str, Error> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::config(format!(
            "{var} is not set. Add it to your environment or .env file"
        ))),
    }
}
