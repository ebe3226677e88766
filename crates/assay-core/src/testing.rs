//! Test doubles shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::SearchResult;
use crate::error::ProviderFault;
use crate::prompt::Prompt;
use crate::provider::{CompletionProvider, SearchProvider, SearchQuery};

/// A search provider that returns pre-configured results.
pub struct MockSearchProvider {
    responses: Mutex<Vec<Result<Vec<SearchResult>, ProviderFault>>>,
    /// Captured queries (for assertion).
    pub captured_queries: Mutex<Vec<SearchQuery>>,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_queries: Mutex::new(Vec::new()),
        }
    }

    /// Queue results for the next search() call (FIFO).
    pub fn queue_results(&self, results: Vec<SearchResult>) {
        self.responses.lock().unwrap().insert(0, Ok(results));
    }

    /// Queue a failure for the next search() call.
    pub fn queue_fault(&self, fault: ProviderFault) {
        self.responses.lock().unwrap().insert(0, Err(fault));
    }

    pub fn call_count(&self) -> usize {
        self.captured_queries.lock().unwrap().len()
    }

    pub fn last_query(&self) -> Option<SearchQuery> {
        self.captured_queries.lock().unwrap().last().cloned()
    }
}

impl Default for MockSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ProviderFault> {
        self.captured_queries.lock().unwrap().push(query.clone());
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(ProviderFault::malformed("No mock search response queued")))
    }
}

/// A completion provider that returns pre-configured text.
pub struct MockCompletionProvider {
    responses: Mutex<Vec<Result<String, ProviderFault>>>,
    /// Captured prompts (for assertion).
    pub captured_prompts: Mutex<Vec<Prompt>>,
    pub model: String,
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_prompts: Mutex::new(Vec::new()),
            model: "mock-model".to_string(),
        }
    }

    /// Queue a response for the next complete() call (FIFO).
    pub fn queue_response(&self, content: &str) {
        self.responses.lock().unwrap().insert(0, Ok(content.to_string()));
    }

    pub fn queue_fault(&self, fault: ProviderFault) {
        self.responses.lock().unwrap().insert(0, Err(fault));
    }

    pub fn call_count(&self) -> usize {
        self.captured_prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.captured_prompts.lock().unwrap().last().cloned()
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &str {
        "mock-completion"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderFault> {
        self.captured_prompts.lock().unwrap().push(prompt.clone());
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(ProviderFault::malformed("No mock completion response queued")))
    }
}
