//! Assembling search results into the context block handed to the model.

use crate::domain::SearchResult;

/// Source-attributed search findings, one line per result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context(String);

impl Context {
    /// Join results in the order given, each as `【来源：{title}】{content}`.
    ///
    /// No re-ranking or deduplication; an empty slice yields an empty context.
    /// Line breaks inside a title or snippet become spaces so the Nth line
    /// always belongs to the Nth result.
    pub fn assemble(results: &[SearchResult]) -> Self {
        let text = results
            .iter()
            .map(|r| format!("【来源：{}】{}", single_line(&r.title), single_line(&r.content)))
            .collect::<Vec<_>>()
            .join("\n");
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
