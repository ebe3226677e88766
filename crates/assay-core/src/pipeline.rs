//! The assessment pipeline: topic → query → search → context → prompt →
//! completion → report.
//!
//! Strictly sequential: the completion request is only issued once the
//! search has fully returned, and any failure ends the run with nothing kept.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::context::Context;
use crate::domain::{Report, Topic};
use crate::error::Error;
use crate::prompt::PromptTemplate;
use crate::provider::{CompletionProvider, SearchDepth, SearchProvider, SearchQuery};
use crate::query::{build_query, format_date};

/// Stage transitions reported while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Searching { date: NaiveDate },
    Searched { results: usize },
    Analyzing { model: String },
    Complete,
}

impl Progress {
    pub fn label(&self) -> String {
        match self {
            Progress::Searching { date } => {
                format!("🕵️ Gathering the latest intelligence as of {}...", format_date(*date))
            }
            Progress::Searched { results } => {
                format!("✅ Intelligence gathered ({} sources)", results)
            }
            Progress::Analyzing { model } => {
                format!("🧠 {} is analyzing the business model...", model)
            }
            Progress::Complete => "✅ Assessment report generated".to_string(),
        }
    }
}

/// Receives progress updates from a running pipeline.
pub trait ProgressSink: Send + Sync {
    fn update(&self, progress: &Progress);
}

/// Discards progress updates.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _progress: &Progress) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_results: usize,
    pub depth: SearchDepth,
    /// Append the dated price-trend qualifiers to the search query.
    pub time_qualified: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            depth: SearchDepth::Advanced,
            time_qualified: true,
        }
    }
}

pub struct Pipeline {
    search: Arc<dyn SearchProvider>,
    completion: Arc<dyn CompletionProvider>,
    template: PromptTemplate,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(search: Arc<dyn SearchProvider>, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            search,
            completion,
            template: PromptTemplate::feasibility(),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one assessment for `topic` as of `date`.
    pub async fn run(
        &self,
        topic: &Topic,
        date: NaiveDate,
        progress: &dyn ProgressSink,
    ) -> Result<Report, Error> {
        let query = SearchQuery::new(build_query(topic, date, self.options.time_qualified))
            .with_depth(self.options.depth)
            .with_max_results(self.options.max_results);

        progress.update(&Progress::Searching { date });
        info!(provider = self.search.name(), topic = %topic, "Searching");
        debug!(query = %query.query, "Search query");

        let mut results = self.search.search(&query).await.map_err(Error::search)?;
        results.truncate(self.options.max_results);
        progress.update(&Progress::Searched {
            results: results.len(),
        });

        let context = Context::assemble(&results);
        if context.is_empty() {
            info!("Search returned no results; analyzing without external context");
        }
        let prompt = self.template.render(topic, &context);

        progress.update(&Progress::Analyzing {
            model: self.completion.model().to_string(),
        });
        info!(
            provider = self.completion.name(),
            model = self.completion.model(),
            prompt_chars = prompt.user.chars().count(),
            "Analyzing"
        );

        let body = self
            .completion
            .complete(&prompt)
            .await
            .map_err(Error::completion)?;
        progress.update(&Progress::Complete);

        Ok(Report {
            topic: topic.clone(),
            body,
            date,
            source_count: results.len(),
        })
    }
}
