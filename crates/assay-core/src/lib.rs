//! assay-core: Core types, traits and pipeline for assay
//!
//! This crate holds everything between the user's topic and the finished
//! report: query construction, context assembly, prompt templating, report
//! export, and the pipeline that drives the two external providers.

pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod query;
pub mod report;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{CompletionConfig, SearchConfig};
pub use context::Context;
pub use domain::{ExportedDocument, Report, SearchResult, Topic, DOCX_MIME_TYPE};
pub use error::{Error, ProviderFault, Stage};
pub use pipeline::{NoProgress, Pipeline, PipelineOptions, Progress, ProgressSink};
pub use prompt::{Prompt, PromptTemplate};
pub use provider::{CompletionProvider, SearchDepth, SearchProvider, SearchQuery};
pub use query::{build_query, format_date};
pub use report::{ExportOptions, ReportExporter};

pub type Result<T> = std::result::Result<T, Error>;
