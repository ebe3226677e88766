//! Interaction shell: collects topics, drives the pipeline, shows progress,
//! renders the report and saves the exported document.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;

use assay_core::{
    Error, Pipeline, Progress, ProgressSink, PromptTemplate, Report, ReportExporter, Stage, Topic,
};
use assay_providers::{ChatCompletionsProvider, TavilySearch};

use crate::config::Settings;
use crate::markdown;

pub const BANNER: &str = "🦁 雄心荟·超级轻创个体参谋";
pub const DISCLAIMER: &str = "🦁 雄心荟内部工具 | 数据仅供参考，投资需谨慎";

const GUIDE: &str = "Enter a business idea (e.g. 鲜花店, 收纳师, 车位投资) and assay will:\n  \
    1. 🕵️ research the latest market coverage on the web\n  \
    2. 🧠 have the model take the business model apart\n  \
    3. 💰 do the maths: unit price, margin, break-even, payback\n\
    Type quit or press Ctrl+D to leave.";

#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub output_dir: PathBuf,
    /// Write the .docx after each successful run
    pub export: bool,
    /// Print the markdown untouched instead of styling it
    pub raw: bool,
}

/// Prints stage labels to stderr so they never mix with the report on stdout.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn update(&self, progress: &Progress) {
        eprintln!("{}", progress.label());
    }
}

pub struct Outcome {
    pub report: Report,
    pub saved_to: Option<PathBuf>,
}

pub struct Shell {
    pipeline: Pipeline,
    exporter: ReportExporter,
    options: ShellOptions,
}

/// Wire the real providers from settings.
///
/// Credentials are checked before any client exists, so a missing key means
/// no topic is ever accepted and no request is ever sent.
pub fn build_shell(
    settings: &Settings,
    template: PromptTemplate,
    options: ShellOptions,
) -> Result<Shell, Error> {
    settings.validate()?;
    let search = Arc::new(TavilySearch::new(&settings.search)?);
    let completion = Arc::new(ChatCompletionsProvider::new(&settings.completion)?);

    let pipeline = Pipeline::new(search, completion)
        .with_template(template)
        .with_options(settings.pipeline_options());
    let exporter = ReportExporter::new(settings.report.export_options());

    Ok(Shell::new(pipeline, exporter, options))
}

/// One-line description of a failed run naming the stage that failed.
pub fn describe_failure(err: &anyhow::Error) -> String {
    match err.downcast_ref::<Error>() {
        Some(Error::EmptyTopic) => "👇 Please enter a business idea to assess".to_string(),
        Some(e) if e.fault().is_some_and(|f| f.is_auth_error()) => format!(
            "❌ {} failed: {} (check the {} API key)",
            e.stage(),
            e,
            key_variable(e.stage())
        ),
        Some(e) => format!("❌ {} failed: {}", e.stage(), e),
        None => format!("❌ {:#}", err),
    }
}

fn saved_line(report: &Report, path: &std::path::Path) -> String {
    format!(
        "📥 Word report saved to {} ({} web sources)",
        path.display(),
        report.source_count
    )
}

fn key_variable(stage: Stage) -> &'static str {
    match stage {
        Stage::Searching => "TAVILY_API_KEY",
        _ => "DEEPSEEK_API_KEY",
    }
}

impl Shell {
    pub fn new(pipeline: Pipeline, exporter: ReportExporter, options: ShellOptions) -> Self {
        Self {
            pipeline,
            exporter,
            options,
        }
    }

    /// Run one assessment and write the report to `out`.
    ///
    /// A blank topic never reaches the pipeline. If the export fails the
    /// report has already been written to `out`.
    pub async fn assess(
        &self,
        raw_topic: &str,
        date: NaiveDate,
        progress: &dyn ProgressSink,
        out: &mut dyn Write,
    ) -> Result<Outcome> {
        let topic = Topic::new(raw_topic)?;
        let report = self.pipeline.run(&topic, date, progress).await?;

        writeln!(out)?;
        writeln!(out, "{}", self.display(&report.body))?;
        writeln!(out)?;
        out.flush()?;

        let saved_to = if self.options.export {
            Some(self.save(&report)?)
        } else {
            None
        };

        Ok(Outcome { report, saved_to })
    }

    fn display(&self, body: &str) -> String {
        if self.options.raw {
            body.to_string()
        } else {
            markdown::render_markdown(body)
        }
    }

    /// Build the .docx and write it into the output directory.
    pub fn save(&self, report: &Report) -> Result<PathBuf, Error> {
        let document = self.exporter.export(report)?;
        let dir = &self.options.output_dir;

        std::fs::create_dir_all(dir).map_err(|e| {
            Error::export(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        let path = dir.join(document.safe_file_name());
        std::fs::write(&path, &document.bytes)
            .map_err(|e| Error::export(format!("Failed to write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), mime = document.mime_type(), "Saved report");
        Ok(path)
    }

    /// Assess a single topic from the command line.
    pub async fn run_once(&self, raw_topic: &str) -> Result<()> {
        let date = chrono::Local::now().date_naive();
        let mut stdout = std::io::stdout();
        let outcome = self.assess(raw_topic, date, &StderrProgress, &mut stdout).await?;
        if let Some(path) = &outcome.saved_to {
            eprintln!("{}", saved_line(&outcome.report, path));
        }
        Ok(())
    }

    /// Prompt for topics until EOF. A failed run is reported and discarded.
    pub async fn interactive(&self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        println!("{}\n", BANNER);
        println!("{}\n", GUIDE);

        loop {
            let line = match editor.readline("👇 Business idea to assess: ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if matches!(trimmed, "quit" | "exit") {
                break;
            }
            if !trimmed.is_empty() {
                let _ = editor.add_history_entry(trimmed);
            }

            let date = chrono::Local::now().date_naive();
            let mut stdout = std::io::stdout();
            match self.assess(trimmed, date, &StderrProgress, &mut stdout).await {
                Ok(outcome) => {
                    if let Some(path) = &outcome.saved_to {
                        println!("{}", saved_line(&outcome.report, path));
                    }
                    println!("{}\n", DISCLAIMER);
                }
                Err(err) => eprintln!("{}\n", describe_failure(&err)),
            }
        }

        Ok(())
    }
}
