//! Exporting a report as a `.docx` document.
//!
//! The document carries a title heading, the report body as one plain-text
//! paragraph and a closing attribution line. Markdown in the body is not
//! interpreted; emphasis markers land in the document as typed.

use std::io::Cursor;

use chrono::NaiveDate;
use docx_rs::{BreakType, Docx, Paragraph, Run, Style, StyleType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ExportedDocument, Report, Topic};
use crate::error::Error;

const TITLE_STYLE: &str = "Title";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub file_prefix: String,
    pub title_prefix: String,
    pub footer: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            file_prefix: "创业评测".to_string(),
            title_prefix: "🦁 雄心荟·创业评测：".to_string(),
            footer: "(由 DeepSeek & 雄心荟 AI 参谋生成)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportExporter {
    options: ExportOptions,
}

impl ReportExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// `{prefix}_{topic}_{YYYYMMDD}.docx`
    pub fn file_name(&self, topic: &Topic, date: NaiveDate) -> String {
        format!(
            "{}_{}_{}.docx",
            self.options.file_prefix,
            topic,
            date.format("%Y%m%d")
        )
    }

    pub fn export(&self, report: &Report) -> Result<ExportedDocument, Error> {
        let title = format!("{}{}", self.options.title_prefix, report.topic);

        let docx = Docx::new()
            .add_style(
                Style::new(TITLE_STYLE, StyleType::Paragraph)
                    .name(TITLE_STYLE)
                    .size(52)
                    .bold(),
            )
            .add_paragraph(
                Paragraph::new()
                    .style(TITLE_STYLE)
                    .add_run(Run::new().add_text(title)),
            )
            .add_paragraph(Paragraph::new().add_run(body_run(&report.body)))
            .add_paragraph(Paragraph::new())
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(&self.options.footer)));

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| Error::export(format!("Failed to pack document: {}", e)))?;

        let bytes = buffer.into_inner();
        let file_name = self.file_name(&report.topic, report.date);
        debug!(file = %file_name, bytes = bytes.len(), "Built report document");

        Ok(ExportedDocument { file_name, bytes })
    }
}

/// One run holding the text, with each newline as a line break.
///
/// CRLF and LF both count as one break, so the stored text uses LF only.
fn body_run(text: &str) -> Run {
    let mut run = Run::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        if !line.is_empty() {
            run = run.add_text(line);
        }
    }
    run
}
