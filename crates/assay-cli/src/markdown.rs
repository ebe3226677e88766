//! Markdown rendering for the report view.
//!
//! Uses pulldown-cmark to parse the report and produces ratatui `Text`,
//! which is then converted to ANSI escapes for the terminal. The renderer
//! never changes the wording of the report; it only styles it.

use crossterm::terminal::size as terminal_size;
use pulldown_cmark::{Alignment, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

struct Palette {
    bold: Style,
    italic: Style,
    code: Style,
    h1: Style,
    h2: Style,
    h3: Style,
    minor_heading: Style,
    bullet: Style,
    quote: Style,
    link: Style,
    strikethrough: Style,
    rule: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            bold: Style::default().add_modifier(Modifier::BOLD),
            italic: Style::default().add_modifier(Modifier::ITALIC),
            code: Style::default().fg(Color::Yellow),
            h1: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            h2: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            h3: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            minor_heading: Style::default().fg(Color::Cyan),
            bullet: Style::default().fg(Color::Cyan),
            quote: Style::default().fg(Color::DarkGray),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            rule: Style::default().fg(Color::DarkGray),
        }
    }
}

/// Cells collected while inside a table; rendered at the table's end.
#[derive(Default)]
struct TableBuf {
    alignments: Vec<Alignment>,
    rows: Vec<Vec<Vec<Span<'static>>>>,
    row: Vec<Vec<Span<'static>>>,
    cell: Vec<Span<'static>>,
    header_rows: usize,
}

struct Renderer {
    palette: Palette,
    width: usize,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// (ordered, next number) per open list
    lists: Vec<(bool, u64)>,
    item_prefix: Option<Span<'static>>,
    link: Option<String>,
    table: Option<TableBuf>,
    in_code_block: bool,
    quote_depth: usize,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            palette: Palette::default(),
            width,
            lines: Vec::new(),
            spans: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            item_prefix: None,
            link: None,
            table: None,
            in_code_block: false,
            quote_depth: 0,
        }
    }

    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, s| acc.patch(*s))
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn push(&mut self, span: Span<'static>) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push(span);
            return;
        }
        if let Some(prefix) = self.item_prefix.take() {
            self.spans.push(prefix);
        }
        if self.spans.is_empty() && self.quote_depth > 0 {
            self.spans
                .push(Span::styled("│ ".repeat(self.quote_depth), self.palette.quote));
        }
        self.spans.push(span);
    }

    fn text(&mut self, text: &str) {
        let style = self.style();
        if self.in_code_block || self.quote_depth > 0 {
            for (i, line) in text.split('\n').enumerate() {
                if i > 0 {
                    self.flush();
                }
                if !line.is_empty() {
                    let prefix = if self.in_code_block { "  " } else { "" };
                    self.push(Span::styled(format!("{}{}", prefix, line), style));
                }
            }
        } else {
            self.push(Span::styled(text.to_string(), style));
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                if self.lists.is_empty() {
                    self.blank();
                } else {
                    self.flush();
                }
            }

            Event::Start(Tag::Heading { level, .. }) => {
                self.blank();
                let style = match level {
                    HeadingLevel::H1 => self.palette.h1,
                    HeadingLevel::H2 => self.palette.h2,
                    HeadingLevel::H3 => self.palette.h3,
                    _ => self.palette.minor_heading,
                };
                self.styles.push(style);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.styles.pop();
                self.blank();
            }

            Event::Start(Tag::Strong) => self.styles.push(self.palette.bold),
            Event::Start(Tag::Emphasis) => self.styles.push(self.palette.italic),
            Event::Start(Tag::Strikethrough) => self.styles.push(self.palette.strikethrough),
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                self.styles.pop();
            }

            Event::Start(Tag::BlockQuote(_)) => {
                self.flush();
                self.quote_depth += 1;
                self.styles.push(self.palette.quote);
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.styles.pop();
                self.blank();
            }

            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.in_code_block = true;
                self.styles.push(self.palette.code);
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.styles.pop();
                self.blank();
            }

            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push((start.is_some(), start.unwrap_or(0)));
            }
            Event::End(TagEnd::List(_)) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                if let Some((ordered, next)) = self.lists.last_mut() {
                    let marker = if *ordered {
                        let marker = format!("{}{}. ", indent, next);
                        *next += 1;
                        marker
                    } else {
                        format!("{}• ", indent)
                    };
                    self.item_prefix = Some(Span::styled(marker, self.palette.bullet));
                }
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::TaskListMarker(done) => {
                self.push(Span::raw(if done { "[x] " } else { "[ ] " }));
            }

            Event::Start(Tag::Link { dest_url, .. }) => {
                self.link = Some(dest_url.to_string());
                self.styles.push(self.palette.link);
            }
            Event::End(TagEnd::Link) => {
                self.styles.pop();
                if let Some(url) = self.link.take() {
                    let style = self.style();
                    self.push(Span::styled(format!(" ({})", url), style));
                }
            }

            Event::Start(Tag::Table(alignments)) => {
                self.flush();
                self.table = Some(TableBuf {
                    alignments,
                    ..TableBuf::default()
                });
            }
            Event::End(TagEnd::TableHead) => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                    table.header_rows = table.rows.len();
                }
            }
            Event::End(TagEnd::TableRow) => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            Event::End(TagEnd::TableCell) => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
            }
            Event::End(TagEnd::Table) => {
                if let Some(table) = self.table.take() {
                    let rendered = render_table(&table, self.width, &self.palette);
                    self.lines.extend(rendered);
                    self.lines.push(Line::default());
                }
            }

            Event::Code(code) => {
                let style = self.palette.code;
                self.push(Span::styled(code.to_string(), style));
            }
            Event::Text(text) => self.text(&text),
            Event::SoftBreak => self.push(Span::raw(" ")),
            Event::HardBreak => {
                if self.table.is_some() {
                    self.push(Span::raw(" "));
                } else {
                    self.flush();
                }
            }
            Event::InlineHtml(html) | Event::Html(html) => {
                let tag = html.trim().to_ascii_lowercase();
                if matches!(tag.as_str(), "<br>" | "<br/>" | "<br />") {
                    if self.table.is_some() {
                        self.push(Span::raw(" "));
                    } else {
                        self.flush();
                    }
                } else {
                    self.text(&html);
                }
            }
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(self.width.min(60)),
                    self.palette.rule,
                )));
                self.lines.push(Line::default());
            }

            _ => {}
        }
    }

    fn finish(mut self) -> Text<'static> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        Text::from(self.lines)
    }
}

/// Render markdown to ratatui `Text`; `width` bounds table layout.
pub fn render_to_text(content: &str, width: usize) -> Text<'static> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut renderer = Renderer::new(width);
    for event in Parser::new_ext(content, options) {
        renderer.event(event);
    }
    renderer.finish()
}

fn cell_width(cell: &[Span]) -> usize {
    cell.iter()
        .map(|s| UnicodeWidthStr::width(s.content.as_ref()))
        .sum()
}

/// Shrink the widest columns until the table fits in `width`.
fn fit_columns(mut widths: Vec<usize>, width: usize) -> Vec<usize> {
    // "│ " + " │ " between columns + " │"
    let overhead = widths.len() * 3 + 1;
    let budget = width.saturating_sub(overhead).max(widths.len() * 4);
    while widths.iter().sum::<usize>() > budget {
        match widths.iter_mut().max() {
            Some(w) if *w > 4 => *w -= 1,
            _ => break,
        }
    }
    widths
}

/// Clip a cell to `width` display columns, marking the cut with `…`.
fn clip_cell(cell: &[Span<'static>], width: usize) -> (Vec<Span<'static>>, usize) {
    if cell_width(cell) <= width {
        return (cell.to_vec(), cell_width(cell));
    }
    let mut out = Vec::new();
    let mut used = 0;
    let limit = width.saturating_sub(1);
    'spans: for span in cell {
        let mut piece = String::new();
        for ch in span.content.chars() {
            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if used + w > limit {
                if !piece.is_empty() {
                    out.push(Span::styled(piece, span.style));
                }
                break 'spans;
            }
            used += w;
            piece.push(ch);
        }
        out.push(Span::styled(piece, span.style));
    }
    out.push(Span::raw("…"));
    (out, used + 1)
}

fn border(left: char, mid: char, right: char, widths: &[usize], style: Style) -> Line<'static> {
    let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    Line::from(Span::styled(
        format!("{}{}{}", left, inner.join(mid.to_string().as_str()), right),
        style,
    ))
}

fn render_table(table: &TableBuf, width: usize, palette: &Palette) -> Vec<Line<'static>> {
    let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }

    let mut natural = vec![1; columns];
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            natural[i] = natural[i].max(cell_width(cell));
        }
    }
    let widths = fit_columns(natural, width);
    let frame = palette.rule;

    let mut lines = vec![border('┌', '┬', '┐', &widths, frame)];
    for (r, row) in table.rows.iter().enumerate() {
        let mut spans = vec![Span::styled("│", frame)];
        for (i, col_width) in widths.iter().enumerate() {
            let empty = Vec::new();
            let cell = row.get(i).unwrap_or(&empty);
            let (mut content, used) = clip_cell(cell, *col_width);
            if r < table.header_rows {
                for span in &mut content {
                    span.style = span.style.patch(palette.bold);
                }
            }
            let pad = col_width - used;
            let (left, right) = match table.alignments.get(i) {
                Some(Alignment::Right) => (pad, 0),
                Some(Alignment::Center) => (pad / 2, pad - pad / 2),
                _ => (0, pad),
            };
            spans.push(Span::raw(" ".repeat(left + 1)));
            spans.extend(content);
            spans.push(Span::raw(" ".repeat(right + 1)));
            spans.push(Span::styled("│", frame));
        }
        lines.push(Line::from(spans));
        if r + 1 == table.header_rows {
            lines.push(border('├', '┼', '┤', &widths, frame));
        }
    }
    lines.push(border('└', '┴', '┘', &widths, frame));
    lines
}

/// Convert ratatui `Text` to an ANSI-escaped string for direct terminal output.
pub fn text_to_ansi(text: &Text) -> String {
    let mut out = String::new();
    for (i, line) in text.lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for span in &line.spans {
            match style_to_ansi(&span.style) {
                Some(sgr) => {
                    out.push_str(&sgr);
                    out.push_str(&span.content);
                    out.push_str("\x1b[0m");
                }
                None => out.push_str(&span.content),
            }
        }
    }
    out
}

fn style_to_ansi(style: &Style) -> Option<String> {
    let mut codes: Vec<String> = Vec::new();
    for (modifier, code) in [
        (Modifier::BOLD, "1"),
        (Modifier::ITALIC, "3"),
        (Modifier::UNDERLINED, "4"),
        (Modifier::CROSSED_OUT, "9"),
    ] {
        if style.add_modifier.contains(modifier) {
            codes.push(code.to_string());
        }
    }
    if let Some(code) = style.fg.and_then(color_code) {
        codes.push(code);
    }
    if codes.is_empty() {
        None
    } else {
        Some(format!("\x1b[{}m", codes.join(";")))
    }
}

fn color_code(color: Color) -> Option<String> {
    let code = match color {
        Color::Black => "30",
        Color::Red => "31",
        Color::Green => "32",
        Color::Yellow => "33",
        Color::Blue => "34",
        Color::Magenta => "35",
        Color::Cyan => "36",
        Color::Gray | Color::White => "37",
        Color::DarkGray => "90",
        Color::Indexed(n) => return Some(format!("38;5;{}", n)),
        Color::Rgb(r, g, b) => return Some(format!("38;2;{};{};{}", r, g, b)),
        _ => return None,
    };
    Some(code.to_string())
}

/// Render markdown for the current terminal (one-shot).
pub fn render_markdown(content: &str) -> String {
    let (width, _) = terminal_size().unwrap_or((80, 24));
    let width = (width as usize).saturating_sub(2).max(40);
    text_to_ansi(&render_to_text(content, width))
}
