//! Paginated report layout.
//!
//! Takes numbers that were already aggregated and places them on pages:
//! a header on every page, the summary block on the first one, the table
//! split across pages, and a footer with page numbering and the time the
//! document was generated.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    pub width: usize,
    pub align: Align,
}

impl Column {
    pub fn left(title: &str, width: usize) -> Self {
        Self {
            title: title.to_string(),
            width,
            align: Align::Left,
        }
    }

    pub fn right(title: &str, width: usize) -> Self {
        Self {
            title: title.to_string(),
            width,
            align: Align::Right,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub summary: Vec<(String, String)>,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: usize,
    pub header: Vec<String>,
    pub summary: Vec<String>,
    pub table: Vec<String>,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub pages: Vec<Page>,
}

const EMPTY_TABLE: &str = "Nenhum registro no período.";
const PAGE_BREAK: char = '\u{0c}';

fn fit(text: &str, width: usize, align: Align) -> String {
    let length = text.chars().count();
    let text = if length > width {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    };

    match align {
        Align::Left => format!("{text:<width$}"),
        Align::Right => format!("{text:>width$}"),
    }
}

fn table_line(columns: &[Column], cells: &[String]) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            fit(cell, column.width, column.align)
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

pub fn layout(input: &ReportInput, generated_at: DateTime<Utc>, rows_per_page: usize) -> Document {
    let rows_per_page = rows_per_page.max(1);

    let mut header = vec![input.title.clone()];
    header.extend(input.subtitle.clone());

    let label_width = input
        .summary
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let summary: Vec<String> = input
        .summary
        .iter()
        .map(|(label, value)| format!("{}: {value}", fit(label, label_width, Align::Left)))
        .collect();

    let titles: Vec<String> = input.columns.iter().map(|c| c.title.clone()).collect();
    let column_header = table_line(&input.columns, &titles);
    let rule_width = input.columns.iter().map(|c| c.width).sum::<usize>()
        + 2 * input.columns.len().saturating_sub(1);
    let rule = "-".repeat(rule_width);

    let chunks: Vec<&[Vec<String>]> = if input.rows.is_empty() {
        vec![&input.rows[..]]
    } else {
        input.rows.chunks(rows_per_page).collect()
    };
    let total = chunks.len();
    let stamp = generated_at.format("%d/%m/%Y %H:%M UTC");

    let pages = chunks
        .into_iter()
        .enumerate()
        .map(|(index, rows)| {
            let mut table = vec![column_header.clone(), rule.clone()];
            if rows.is_empty() {
                table.push(EMPTY_TABLE.to_string());
            } else {
                table.extend(rows.iter().map(|row| table_line(&input.columns, row)));
            }

            Page {
                number: index + 1,
                header: header.clone(),
                summary: if index == 0 { summary.clone() } else { Vec::new() },
                table,
                footer: format!("Página {} de {total} · Gerado em {stamp}", index + 1),
            }
        })
        .collect();

    Document {
        title: input.title.clone(),
        generated_at,
        pages,
    }
}

impl Document {
    /// Plain-text rendering, pages separated by form feeds.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push(PAGE_BREAK);
            }
            for line in &page.header {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
            if !page.summary.is_empty() {
                for line in &page.summary {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
            }
            for line in &page.table {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
            out.push_str(&page.footer);
            out.push('\n');
        }

        out
    }
}
