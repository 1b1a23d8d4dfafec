//! Plain-text rendering of captures and header decisions.

use std::{borrow::Cow, fmt::Write as _};

use crate::{capture::SheetCapture, cell::Row};

const COLUMN_GAP: &str = "  ";

/// Renders the first `limit` records of `capture` as an aligned table.
pub fn render_capture(capture: &SheetCapture, limit: usize) -> String {
    let rows: Vec<Vec<String>> = capture
        .data
        .iter()
        .take(limit)
        .map(|record| {
            capture
                .headers
                .iter()
                .map(|key| {
                    record
                        .get(key)
                        .map(|entry| entry.value.as_text().into_owned())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    render_grid(&capture.headers, &rows)
}

/// Renders raw source rows with a leading 0-based row index column.
pub fn render_rows(rows: &[Row], first_index: usize) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut headers = vec!["#".to_string()];
    headers.extend((0..width).map(|col| col.to_string()));
    let grid: Vec<Vec<String>> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            std::iter::once((first_index + idx).to_string())
                .chain(row.iter().map(|cell| cell.as_text().into_owned()))
                .collect()
        })
        .collect();
    render_grid(&headers, &grid)
}

pub fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h).max(1)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape sequence, e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
