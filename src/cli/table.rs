//! Plain-text tables for command output

use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

/// Titled table with left-aligned columns
pub struct Table {
    title: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Missing cells render empty, extra cells are dropped
    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.width())
                    .chain(std::iter::once(header.width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn write_line(out: &mut dyn Write, cells: &[String], widths: &[usize]) -> io::Result<()> {
        let mut line = String::new();
        for (i, width) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            if i > 0 {
                line.push_str(" │ ");
            }
            line.push_str(cell);
            // Pad by display width so CJK and emoji stay aligned
            if i + 1 < widths.len() {
                line.push_str(&" ".repeat(width.saturating_sub(cell.width())));
            }
        }
        writeln!(out, "{}", line.trim_end())
    }

    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        let widths = self.widths();

        writeln!(out, "{}", self.title)?;
        Self::write_line(out, &self.headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        writeln!(out, "{}", rule.join("─┼─"))?;
        for row in &self.rows {
            Self::write_line(out, row, &widths)?;
        }
        Ok(())
    }
}
