use std::fmt;

use serde::Serialize;

use crate::domain::Label;
use crate::table::RecordTable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub stage: String,
    pub total: usize,
    pub negative: usize,
    pub positive: usize,
}

impl StageCounts {
    pub fn of(stage: impl Into<String>, table: &RecordTable) -> Self {
        Self {
            stage: stage.into(),
            total: table.len(),
            negative: table.count(Label::Negative),
            positive: table.count(Label::Positive),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    pub stages: Vec<StageCounts>,
}

impl SummaryReport {
    pub fn stage(&self, name: &str) -> Option<&StageCounts> {
        self.stages.iter().find(|s| s.stage == name)
    }
}

/// One row per named table, in the order given.
pub fn summarize<'a, I, S>(stages: I) -> SummaryReport
where
    I: IntoIterator<Item = (S, &'a RecordTable)>,
    S: Into<String>,
{
    SummaryReport {
        stages: stages
            .into_iter()
            .map(|(name, table)| StageCounts::of(name, table))
            .collect(),
    }
}

const HEADERS: [&str; 4] = ["Dataset", "Total", "Negative", "Positive"];

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self
            .stages
            .iter()
            .map(|s| {
                [
                    s.stage.clone(),
                    s.total.to_string(),
                    s.negative.to_string(),
                    s.positive.to_string(),
                ]
            })
            .collect::<Vec<_>>();

        let mut widths = HEADERS.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        write!(f, "| {:<w$} |", HEADERS[0], w = widths[0])?;
        for (header, width) in HEADERS.iter().zip(widths).skip(1) {
            write!(f, " {header:>width$} |")?;
        }
        writeln!(f)?;
        write!(f, "|:{}-|", "-".repeat(widths[0]))?;
        for width in widths.iter().skip(1) {
            write!(f, "-{}:|", "-".repeat(*width))?;
        }
        writeln!(f)?;
        for row in rows {
            write!(f, "| {:<w$} |", row[0], w = widths[0])?;
            for (cell, width) in row.iter().zip(widths).skip(1) {
                write!(f, " {cell:>width$} |")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
