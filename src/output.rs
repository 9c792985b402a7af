use std::io::{self, Write};

use serde::Serialize;

use crate::app::{CurateResult, ExtractResult, ProgressEvent, ProgressSink};
use crate::report::SummaryReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_extract(result: &ExtractResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_curate(result: &CurateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_summary(report: &SummaryReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_extract(result: &ExtractResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        let tally = &result.tally;
        writeln!(
            stdout,
            "{}: accepted {} of {} entries ({} rejected)",
            result.label,
            tally.accepted,
            tally.seen,
            tally.rejected_total()
        )?;
        for (reason, count) in &tally.rejected {
            writeln!(stdout, "  {reason}: {count}")?;
        }
        if !tally.kingdoms.is_empty() {
            writeln!(stdout, "kingdoms:")?;
            for (kingdom, count) in &tally.kingdoms {
                writeln!(stdout, "  {kingdom}: {count}")?;
            }
        }
        if tally.n_terminal_tmh > 0 {
            writeln!(stdout, "  n-terminal transmembrane helix: {}", tally.n_terminal_tmh)?;
        }
        writeln!(stdout, "  table: {}", result.table_path)?;
        writeln!(stdout, "  fasta: {}", result.fasta_path)?;
        Ok(())
    }

    pub fn print_curate(result: &CurateResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", result.summary)?;
        writeln!(stdout)?;
        writeln!(
            stdout,
            "folds (k={}, seed={}): {:?}",
            result.k_folds, result.seed, result.fold_sizes
        )?;
        for counts in &result.fold_counts {
            writeln!(
                stdout,
                "  fold {}: {} negative, {} positive",
                counts.fold, counts.negative, counts.positive
            )?;
        }
        for warning in &result.warnings {
            writeln!(stdout, "warning: {warning}")?;
        }
        for path in &result.outputs {
            writeln!(stdout, "wrote {path}")?;
        }
        Ok(())
    }

    pub fn print_summary(report: &SummaryReport) -> io::Result<()> {
        write!(io::stdout(), "{report}")
    }
}

/// Forwards pipeline progress to the log.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}
