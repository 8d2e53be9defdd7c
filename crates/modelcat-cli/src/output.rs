//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use modelcat_domain::{ProcessingOutcome, ProcessingRecord, ValidatedEntity};
use modelcat_ingest::BatchRun;
use modelcat_store::LedgerCounts;
use serde_json::Value;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format an extracted entity.
    pub fn format_entity(&self, entity: &ValidatedEntity) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(entity)?),
            OutputFormat::Quiet => Ok(entity.draft.natural_key()),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                builder.push_record(["kind".to_string(), entity.kind().to_string()]);
                builder.push_record(["confidence".to_string(), format!("{:?}", entity.confidence).to_lowercase()]);

                // Drafts serialize as {"kind": ..., <fields>}
                if let Value::Object(fields) = serde_json::to_value(&entity.draft)? {
                    for (name, value) in fields.iter().filter(|(name, _)| name.as_str() != "kind") {
                        builder.push_record([name.clone(), display_value(value)]);
                    }
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a batch run report.
    pub fn format_run(&self, run: &BatchRun) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(run)?),
            OutputFormat::Quiet => Ok(format!("{} {} {}", run.accepted, run.skipped, run.failed)),
            OutputFormat::Table => {
                let mut lines = vec![run.summary()];
                if !run.failures.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["Source", "Stage", "Retryable", "Message"]);
                    for failure in &run.failures {
                        builder.push_record([
                            failure.source_key.to_string(),
                            failure.stage.to_string(),
                            failure.retryable.to_string(),
                            failure.message.clone(),
                        ]);
                    }
                    lines.push(String::new());
                    lines.push(self.render(builder));
                }
                if run.cancelled {
                    lines.push(self.warning("Run cancelled; rerun to process the remaining items"));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format ledger entries.
    pub fn format_records(&self, records: &[ProcessingRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
            OutputFormat::Quiet => Ok(records
                .iter()
                .map(|r| r.source_key.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if records.is_empty() {
                    return Ok(self.colorize("No ledger entries found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Recorded", "Outcome", "Source", "Detail"]);
                for record in records {
                    builder.push_record([
                        record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        self.outcome(record.outcome),
                        record.source_key.to_string(),
                        record.detail.clone().unwrap_or_default(),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format ledger counts.
    pub fn format_counts(&self, counts: &LedgerCounts) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "accepted": counts.accepted,
                "rejected": counts.rejected,
                "skipped_duplicate": counts.skipped_duplicate,
            }))?),
            OutputFormat::Quiet => Ok(format!(
                "{} {} {}",
                counts.accepted, counts.rejected, counts.skipped_duplicate
            )),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Outcome", "Entries"]);
                builder.push_record([self.outcome(ProcessingOutcome::Accepted), counts.accepted.to_string()]);
                builder.push_record([self.outcome(ProcessingOutcome::Rejected), counts.rejected.to_string()]);
                builder.push_record([
                    self.outcome(ProcessingOutcome::SkippedDuplicate),
                    counts.skipped_duplicate.to_string(),
                ]);
                Ok(self.render(builder))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn outcome(&self, outcome: ProcessingOutcome) -> String {
        let color = match outcome {
            ProcessingOutcome::Accepted => "green",
            ProcessingOutcome::Rejected => "red",
            ProcessingOutcome::SkippedDuplicate => "cyan",
        };
        self.colorize(outcome.as_str(), color)
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
