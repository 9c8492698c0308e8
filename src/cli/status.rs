use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process,
};

use anyhow::Context;
use clap::Parser;
use labscan::{CasNumber, InventoryIndex};
use tracing::instrument;

use super::terminal::Tint;

#[derive(Debug, Parser)]
#[command(about = "Summarise a dataset: records, invalid and duplicate CAS numbers")]
pub struct Status {
    /// The inventory CSV
    dataset: PathBuf,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// What a dataset looks like before scanning.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    records: usize,
    columns: Vec<String>,
    /// Identifiers failing validation, with the reason.
    invalid: Vec<(String, String)>,
    /// Identifiers on more than one row, with the row count.
    duplicates: BTreeMap<String, usize>,
}

impl Summary {
    fn of(index: &InventoryIndex, min_digits: usize) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut invalid = Vec::new();
        for record in index.records() {
            let count = counts.entry(record.identifier()).or_insert(0);
            *count += 1;
            if *count == 1 {
                if let Err(e) = CasNumber::parse_with_min(record.identifier(), min_digits) {
                    invalid.push((record.identifier().to_string(), e.to_string()));
                }
            }
        }

        Self {
            records: index.total_count(),
            columns: index.columns().to_vec(),
            invalid,
            duplicates: counts
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(identifier, count)| (identifier.to_string(), count))
                .collect(),
        }
    }
}

impl Status {
    /// Exits with status 2 when any identifier is invalid.
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        let config = super::load_config(config, Some(&self.dataset))?;
        let index = InventoryIndex::load(&self.dataset)
            .with_context(|| format!("failed to load dataset {}", self.dataset.display()))?;

        if index.is_empty() {
            println!("No inventory records found in {}.", self.dataset.display());
            return Ok(());
        }

        let summary = Summary::of(&index, config.min_digits());
        match self.output {
            OutputFormat::Json => Self::output_json(&summary)?,
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&summary);
                } else {
                    Self::output_table(&summary);
                }
            }
        }

        if !summary.invalid.is_empty() {
            process::exit(2);
        }
        Ok(())
    }

    fn output_json(summary: &Summary) -> anyhow::Result<()> {
        use serde_json::json;

        let invalid: Vec<_> = summary
            .invalid
            .iter()
            .map(|(cas, reason)| json!({ "cas": cas, "reason": reason }))
            .collect();

        let output = json!({
            "records": summary.records,
            "columns": summary.columns,
            "invalid": invalid,
            "duplicates": summary.duplicates,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(summary: &Summary) {
        println!(
            "records={} invalid={} duplicates={}",
            summary.records,
            summary.invalid.len(),
            summary.duplicates.len()
        );
    }

    fn output_table(summary: &Summary) {
        const MAX_DISPLAY: usize = 10;

        println!("Inventory");
        println!("{}", "─────────".muted());
        println!("Records: {}", summary.records);
        println!("Columns: {}", summary.columns.join(", "));
        println!();

        if summary.invalid.is_empty() {
            println!("Invalid CAS numbers: {} ✅", "0".matched());
        } else {
            println!(
                "Invalid CAS numbers: {} ⚠️",
                summary.invalid.len().to_string().attention()
            );
            for (_, reason) in summary.invalid.iter().take(MAX_DISPLAY) {
                println!("  - {reason}");
            }
            if summary.invalid.len() > MAX_DISPLAY {
                println!("  - ... and {} more", summary.invalid.len() - MAX_DISPLAY);
            }
            println!("{}", "These rows can never be matched by a scan.".muted());
        }

        println!();

        if summary.duplicates.is_empty() {
            println!("Duplicate CAS numbers: {} ✅", "0".matched());
        } else {
            println!(
                "Duplicate CAS numbers: {} ⚠️",
                summary.duplicates.len().to_string().attention()
            );
            for (cas, count) in summary.duplicates.iter().take(MAX_DISPLAY) {
                println!("  - {cas} ({count} rows)");
            }
            println!(
                "{}",
                "A scan shows the last of these rows; the report lists all of them.".muted()
            );
        }
    }
}
