use std::{
    fs::File,
    path::{Path, PathBuf},
    process,
};

use anyhow::Context;
use clap::Parser;
use labscan::{
    CasNumber,
    storage::{ColumnMap, Field, report},
};
use tracing::instrument;

use super::terminal::Tint;

#[derive(Debug, Parser)]
#[command(about = "Rewrite a dataset with canonical headers and encoding")]
pub struct Tidy {
    /// The dataset to rewrite
    input: PathBuf,

    /// Where to write the result (defaults to Clean_<INPUT> beside the input)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

/// A dataset in canonical form.
#[derive(Debug, Default)]
struct Tidied {
    rows: Vec<Vec<String>>,
    /// Rows kept despite an invalid registry number: (line, error).
    flagged: Vec<(usize, String)>,
    /// Lines dropped for lacking a registry number.
    dropped: Vec<usize>,
}

impl Tidy {
    /// Exits with status 2 when any row carries an invalid registry number.
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let file = File::open(&self.input)
            .with_context(|| format!("failed to open {}", self.input.display()))?;
        let tidied = tidy(file)
            .with_context(|| format!("failed to read dataset {}", self.input.display()))?;

        let output = self.output.unwrap_or_else(|| default_output(&self.input));
        let headers: Vec<String> = Field::ALL
            .iter()
            .map(|field| field.canonical().to_string())
            .collect();
        report::write_file(&output, &headers, tidied.rows.iter().map(Vec::as_slice))?;

        println!(
            "{}",
            format!("Wrote {} rows to {}", tidied.rows.len(), output.display()).matched()
        );
        for line in &tidied.dropped {
            println!("{}", format!("line {line}: no CAS number, dropped").muted());
        }
        for (line, error) in &tidied.flagged {
            println!("{}", format!("line {line}: {error}").attention());
        }

        if !tidied.flagged.is_empty() {
            process::exit(2);
        }
        Ok(())
    }
}

fn tidy(reader: impl std::io::Read) -> anyhow::Result<Tidied> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut tidied = Tidied::default();
    for (i, row) in reader.records().enumerate() {
        let line = i + 2;
        let row = row?;
        let row = columns.canonical_row(&row);

        let identifier = &row[0];
        if identifier.is_empty() {
            tidied.dropped.push(line);
            continue;
        }
        if let Err(e) = identifier.parse::<CasNumber>() {
            tidied.flagged.push((line, e.to_string()));
        }
        tidied.rows.push(row);
    }
    Ok(tidied)
}

fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map_or_else(|| "inventory.csv".into(), |name| name.to_string_lossy());
    input.with_file_name(format!("Clean_{name}"))
}
