use std::{path::Path, process};

use clap::Parser;
use labscan::{Extractor, domain::cas::Candidate};
use tracing::instrument;

use super::terminal::Tint;

#[derive(Debug, Parser)]
#[command(about = "Extract and validate CAS numbers from text")]
pub struct Check {
    /// Text to scan, such as a CAS number or a line of label text
    #[arg(required = true)]
    text: Vec<String>,

    /// Reject numbers with fewer digits (overrides the configuration)
    #[arg(long, value_name = "N")]
    min_digits: Option<usize>,
}

impl Check {
    /// Exits with status 1 when no valid number is found.
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        let mut config = super::load_config(config, None)?;
        if let Some(min_digits) = self.min_digits {
            config.set_min_digits(min_digits)?;
        }
        let extractor = Extractor::new(config.min_digits());

        let mut valid = 0;
        for text in &self.text {
            let candidates: Vec<_> = extractor.candidates(text).collect();
            if candidates.is_empty() {
                println!("{}", format!("{text}: no candidates").muted());
                continue;
            }
            for candidate in &candidates {
                let line = describe(candidate);
                if candidate.outcome.is_ok() {
                    valid += 1;
                    println!("{}", line.matched());
                } else {
                    println!("{}", line.invalid());
                }
            }
        }

        if valid == 0 {
            process::exit(1);
        }
        Ok(())
    }
}

fn describe(candidate: &Candidate<'_>) -> String {
    match &candidate.outcome {
        Ok(cas) => format!("valid   {cas}"),
        Err(e) => format!("invalid {}: {e}", candidate.text),
    }
}
