use std::{
    io::{self, IsTerminal},
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use labscan::{
    Config, InventoryIndex, Session, StopReason,
    domain::SourceSelector,
    session::{
        FrameDirectory, FrameSource, NoInput, Passthrough, Recognizer, TesseractCli, Transcript,
    },
};
use tracing::instrument;

use super::{
    dashboard::{Dashboard, Keyboard, Plain},
    select,
    terminal::Tint,
};

#[derive(Debug, Parser, Default)]
pub struct Scan {
    /// The inventory CSV (chosen interactively when omitted)
    dataset: Option<PathBuf>,

    /// Read frames from the image files in a directory
    #[arg(long, value_name = "DIR", conflicts_with = "transcript")]
    frames: Option<PathBuf>,

    /// Replay a transcript with one line of label text per frame
    #[arg(long, value_name = "FILE")]
    transcript: Option<PathBuf>,

    /// Run recognition on every Nth frame
    #[arg(long, value_name = "N")]
    poll_interval: Option<NonZeroU32>,

    /// Seconds a match stays on screen after it was last seen
    #[arg(long, value_name = "SECS")]
    persistence: Option<f64>,

    /// Directory for the missing-items report (defaults to the dataset's)
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,

    /// Also match chemical names when no CAS number is found
    #[arg(long)]
    fuzzy: bool,

    /// Print matches line by line instead of drawing the dashboard
    #[arg(long)]
    headless: bool,
}

impl Scan {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        let dataset = match &self.dataset {
            Some(dataset) => dataset.clone(),
            None => select::dataset()?,
        };

        let mut config = super::load_config(config, Some(&dataset))?;
        self.apply(&mut config)?;

        let index = InventoryIndex::load(&dataset)
            .with_context(|| format!("failed to load dataset {}", dataset.display()))?;
        if index.is_empty() {
            anyhow::bail!("{} contains no inventory records", dataset.display());
        }
        println!(
            "Loaded {} records from {}",
            index.total_count(),
            dataset.display()
        );

        let selector = config.source.clone().context(
            "no frame source: pass --frames or --transcript, or set `source` in labscan.toml",
        )?;
        let (mut source, mut recognizer) = open(&selector, &config)?;

        let mut session = Session::new(index, &config);
        let summary = if !self.headless && io::stdout().is_terminal() {
            let mut dashboard = Dashboard::enter().context("failed to set up the terminal")?;
            session.run(
                source.as_mut(),
                recognizer.as_mut(),
                &mut dashboard,
                &mut Keyboard,
            )
            // The terminal is restored here, before anything else is printed.
        } else {
            session.run(
                source.as_mut(),
                recognizer.as_mut(),
                &mut Plain::new(io::stdout()),
                &mut NoInput,
            )
        };
        tracing::debug!(?summary, "scan finished");
        if let StopReason::CaptureFailed(reason) = &summary.reason {
            println!("{}", format!("Capture stopped early: {reason}").attention());
        }

        let index = session.into_index();
        let report_dir = config
            .report_dir
            .clone()
            .unwrap_or_else(|| dataset_dir(&dataset));
        let missing = index.missing_records().len();
        println!("Scanned {} / {}", index.scanned_count(), index.total_count());
        let line = format!("Missing {missing}");
        if missing == 0 {
            println!("{}", line.matched());
        } else {
            println!("{}", line.attention());
        }
        let report = index.generate_missing_report(&report_dir)?;
        println!("Report: {}", report.display());
        Ok(())
    }

    /// Applies command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(dir) = &self.frames {
            config.source = Some(SourceSelector::Frames { dir: dir.clone() });
        }
        if let Some(path) = &self.transcript {
            config.source = Some(SourceSelector::Transcript { path: path.clone() });
        }
        if let Some(interval) = self.poll_interval {
            config.set_poll_interval(interval);
        }
        if let Some(seconds) = self.persistence {
            config.set_persistence_seconds(seconds)?;
        }
        if let Some(dir) = &self.report_dir {
            config.report_dir = Some(dir.clone());
        }
        if self.fuzzy {
            config.fuzzy.enabled = true;
        }
        Ok(())
    }
}

/// Opens the frame source and the recogniser that reads its frames.
fn open(
    selector: &SourceSelector,
    config: &Config,
) -> anyhow::Result<(Box<dyn FrameSource>, Box<dyn Recognizer>)> {
    Ok(match selector {
        SourceSelector::Frames { dir } => (
            Box::new(FrameDirectory::open(dir)?),
            Box::new(TesseractCli::new(config.tesseract.clone())),
        ),
        SourceSelector::Transcript { path } => {
            (Box::new(Transcript::open(path)?), Box::new(Passthrough))
        }
    })
}

fn dataset_dir(dataset: &Path) -> PathBuf {
    dataset
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
