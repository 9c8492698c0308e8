use std::path::{Path, PathBuf};

mod check;
mod config;
mod dashboard;
mod scan;
mod select;
mod status;
mod terminal;
mod tidy;

use anyhow::Context;
use check::Check;
use clap::ArgAction;
use labscan::Config;
use scan::Scan;
use status::Status;
use tidy::Tidy;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to labscan.toml beside the dataset)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Scan(Scan::default()))
            .run(self.config.as_deref())
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{
            fmt::writer::MakeWriterExt, layer::SubscriberExt, util::SubscriberInitExt,
        };

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        // stdout belongs to the dashboard, and stderr too while it is drawn.
        let writer =
            std::io::stderr.with_filter(|_: &tracing::Metadata<'_>| !dashboard::logs_paused());
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Scan bottle labels against an inventory (default)
    ///
    /// Frames are read until the source runs out or the operator quits, then
    /// every inventory row that was never seen is written to a
    /// missing-items report.
    Scan(Scan),

    /// Extract and validate CAS numbers from text
    Check(Check),

    /// Rewrite a dataset with canonical headers and encoding
    Tidy(Tidy),

    /// Summarise a dataset
    Status(Status),

    /// Show or modify configuration settings
    Config(config::Command),
}

impl Command {
    fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        match self {
            Self::Scan(command) => command.run(config)?,
            Self::Check(command) => command.run(config)?,
            Self::Tidy(command) => command.run()?,
            Self::Status(command) => command.run(config)?,
            Self::Config(command) => command.run(config)?,
        }
        Ok(())
    }
}

/// The configuration file used for `dataset`.
///
/// An explicit path wins; otherwise `labscan.toml` next to the dataset, or in
/// the working directory when there is no dataset.
fn config_path(explicit: Option<&Path>, dataset: Option<&Path>) -> PathBuf {
    explicit.map_or_else(
        || {
            dataset
                .and_then(Path::parent)
                .unwrap_or_else(|| Path::new(""))
                .join(Config::FILE_NAME)
        },
        Path::to_path_buf,
    )
}

/// Loads the configuration for `dataset`.
///
/// An explicitly named file must exist; the implicit one is optional.
fn load_config(explicit: Option<&Path>, dataset: Option<&Path>) -> anyhow::Result<Config> {
    let path = config_path(explicit, dataset);
    let config = if explicit.is_some() {
        Config::load(&path)
    } else {
        Config::load_or_default(&path)
    };
    config.with_context(|| format!("failed to load configuration from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn explicit_config_path_wins() {
        let path = config_path(Some(Path::new("/etc/lab.toml")), Some(Path::new("data/inv.csv")));
        assert_eq!(path, Path::new("/etc/lab.toml"));
    }

    #[test]
    fn config_beside_dataset() {
        let path = config_path(None, Some(Path::new("data/inv.csv")));
        assert_eq!(path, Path::new("data/labscan.toml"));

        let path = config_path(None, Some(Path::new("inv.csv")));
        assert_eq!(path, Path::new("labscan.toml"));
    }

    #[test]
    fn missing_implicit_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = tmp.path().join("inv.csv");
        assert_eq!(load_config(None, Some(&dataset)).unwrap(), Config::default());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let explicit = tmp.path().join("missing.toml");
        assert!(load_config(Some(&explicit), None).is_err());
    }

    #[test]
    fn scan_is_the_default_command() {
        let cli = Cli::try_parse_from(["labscan", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.command.is_none());
    }

    #[test]
    fn frame_sources_conflict() {
        assert!(
            Cli::try_parse_from([
                "labscan",
                "scan",
                "inv.csv",
                "--frames",
                "shots",
                "--transcript",
                "run.txt"
            ])
            .is_err()
        );
    }
}
