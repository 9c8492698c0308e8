use std::{
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use anyhow::Context;
use labscan::{Config, domain::SourceSelector};
use tracing::instrument;

use crate::cli::terminal::Tint;

/// Keys accepted by `get` and `set`.
const KEYS: &[&str] = &[
    "poll_interval",
    "persistence_seconds",
    "min_digits",
    "source",
    "tesseract",
    "fuzzy.enabled",
    "fuzzy.threshold",
    "report_dir",
];

#[derive(Debug, clap::Parser)]
/// Show or modify scanner configuration
///
/// Configuration is stored in labscan.toml beside the dataset (or the file
/// named by --config) and controls the scanning session.
///
/// Available configuration keys:
///   `poll_interval`        Run recognition on every Nth frame (default: 10)
///   `persistence_seconds`  How long a match stays on screen (default: 3.0)
///   `min_digits`           Minimum digits in a CAS number (default: 5)
///   source               Frame source: frames:<dir> or transcript:<file>
///   tesseract            The tesseract executable (default: tesseract)
///   `fuzzy.enabled`        Match chemical names as a fallback (default: false)
///   `fuzzy.threshold`      Name similarity needed, 0-100 (default: 80)
///   `report_dir`           Where reports go (default: the dataset's folder)
pub struct Command {
    /// Use the labscan.toml beside this dataset
    #[arg(long, value_name = "CSV")]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show all configuration values
    Show,

    /// Get a specific configuration value
    Get {
        /// Configuration key to retrieve
        key: String,
    },

    /// Set a configuration value
    ///
    /// Examples:
    ///   labscan config set `poll_interval` 5
    ///   labscan config set source frames:captures
    ///   labscan config set `report_dir` none
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set (`none` clears optional keys)
        value: String,
    },
}

impl Command {
    #[instrument]
    pub fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        let config_path = super::config_path(config, self.dataset.as_deref());

        match self.command {
            ConfigCommand::Show => Self::show_config(&config_path),
            ConfigCommand::Get { key } => Self::get_config(&config_path, &key),
            ConfigCommand::Set { key, value } => Self::set_config(&config_path, &key, &value),
        }
    }

    fn show_config(config_path: &Path) -> anyhow::Result<()> {
        let config = load(config_path)?;

        if config_path.exists() {
            println!("Configuration ({}):", config_path.display());
        } else {
            println!("Configuration ({}):", "defaults".muted());
        }
        for key in KEYS {
            if let Some(value) = get(&config, key) {
                println!("  {key}: {value}");
            }
        }
        Ok(())
    }

    fn get_config(config_path: &Path, key: &str) -> anyhow::Result<()> {
        let config = load(config_path)?;
        match get(&config, key) {
            Some(value) => println!("{value}"),
            None => anyhow::bail!(
                "Unknown configuration key: '{key}'\n\nAvailable keys:\n  {}",
                KEYS.join("\n  ")
            ),
        }
        Ok(())
    }

    fn set_config(config_path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
        let mut config = load(config_path)?;
        set(&mut config, key, value)?;
        config
            .save(config_path)
            .with_context(|| format!("failed to save {}", config_path.display()))?;

        println!("{}", format!("{key} = {value}").matched());
        Ok(())
    }
}

fn load(config_path: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))
}

/// The displayed value of `key`, or `None` for an unknown key.
fn get(config: &Config, key: &str) -> Option<String> {
    let optional = |value: Option<String>| value.unwrap_or_else(|| "none".to_string());

    Some(match key {
        "poll_interval" => config.poll_interval().to_string(),
        "persistence_seconds" => config.persistence().as_secs_f64().to_string(),
        "min_digits" => config.min_digits().to_string(),
        "source" => optional(config.source.as_ref().map(ToString::to_string)),
        "tesseract" => config.tesseract.display().to_string(),
        "fuzzy.enabled" => config.fuzzy.enabled.to_string(),
        "fuzzy.threshold" => config.fuzzy.threshold.to_string(),
        "report_dir" => optional(
            config
                .report_dir
                .as_ref()
                .map(|dir| dir.display().to_string()),
        ),
        _ => return None,
    })
}

fn set(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    let clear = value.eq_ignore_ascii_case("none");

    match key {
        "poll_interval" => {
            let interval: NonZeroU32 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("poll_interval must be a positive integer"))?;
            config.set_poll_interval(interval);
        }
        "persistence_seconds" => {
            let seconds: f64 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("persistence_seconds must be a number"))?;
            config.set_persistence_seconds(seconds)?;
        }
        "min_digits" => {
            let digits: usize = value
                .parse()
                .map_err(|_| anyhow::anyhow!("min_digits must be an integer"))?;
            config.set_min_digits(digits)?;
        }
        "source" => {
            config.source = if clear {
                None
            } else {
                Some(value.parse::<SourceSelector>()?)
            };
        }
        "tesseract" => config.tesseract = PathBuf::from(value),
        "fuzzy.enabled" => {
            config.fuzzy.enabled = value
                .parse()
                .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))?;
        }
        "fuzzy.threshold" => {
            let threshold: u8 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("fuzzy.threshold must be between 0 and 100"))?;
            config.set_fuzzy_threshold(threshold)?;
        }
        "report_dir" => config.report_dir = (!clear).then(|| PathBuf::from(value)),
        _ => anyhow::bail!(
            "Unknown configuration key: '{key}'\n\nAvailable keys:\n  {}",
            KEYS.join("\n  ")
        ),
    }
    Ok(())
}
