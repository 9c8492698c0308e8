//! Interactive dataset selection.

use std::path::{Path, PathBuf};

use anyhow::Context;
use dialoguer::{Select, theme::ColorfulTheme};
use walkdir::WalkDir;

/// The folder searched before the working directory.
const DATA_DIR: &str = "data";

/// Asks the operator to pick a CSV dataset.
pub fn dataset() -> anyhow::Result<PathBuf> {
    let dir = Path::new(DATA_DIR);
    let dir = if dir.is_dir() { dir } else { Path::new(".") };

    let candidates = csv_files(dir);
    if candidates.is_empty() {
        anyhow::bail!(
            "no CSV datasets found in {}; pass the dataset path explicitly",
            dir.display()
        );
    }

    let names: Vec<String> = candidates
        .iter()
        .map(|path| path.strip_prefix(dir).unwrap_or(path).display().to_string())
        .collect();

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select an inventory dataset")
        .items(&names)
        .default(0)
        .interact_opt()
        .context("failed to read selection")?;

    choice
        .map(|i| candidates[i].clone())
        .context("no dataset selected")
}

/// The `.csv` files directly inside `dir`, sorted by name.
fn csv_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect()
}
