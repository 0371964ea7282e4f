use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::parser::SourceDocument;
use crate::record::CrashRecord;

const INPUT_EXT: &str = "txt";

/// Expand the command-line inputs: files are taken as given, directories
/// contribute their `.txt` dumps in name order.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Failed to list {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == INPUT_EXT))
                .collect();
            found.sort();
            out.extend(found);
        } else if path.is_file() {
            out.push(path.clone());
        } else {
            bail!("No such input: {}", path.display());
        }
    }
    Ok(out)
}

pub fn read_document(path: &Path) -> Result<SourceDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(SourceDocument::from_text(path.display().to_string(), &text))
}

/// `<dir>/<stem>.json` for a source file.
pub fn output_path(dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "record".to_string());
    dir.join(format!("{}.json", stem))
}

/// Write a record as pretty JSON, replacing any earlier output of the same name.
pub fn write_record(dir: &Path, source: &Path, record: &CrashRecord) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
    let path = output_path(dir, source);
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
