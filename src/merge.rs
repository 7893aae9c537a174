use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use tracing::{info, warn};

use crate::dataset::{MergedDataset, SubcategoryFile};

/// A `<subject>_<n>.json` file found in the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartFile {
    pub subject: String,
    pub subcategory: u32,
    pub path: PathBuf,
}

fn part_of(path: &Path) -> Option<PartFile> {
    if path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (subject, id) = stem.rsplit_once('_')?;
    if subject.is_empty() || id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(PartFile {
        subject: subject.to_string(),
        subcategory: id.parse().ok()?,
        path: path.to_path_buf(),
    })
}

/// Per-subcategory files grouped by subject, each group in ascending
/// subcategory order.
pub fn discover(dir: &Path) -> Result<Vec<(String, Vec<PartFile>)>> {
    let parts = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| part_of(&path))
        .sorted_by(|a, b| {
            a.subject
                .cmp(&b.subject)
                .then(a.subcategory.cmp(&b.subcategory))
                .then_with(|| a.path.cmp(&b.path))
        });

    let mut groups = Vec::new();
    for (subject, group) in &parts.group_by(|p| p.subject.clone()) {
        groups.push((subject, group.collect()));
    }
    Ok(groups)
}

/// Union the parts in order; later parts win. Unreadable parts are skipped.
pub fn merge_parts(subject: &str, parts: &[PartFile], today: NaiveDate) -> MergedDataset {
    let mut merged = MergedDataset::new(subject, today);
    for part in parts {
        match SubcategoryFile::read(&part.path) {
            Ok(file) => merged.absorb(file),
            Err(e) => {
                println!("Skipping {}: {:#}", part.path.display(), e);
                warn!(file = %part.path.display(), error = %e, "unreadable part, skipped");
            }
        }
    }
    merged
}

/// Write `<dir>/<subject>.json` for every subject that has parts.
pub fn merge_dir(dir: &Path, today: NaiveDate) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (subject, parts) in discover(dir)? {
        let merged = merge_parts(&subject, &parts, today);
        let path = dir.join(format!("{subject}.json"));
        merged.write(&path)?;
        info!(subject = %subject, parts = parts.len(), questions = merged.questions.len(), "merged");
        println!(
            "{}: {} files, {} questions -> {}",
            subject,
            parts.len(),
            merged.questions.len(),
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}
