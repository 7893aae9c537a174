use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::case_module::{report, CaseModule};
use crate::encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub txt: PathBuf,
    pub json: Option<PathBuf>,
}

/// Convert one case module into `<stem>.txt` (and `<stem>.json`) beside it.
pub fn process_file(path: &Path, with_json: bool) -> Result<Written> {
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    let (source, detected) = encoding::read_text(path)?;
    debug!(file = %path.display(), encoding = %detected, "decoded");

    let module = CaseModule::parse(&source);
    let txt = path.with_extension("txt");
    std::fs::write(&txt, report::render(&module))
        .with_context(|| format!("Failed to write {:?}", txt))?;

    let json = if with_json {
        let out = path.with_extension("json");
        let body = serde_json::to_string_pretty(&module)?;
        std::fs::write(&out, body).with_context(|| format!("Failed to write {:?}", out))?;
        Some(out)
    } else {
        None
    };

    Ok(Written { txt, json })
}

/// Process each file, reporting failures without stopping. Returns how many
/// succeeded.
pub fn process_files(paths: &[PathBuf], with_json: bool) -> usize {
    let mut ok = 0;
    for path in paths {
        if !is_js(path) {
            println!("Not a .js file: {}", path.display());
            continue;
        }
        match process_file(path, with_json) {
            Ok(written) => {
                println!("Converted {} -> {}", path.display(), written.txt.display());
                if let Some(json) = written.json {
                    println!("  JSON -> {}", json.display());
                }
                ok += 1;
            }
            Err(e) => {
                println!("Failed {}: {:#}", path.display(), e);
                warn!(file = %path.display(), error = %e, "conversion failed");
            }
        }
    }
    ok
}

fn is_js(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("js"))
}

/// A dropped or typed path with surrounding whitespace and quotes removed.
fn clean_path(line: &str) -> Option<PathBuf> {
    let trimmed = line.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|&q| trimmed.strip_prefix(q).and_then(|s| s.strip_suffix(q)))
        .unwrap_or(trimmed)
        .trim();
    (!unquoted.is_empty()).then(|| PathBuf::from(unquoted))
}

/// Prompt for paths until an empty line or end of input.
pub fn interactive(input: impl BufRead, mut output: impl Write, with_json: bool) -> Result<usize> {
    let mut ok = 0;
    let mut lines = input.lines();
    loop {
        write!(output, "Drop a .js file (empty line to quit): ")?;
        output.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let Some(path) = clean_path(&line?) else {
            break;
        };
        ok += process_files(&[path], with_json);
    }
    writeln!(output)?;
    Ok(ok)
}
