mod case_module;
mod config;
mod convert;
mod dataset;
mod encoding;
mod js_to_txt;
mod merge;
mod parser;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::config::{Overrides, Settings};
use crate::parser::highlight::Highlighter;

#[derive(Parser)]
#[command(name = "study_convert", about = "Build study-app JSON and text sheets from Q&A sources")]
struct Cli {
    /// Config file (default: ./study_convert.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every subject's Q&A text files into per-subcategory JSON
    Convert {
        /// Root holding one folder per subject
        #[arg(long)]
        source: Option<PathBuf>,
        /// Where `<subject>_<n>.json` files go
        #[arg(long)]
        output: Option<PathBuf>,
        /// Only these subjects (repeatable)
        #[arg(long = "subject")]
        subjects: Vec<String>,
        /// Wrap key terms in answers with {{…}}
        #[arg(long)]
        highlight: bool,
    },
    /// Convert listed text files into one subject JSON file
    ConvertFiles {
        #[arg(long)]
        subject: String,
        /// Output JSON path
        #[arg(long)]
        out: PathBuf,
        /// Wrap key terms in answers with {{…}}
        #[arg(long)]
        highlight: bool,
        /// Inputs as SUBCATEGORY=PATH
        #[arg(required = true, value_parser = convert::parse_file_arg)]
        files: Vec<(u32, PathBuf)>,
    },
    /// Merge `<subject>_<n>.json` files into `<subject>.json`
    Merge {
        /// Directory to merge (default: configured output dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Turn case-module .js files into plain-text study sheets
    JsToTxt {
        /// Files to convert; prompts on stdin when none are given
        files: Vec<PathBuf>,
        /// Also write the extracted fields as JSON
        #[arg(long)]
        json: bool,
    },
    /// Try every known encoding on a file
    ProbeEncoding { file: PathBuf },
}

fn highlighter(settings: &Settings) -> anyhow::Result<Option<Highlighter>> {
    if !settings.highlight.enabled {
        return Ok(None);
    }
    let h = Highlighter::with_defaults(settings.highlight.max_marks)?;
    tracing::info!(rules = ?h.rule_names().collect::<Vec<_>>(), max = settings.highlight.max_marks, "highlighting enabled");
    Ok(Some(h))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let today = Local::now().date_naive();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Convert {
            source,
            output,
            subjects,
            highlight,
        } => {
            let overrides = Overrides {
                source_root: source,
                output_dir: output,
                highlight,
            };
            let settings = config::load(config_path, &overrides)?;
            let h = highlighter(&settings)?;
            println!(
                "Converting {} -> {}",
                settings.source_root.display(),
                settings.output_dir.display()
            );
            let counts = convert::convert_all(&settings, &subjects, h.as_ref(), today)?;
            counts.print();
            Ok(())
        }
        Commands::ConvertFiles {
            subject,
            out,
            highlight,
            files,
        } => {
            let overrides = Overrides {
                highlight,
                ..Overrides::default()
            };
            let settings = config::load(config_path, &overrides)?;
            let h = highlighter(&settings)?;
            convert::convert_files(&settings, &subject, &files, &out, h.as_ref(), today)?;
            Ok(())
        }
        Commands::Merge { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => config::load(config_path, &Overrides::default())?.output_dir,
            };
            let written = merge::merge_dir(&dir, today)?;
            if written.is_empty() {
                println!("No <subject>_<n>.json files in {}.", dir.display());
            }
            Ok(())
        }
        Commands::JsToTxt { files, json } => {
            if files.is_empty() {
                let stdin = std::io::stdin();
                let ok = js_to_txt::interactive(stdin.lock(), std::io::stdout(), json)?;
                println!("{} files converted.", ok);
            } else {
                let ok = js_to_txt::process_files(&files, json);
                println!("{}/{} files converted.", ok, files.len());
            }
            Ok(())
        }
        Commands::ProbeEncoding { file } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
            println!("{} ({} bytes)", file.display(), bytes.len());
            for result in encoding::probe(&bytes) {
                match result.preview(50) {
                    Some(preview) => println!(
                        "  {:<10} ok    {}",
                        result.candidate.label(),
                        preview.replace('\n', "⏎")
                    ),
                    None => println!("  {:<10} failed", result.candidate.label()),
                }
            }
            let (_, detected) = encoding::decode(&bytes);
            println!("Reader would use: {}", detected);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
