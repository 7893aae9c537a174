use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::{Settings, SubjectSettings};
use crate::dataset::{QuestionId, QuestionRecord, SubjectDataset};
use crate::encoding;
use crate::parser::highlight::Highlighter;
use crate::parser::qa_text::{parse_qa_text, subcategory_from_filename};

#[derive(Debug, Default)]
pub struct ConvertCounts {
    pub files: usize,
    pub questions: usize,
    pub written: Vec<PathBuf>,
}

impl ConvertCounts {
    pub fn print(&self) {
        println!(
            "Converted {} files, {} questions into {} JSON files.",
            self.files,
            self.questions,
            self.written.len()
        );
    }
}

/// Questions of one text file, with the optional highlight stage applied.
fn read_questions(
    path: &Path,
    subcategory: u32,
    highlighter: Option<&Highlighter>,
) -> Result<Vec<(QuestionId, QuestionRecord)>> {
    let (text, detected) = encoding::read_text(path)?;
    debug!(file = %path.display(), encoding = %detected, "decoded");

    Ok(parse_qa_text(&text)
        .into_iter()
        .map(|q| {
            let answer = match highlighter {
                Some(h) => h.apply(&q.answer),
                None => q.answer,
            };
            (
                QuestionId::new(subcategory, q.number),
                QuestionRecord {
                    rank: q.rank,
                    question: q.question,
                    answer,
                },
            )
        })
        .collect())
}

/// `.txt` files of a folder in name order.
fn text_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to list {:?}", folder))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

fn progress_bar(len: usize, subject: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(subject.to_string());
    pb
}

/// Build one dataset per subcategory found in `<source_root>/<name>/<folder>`.
/// A missing folder yields no datasets.
pub fn build_subject(
    source_root: &Path,
    subject: &SubjectSettings,
    folder: &str,
    highlighter: Option<&Highlighter>,
    today: NaiveDate,
) -> Result<(Vec<SubjectDataset>, usize)> {
    let folder = source_root.join(&subject.name).join(folder);
    if !folder.is_dir() {
        println!("Folder not found: {}", folder.display());
        warn!(subject = %subject.name, folder = %folder.display(), "subject folder missing, skipped");
        return Ok((Vec::new(), 0));
    }

    let files = text_files(&folder)?;
    let pb = progress_bar(files.len(), &subject.name);
    let mut by_subcategory: BTreeMap<u32, BTreeMap<QuestionId, QuestionRecord>> = BTreeMap::new();
    let mut used = 0;

    for path in &files {
        pb.inc(1);
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let Some(subcategory) = subcategory_from_filename(&name) else {
            debug!(file = %name, "no subcategory number, skipped");
            continue;
        };
        let questions = read_questions(path, subcategory, highlighter)?;
        info!(file = %name, subcategory, questions = questions.len(), "parsed");
        by_subcategory.entry(subcategory).or_default().extend(questions);
        used += 1;
    }
    pb.finish_and_clear();

    let datasets = by_subcategory
        .into_iter()
        .filter(|(_, questions)| !questions.is_empty())
        .map(|(id, questions)| {
            let mut dataset = SubjectDataset::new(&subject.name, today);
            dataset.subcategories.insert(id, subject.subcategory_name(id));
            dataset.questions = questions;
            dataset
        })
        .collect();
    Ok((datasets, used))
}

pub fn subcategory_file_name(subject: &str, id: u32) -> String {
    format!("{subject}_{id}.json")
}

/// Convert every configured subject, or only those named in `only`.
pub fn convert_all(
    settings: &Settings,
    only: &[String],
    highlighter: Option<&Highlighter>,
    today: NaiveDate,
) -> Result<ConvertCounts> {
    let mut counts = ConvertCounts::default();

    for name in only {
        if settings.subject(name).is_none() {
            println!("Unknown subject: {name}");
            warn!(subject = %name, "not configured, skipped");
        }
    }

    for subject in settings
        .subjects
        .iter()
        .filter(|s| only.is_empty() || only.contains(&s.name))
    {
        let Some(folder) = subject.folder.as_deref() else {
            if !only.is_empty() {
                println!("{}: no Q&A folder configured", subject.name);
            }
            debug!(subject = %subject.name, "no folder, not walked");
            continue;
        };
        let (datasets, files) =
            build_subject(&settings.source_root, subject, folder, highlighter, today)?;
        counts.files += files;
        for dataset in datasets {
            let Some(&id) = dataset.subcategories.keys().next() else {
                continue;
            };
            let path = settings.output_dir.join(subcategory_file_name(&subject.name, id));
            dataset.write(&path)?;
            println!("{}: {} questions -> {}", subject.name, dataset.questions.len(), path.display());
            counts.questions += dataset.questions.len();
            counts.written.push(path);
        }
    }

    Ok(counts)
}

/// Parse a `ID=PATH` command-line pair.
pub fn parse_file_arg(raw: &str) -> Result<(u32, PathBuf), String> {
    let (id, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=PATH, got `{raw}`"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("subcategory id `{id}` is not a number"))?;
    Ok((id, PathBuf::from(path)))
}

/// Convert explicitly listed files into a single subject dataset.
pub fn convert_files(
    settings: &Settings,
    subject: &str,
    files: &[(u32, PathBuf)],
    out: &Path,
    highlighter: Option<&Highlighter>,
    today: NaiveDate,
) -> Result<SubjectDataset> {
    let mut dataset = SubjectDataset::new(subject, today);

    for (id, path) in files {
        dataset
            .subcategories
            .insert(*id, settings.subcategory_name(subject, *id));
        if !path.is_file() {
            println!("File not found: {}", path.display());
            warn!(file = %path.display(), "input missing, skipped");
            continue;
        }
        let questions = read_questions(path, *id, highlighter)?;
        println!("{}: {} questions", path.display(), questions.len());
        dataset.questions.extend(questions);
    }

    dataset.write(out)?;
    println!("{} questions -> {}", dataset.questions.len(), out.display());
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HighlightSettings;
    use crate::dataset::Rank;

    fn settings(root: &Path, out: &Path) -> Settings {
        Settings {
            source_root: root.to_path_buf(),
            output_dir: out.to_path_buf(),
            subjects: vec![SubjectSettings {
                name: "刑事訴訟法".into(),
                folder: Some("一問一答刑事訴訟法".into()),
                subcategories: [("1".to_string(), "捜査".to_string())].into_iter().collect(),
            }],
            highlight: HighlightSettings::default(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()
    }

    fn seed(root: &Path) -> PathBuf {
        let folder = root.join("刑事訴訟法").join("一問一答刑事訴訟法");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::copy("tests/fixtures/1.捜査.txt", folder.join("1.捜査.txt")).unwrap();
        std::fs::write(folder.join("2.公訴.txt"), "1. B　公訴権の主体は？\n検察官\n").unwrap();
        std::fs::write(folder.join("3.空.txt"), "見出しのない文章\n").unwrap();
        std::fs::write(folder.join("メモ.txt"), "1. A　無視される\n").unwrap();
        folder
    }

    #[test]
    fn writes_one_file_per_subcategory() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        seed(root.path());

        let counts = convert_all(&settings(root.path(), out.path()), &[], None, day()).unwrap();
        assert_eq!(counts.files, 3);
        assert_eq!(counts.questions, 5);
        assert_eq!(counts.written.len(), 2);

        let first = std::fs::read_to_string(out.path().join("刑事訴訟法_1.json")).unwrap();
        let first: SubjectDataset = serde_json::from_str(&first).unwrap();
        assert_eq!(first.subcategories[&1], "捜査");
        assert_eq!(first.questions.len(), 4);
        assert_eq!(first.last_updated, day());

        let second = std::fs::read_to_string(out.path().join("刑事訴訟法_2.json")).unwrap();
        let second: SubjectDataset = serde_json::from_str(&second).unwrap();
        assert_eq!(second.subcategories[&2], "カテゴリ2");
        let q = &second.questions[&QuestionId::new(2, 1)];
        assert_eq!(q.rank, Rank::B);
        assert_eq!(q.answer, "検察官");

        assert!(!out.path().join("刑事訴訟法_3.json").exists());
    }

    #[test]
    fn missing_folder_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let counts = convert_all(&settings(root.path(), out.path()), &[], None, day()).unwrap();
        assert_eq!(counts.files, 0);
        assert!(counts.written.is_empty());
    }

    #[test]
    fn subject_filter() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        seed(root.path());
        let counts = convert_all(
            &settings(root.path(), out.path()),
            &["民法".to_string()],
            None,
            day(),
        )
        .unwrap();
        assert!(counts.written.is_empty());
    }

    #[test]
    fn subject_without_folder_is_not_walked() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folder = root.path().join("憲法").join("一問一答憲法");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("1.人権.txt"), "1. A　問\n答\n").unwrap();

        let mut s = settings(root.path(), out.path());
        s.subjects.push(SubjectSettings {
            name: "憲法".into(),
            folder: None,
            subcategories: [("1".to_string(), "人権総論".to_string())].into_iter().collect(),
        });
        let counts = convert_all(&s, &[], None, day()).unwrap();
        assert!(counts.written.is_empty());

        let out_file = out.path().join("憲法.json");
        let files = vec![(1, folder.join("1.人権.txt"))];
        let ds = convert_files(&s, "憲法", &files, &out_file, None, day()).unwrap();
        assert_eq!(ds.subcategories[&1], "人権総論");
    }

    #[test]
    fn rerun_is_byte_identical() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        seed(root.path());
        let s = settings(root.path(), out.path());
        let path = out.path().join("刑事訴訟法_1.json");

        convert_all(&s, &[], None, day()).unwrap();
        let once = std::fs::read(&path).unwrap();
        convert_all(&s, &[], None, day()).unwrap();
        assert_eq!(once, std::fs::read(&path).unwrap());
    }

    #[test]
    fn highlight_stage_applies_to_answers() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let folder = root.path().join("刑事訴訟法").join("一問一答刑事訴訟法");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("1.捜査.txt"), "1. A　原則は？\n令状主義が妥当する。\n").unwrap();

        let h = Highlighter::with_defaults(5).unwrap();
        convert_all(&settings(root.path(), out.path()), &[], Some(&h), day()).unwrap();
        let raw = std::fs::read_to_string(out.path().join("刑事訴訟法_1.json")).unwrap();
        let ds: SubjectDataset = serde_json::from_str(&raw).unwrap();
        assert_eq!(ds.questions[&QuestionId::new(1, 1)].answer, "{{令状主義}}が妥当する。");
    }

    #[test]
    fn explicit_files_with_missing_one() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("刑事訴訟法.json");
        let s = settings(dir.path(), dir.path());
        let files = vec![
            (1, PathBuf::from("tests/fixtures/1.捜査.txt")),
            (4, dir.path().join("4.証拠.txt")),
        ];
        let ds = convert_files(&s, "刑事訴訟法", &files, &out, None, day()).unwrap();
        assert_eq!(ds.questions.len(), 4);
        assert_eq!(ds.subcategories[&4], "カテゴリ4");
        assert!(out.is_file());
    }

    #[test]
    fn file_arg_parsing() {
        assert_eq!(
            parse_file_arg("2=source/2.公訴.txt").unwrap(),
            (2, PathBuf::from("source/2.公訴.txt"))
        );
        assert!(parse_file_arg("source/2.txt").is_err());
        assert!(parse_file_arg("x=a.txt").is_err());
    }
}
