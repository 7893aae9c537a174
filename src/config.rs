use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::parser::highlight::DEFAULT_MAX_MARKS;

pub const DEFAULT_CONFIG_NAME: &str = "study_convert";
pub const ENV_PREFIX: &str = "STUDY";

/// Subject name, its Q&A folder under the source root, and subcategory names.
/// A subject without a folder only lends its names to `convert-files`.
const DEFAULT_SUBJECTS: &[(&str, Option<&str>, &[(&str, &str)])] = &[
    (
        "刑事訴訟法",
        Some("一問一答刑事訴訟法"),
        &[("1", "捜査"), ("2", "公訴"), ("3", "公判"), ("4", "証拠")],
    ),
    (
        "民法",
        Some("一問一答民法"),
        &[
            ("1", "総則"),
            ("2", "物権"),
            ("3", "債権総論"),
            ("4", "債権各論"),
            ("5", "親族・相続"),
        ],
    ),
    ("刑法", Some("一問一答刑法"), &[("1", "総論"), ("2", "各論")]),
    (
        "民事訴訟法",
        Some("一問一答民事訴訟法"),
        &[("1", "総論・訴訟の主体"), ("2", "審理と判決"), ("3", "複雑訴訟・上訴")],
    ),
    (
        "商法",
        Some("一問一答商法"),
        &[
            ("1", "総則・商行為"),
            ("2", "会社法総論・株式"),
            ("3", "機関"),
            ("4", "資金調達・組織再編"),
            ("5", "設立・その他"),
        ],
    ),
    ("行政法", Some("一問一答行政法"), &[("1", "行政法総論"), ("2", "行政救済法")]),
    (
        "憲法",
        None,
        &[("1", "人権総論"), ("2", "精神的自由権"), ("3", "経済的自由権・社会権"), ("4", "統治")],
    ),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_subjects")]
    pub subjects: Vec<SubjectSettings>,
    #[serde(default)]
    pub highlight: HighlightSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectSettings {
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub subcategories: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HighlightSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_marks")]
    pub max_marks: usize,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        HighlightSettings {
            enabled: false,
            max_marks: DEFAULT_MAX_MARKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("subject `{0}` is configured more than once")]
    DuplicateSubject(String),
    #[error("subject `{subject}` has subcategory id `{id}`, expected a number")]
    SubcategoryId { subject: String, id: String },
}

fn default_source_root() -> PathBuf {
    PathBuf::from("source")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/data/qa")
}

fn default_max_marks() -> usize {
    DEFAULT_MAX_MARKS
}

fn default_subjects() -> Vec<SubjectSettings> {
    DEFAULT_SUBJECTS
        .iter()
        .map(|(name, folder, subs)| SubjectSettings {
            name: name.to_string(),
            folder: folder.map(str::to_string),
            subcategories: subs
                .iter()
                .map(|(id, label)| (id.to_string(), label.to_string()))
                .collect(),
        })
        .collect()
}

impl SubjectSettings {
    /// Display name of a subcategory, `カテゴリ{n}` when none is configured.
    pub fn subcategory_name(&self, id: u32) -> String {
        self.subcategories
            .get(&id.to_string())
            .cloned()
            .unwrap_or_else(|| format!("カテゴリ{id}"))
    }
}

impl Settings {
    pub fn subject(&self, name: &str) -> Option<&SubjectSettings> {
        self.subjects.iter().find(|s| s.name == name)
    }

    /// Subcategory name for a subject that may not be configured at all.
    pub fn subcategory_name(&self, subject: &str, id: u32) -> String {
        match self.subject(subject) {
            Some(s) => s.subcategory_name(id),
            None => format!("カテゴリ{id}"),
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let mut seen = HashSet::new();
        for subject in &self.subjects {
            if !seen.insert(subject.name.as_str()) {
                return Err(SettingsError::DuplicateSubject(subject.name.clone()));
            }
            if let Some(bad) = subject.subcategories.keys().find(|k| k.parse::<u32>().is_err()) {
                return Err(SettingsError::SubcategoryId {
                    subject: subject.name.clone(),
                    id: bad.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Values given on the command line; they beat every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source_root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub highlight: bool,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Defaults, then `study_convert.toml` (or `config_path`), then `STUDY_*`
/// variables, then command-line overrides.
pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    load_with(config_path, overrides, environment())
}

fn load_with(config_path: Option<&Path>, overrides: &Overrides, env: Environment) -> Result<Settings> {
    let mut builder = Config::builder();
    builder = match config_path {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
    };
    builder = builder.add_source(env);

    if let Some(dir) = &overrides.source_root {
        builder = builder.set_override("source_root", dir.to_string_lossy().into_owned())?;
    }
    if let Some(dir) = &overrides.output_dir {
        builder = builder.set_override("output_dir", dir.to_string_lossy().into_owned())?;
    }
    if overrides.highlight {
        builder = builder.set_override("highlight.enabled", true)?;
    }

    let settings: Settings = builder
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_env(vars: &[(&str, &str)]) -> Environment {
        environment().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    fn write_toml(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study_convert.toml");
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults() {
        let (_dir, path) = write_toml("");
        let s = load_with(Some(&path), &Overrides::default(), quiet_env(&[])).unwrap();
        assert_eq!(s.source_root, PathBuf::from("source"));
        assert_eq!(s.output_dir, PathBuf::from("public/data/qa"));
        assert_eq!(s.subjects.len(), 7);
        assert_eq!(s.subjects.iter().filter(|s| s.folder.is_some()).count(), 6);
        assert!(!s.highlight.enabled);
        assert_eq!(s.highlight.max_marks, 5);
        assert_eq!(s.subcategory_name("民法", 5), "親族・相続");
        assert_eq!(s.subcategory_name("民法", 9), "カテゴリ9");
        assert_eq!(s.subcategory_name("憲法", 4), "統治");
        assert_eq!(s.subcategory_name("会社法", 1), "カテゴリ1");
    }

    #[test]
    fn file_then_env_then_overrides() {
        let (_dir, path) = write_toml(
            r#"
source_root = "/data/予備試験"
output_dir = "/from/file"

[highlight]
max_marks = 3

[[subjects]]
name = "憲法"
folder = "一問一答憲法"
subcategories = { "1" = "人権総論", "4" = "統治" }
"#,
        );
        let env = quiet_env(&[("STUDY_OUTPUT_DIR", "/from/env")]);
        let overrides = Overrides {
            highlight: true,
            ..Overrides::default()
        };
        let s = load_with(Some(&path), &overrides, env).unwrap();
        assert_eq!(s.source_root, PathBuf::from("/data/予備試験"));
        assert_eq!(s.output_dir, PathBuf::from("/from/env"));
        assert!(s.highlight.enabled);
        assert_eq!(s.highlight.max_marks, 3);
        assert_eq!(s.subjects.len(), 1);
        assert_eq!(s.subject("憲法").unwrap().subcategory_name(4), "統治");

        let overrides = Overrides {
            output_dir: Some(PathBuf::from("/from/cli")),
            ..Overrides::default()
        };
        let env = quiet_env(&[("STUDY_OUTPUT_DIR", "/from/env")]);
        let s = load_with(Some(&path), &overrides, env).unwrap();
        assert_eq!(s.output_dir, PathBuf::from("/from/cli"));
    }

    #[test]
    fn duplicate_subject_rejected() {
        let (_dir, path) = write_toml(
            r#"
[[subjects]]
name = "刑法"
folder = "a"

[[subjects]]
name = "刑法"
folder = "b"
"#,
        );
        let err = load_with(Some(&path), &Overrides::default(), quiet_env(&[])).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SettingsError>(),
            Some(&SettingsError::DuplicateSubject("刑法".into()))
        );
    }

    #[test]
    fn non_numeric_subcategory_rejected() {
        let (_dir, path) = write_toml(
            r#"
[[subjects]]
name = "刑法"
folder = "a"
subcategories = { "総論" = "総論" }
"#,
        );
        let err = load_with(Some(&path), &Overrides::default(), quiet_env(&[])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SettingsError>(),
            Some(SettingsError::SubcategoryId { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_with(Some(&missing), &Overrides::default(), quiet_env(&[])).is_err());
    }
}
