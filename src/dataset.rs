use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    A,
    B,
    C,
}

impl FromStr for Rank {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Rank::A),
            "B" => Ok(Rank::B),
            "C" => Ok(Rank::C),
            other => Err(IdError::Rank(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("question id `{0}` is not of the form <subcategory>-<number>")]
    Shape(String),
    #[error("rank `{0}` is not one of A, B, C")]
    Rank(String),
}

/// `{subcategory}-{number}`; orders numerically so `1-2` sorts before `1-10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuestionId {
    pub subcategory: u32,
    pub number: u32,
}

impl QuestionId {
    pub fn new(subcategory: u32, number: u32) -> Self {
        QuestionId { subcategory, number }
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.subcategory, self.number)
    }
}

impl FromStr for QuestionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = || IdError::Shape(s.to_string());
        let (sub, num) = s.split_once('-').ok_or_else(shape)?;
        Ok(QuestionId {
            subcategory: sub.parse().map_err(|_| shape())?,
            number: num.parse().map_err(|_| shape())?,
        })
    }
}

impl Serialize for QuestionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub rank: Rank,
    pub question: String,
    pub answer: String,
}

/// One subject's questions as consumed by the study app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDataset {
    pub subject: String,
    pub version: String,
    pub last_updated: NaiveDate,
    pub subcategories: BTreeMap<u32, String>,
    pub questions: BTreeMap<QuestionId, QuestionRecord>,
}

impl SubjectDataset {
    pub fn new(subject: &str, last_updated: NaiveDate) -> Self {
        SubjectDataset {
            subject: subject.to_string(),
            version: FORMAT_VERSION.to_string(),
            last_updated,
            subcategories: BTreeMap::new(),
            questions: BTreeMap::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(path, &self.to_json()?)
    }
}

fn write_json(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    std::fs::write(path, body).with_context(|| format!("Failed to write {:?}", path))
}

/// Key of a merged JSON object. Dash-separated numbers (`1`, `1-10`) order
/// numerically and come first; any other key follows in text order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    textual: bool,
    numbers: Vec<u32>,
    raw: String,
}

impl EntryKey {
    pub fn new(raw: &str) -> Self {
        let numbers: Option<Vec<u32>> = raw.split('-').map(|part| part.parse().ok()).collect();
        EntryKey {
            textual: numbers.is_none(),
            numbers: numbers.unwrap_or_default(),
            raw: raw.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<&str> for EntryKey {
    fn from(raw: &str) -> Self {
        EntryKey::new(raw)
    }
}

impl Serialize for EntryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for EntryKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EntryKey::new(&raw))
    }
}

/// Merge input. Entries are kept as raw JSON so ids, ranks and extra fields
/// the converter never writes still pass through.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubcategoryFile {
    #[serde(default)]
    pub subcategories: BTreeMap<EntryKey, Value>,
    #[serde(default)]
    pub questions: BTreeMap<EntryKey, Value>,
}

impl SubcategoryFile {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {:?}", path))
    }
}

/// Union of a subject's subcategory files, same top-level shape as
/// [`SubjectDataset`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedDataset {
    pub subject: String,
    pub version: String,
    pub last_updated: NaiveDate,
    pub subcategories: BTreeMap<EntryKey, Value>,
    pub questions: BTreeMap<EntryKey, Value>,
}

impl MergedDataset {
    pub fn new(subject: &str, last_updated: NaiveDate) -> Self {
        MergedDataset {
            subject: subject.to_string(),
            version: FORMAT_VERSION.to_string(),
            last_updated,
            subcategories: BTreeMap::new(),
            questions: BTreeMap::new(),
        }
    }

    /// Fold another file's mappings in; its entries win on collision.
    pub fn absorb(&mut self, part: SubcategoryFile) {
        self.subcategories.extend(part.subcategories);
        self.questions.extend(part.questions);
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(path, &serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rank: Rank, q: &str, a: &str) -> QuestionRecord {
        QuestionRecord {
            rank,
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn question_id_round_trip_and_order() {
        let id: QuestionId = "3-12".parse().unwrap();
        assert_eq!(id, QuestionId::new(3, 12));
        assert_eq!(id.to_string(), "3-12");
        assert!(QuestionId::new(1, 2) < QuestionId::new(1, 10));
        assert!(QuestionId::new(1, 99) < QuestionId::new(2, 1));
    }

    #[test]
    fn question_id_rejects_bad_shapes() {
        assert!("12".parse::<QuestionId>().is_err());
        assert!("a-1".parse::<QuestionId>().is_err());
        assert!("1-".parse::<QuestionId>().is_err());
    }

    #[test]
    fn rank_parse() {
        assert_eq!("B".parse::<Rank>(), Ok(Rank::B));
        assert!("S".parse::<Rank>().is_err());
    }

    #[test]
    fn json_shape() {
        let mut ds = SubjectDataset::new("行政法", NaiveDate::from_ymd_opt(2025, 12, 6).unwrap());
        ds.subcategories.insert(1, "行政法総論".to_string());
        ds.questions
            .insert(QuestionId::new(1, 10), record(Rank::B, "問10", "答10"));
        ds.questions
            .insert(QuestionId::new(1, 2), record(Rank::A, "問2", "答2"));

        let json = ds.to_json().unwrap();
        let expected = r#"{
  "subject": "行政法",
  "version": "1.0",
  "lastUpdated": "2025-12-06",
  "subcategories": {
    "1": "行政法総論"
  },
  "questions": {
    "1-2": {
      "rank": "A",
      "question": "問2",
      "answer": "答2"
    },
    "1-10": {
      "rank": "B",
      "question": "問10",
      "answer": "答10"
    }
  }
}"#;
        assert_eq!(json, expected);

        let back: SubjectDataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn subcategory_file_tolerates_missing_sections() {
        let part: SubcategoryFile = serde_json::from_str(r#"{"subject": "民法"}"#).unwrap();
        assert!(part.subcategories.is_empty());
        assert!(part.questions.is_empty());
    }

    #[test]
    fn entry_keys_order_numbers_first() {
        let mut keys: Vec<EntryKey> = ["extra", "1-10", "2", "1-2", "1"]
            .into_iter()
            .map(EntryKey::from)
            .collect();
        keys.sort();
        let raw: Vec<&str> = keys.iter().map(EntryKey::as_str).collect();
        assert_eq!(raw, vec!["1", "1-2", "1-10", "2", "extra"]);
        assert_ne!(EntryKey::new("01"), EntryKey::new("1"));
    }

    #[test]
    fn absorb_later_wins() {
        let mut ds = MergedDataset::new("民法", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let first: SubcategoryFile = serde_json::from_str(
            r#"{"subcategories": {"1": "総則"}, "questions": {"1-1": {"rank": "A", "question": "old"}}}"#,
        )
        .unwrap();
        let second: SubcategoryFile = serde_json::from_str(
            r#"{"subcategories": {"2": "物権"}, "questions": {"1-1": {"question": "new", "note": "x"}}}"#,
        )
        .unwrap();

        ds.absorb(first);
        ds.absorb(second);
        assert_eq!(ds.subcategories.len(), 2);
        let q = &ds.questions[&EntryKey::new("1-1")];
        assert_eq!(q["question"], "new");
        assert_eq!(q["note"], "x");
        assert!(q.get("rank").is_none());
    }
}
