pub mod quiz;
pub mod report;
pub mod story;

use serde::Serialize;
use tracing::warn;

use crate::parser::literal::{
    extract_array, extract_template, extract_value, split_list, Extracted, ObjectChunks,
};
use quiz::Quiz;
use story::StoryBeat;

/// Fields recovered from a hand-written case module (`export default { … }`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseModule {
    pub title: String,
    pub citation: String,
    pub rank: String,
    pub tags: Vec<String>,
    pub right_side_characters: Vec<String>,
    pub questions_and_answers: Vec<QaEntry>,
    pub story: Vec<StoryBeat>,
    pub explanation: String,
    pub quiz: Vec<Quiz>,
    pub study_records: Vec<StudyRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QaEntry {
    pub id: String,
    pub rank: String,
    pub question: String,
    pub answer: String,
    pub status: String,
    pub check: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudyRecord {
    pub date: String,
    pub timestamp: String,
}

impl CaseModule {
    /// Best-effort extraction; anything missing or unreadable comes back empty.
    pub fn parse(source: &str) -> Self {
        let fields = Fields::new(source, "module");
        CaseModule {
            title: fields.value("title"),
            citation: fields.value("citation"),
            rank: fields.value("rank"),
            tags: fields.list("tags"),
            right_side_characters: fields.list("rightSideCharacters"),
            questions_and_answers: fields.records("questionsAndAnswers", QaEntry::parse),
            story: fields.records("story", StoryBeat::parse),
            explanation: fields.template("explanation"),
            quiz: fields.records("quiz", Quiz::parse),
            study_records: fields.records("studyRecords", StudyRecord::parse),
        }
    }
}

impl QaEntry {
    fn parse(raw: &str) -> Self {
        let f = Fields::new(raw, "questionsAndAnswers");
        QaEntry {
            id: f.value("id"),
            rank: f.value("rank"),
            question: f.value("question"),
            answer: f.value("answer"),
            status: f.value("status"),
            check: f.value("check"),
        }
    }
}

impl StudyRecord {
    fn parse(raw: &str) -> Self {
        let f = Fields::new(raw, "studyRecords");
        StudyRecord {
            date: f.value("date"),
            timestamp: f.value("timestamp"),
        }
    }
}

/// Field reader over one literal chunk. Malformed fields are logged and then
/// read as empty, same as absent ones.
pub(crate) struct Fields<'a> {
    raw: &'a str,
    context: &'static str,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(raw: &'a str, context: &'static str) -> Self {
        Fields { raw, context }
    }

    fn settle<T: Default>(&self, field: &str, extracted: Extracted<T>) -> T {
        match extracted {
            Extracted::Found(v) => v,
            Extracted::Absent => T::default(),
            Extracted::Malformed(reason) => {
                warn!(context = self.context, field, %reason, "malformed field read as empty");
                T::default()
            }
        }
    }

    pub(crate) fn value(&self, field: &str) -> String {
        self.settle(field, extract_value(self.raw, field))
    }

    pub(crate) fn template(&self, field: &str) -> String {
        self.settle(field, extract_template(self.raw, field))
    }

    pub(crate) fn array(&self, field: &str) -> &'a str {
        self.settle(field, extract_array(self.raw, field))
    }

    pub(crate) fn list(&self, field: &str) -> Vec<String> {
        split_list(self.array(field))
    }

    /// One `T` per top-level `{…}` in the `field` array.
    pub(crate) fn records<T>(&self, field: &str, parse: impl Fn(&str) -> T) -> Vec<T> {
        ObjectChunks::new(self.array(field)).map(parse).collect()
    }
}
