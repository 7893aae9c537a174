use serde::Serialize;

use super::Fields;

/// One beat of a case story: scene, narration, dialogue line or embedded figure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoryBeat {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub speaker: String,
    pub expression: String,
    pub dialogue: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub format: String,
}

impl StoryBeat {
    pub(super) fn parse(raw: &str) -> Self {
        let f = Fields::new(raw, "story");
        StoryBeat {
            kind: f.value("type"),
            text: f.value("text"),
            speaker: f.value("speaker"),
            expression: f.value("expression"),
            dialogue: f.value("dialogue"),
            title: f.value("title"),
            description: f.value("description"),
            content: f.value("content"),
            format: f.value("format"),
        }
    }
}
