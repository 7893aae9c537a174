use serde::Serialize;
use tracing::warn;

use super::Fields;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub title: String,
    pub rank: String,
    pub background: String,
    pub sub_problems: Vec<SubProblem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubProblem {
    pub title: String,
    pub rank: String,
    #[serde(rename = "relatedQAs")]
    pub related_qas: Vec<u32>,
    pub problem: String,
    pub hint: String,
    pub model_answer: String,
    pub points: Vec<String>,
}

impl Quiz {
    pub(super) fn parse(raw: &str) -> Self {
        let f = Fields::new(raw, "quiz");
        Quiz {
            title: f.value("title"),
            rank: f.value("rank"),
            background: f.value("background"),
            sub_problems: f.records("subProblems", SubProblem::parse),
        }
    }
}

impl SubProblem {
    fn parse(raw: &str) -> Self {
        let f = Fields::new(raw, "subProblems");
        SubProblem {
            title: f.value("title"),
            rank: f.value("rank"),
            related_qas: parse_ids(f.array("relatedQAs")),
            problem: f.value("problem"),
            hint: f.value("hint"),
            model_answer: f.value("modelAnswer"),
            points: f.list("points"),
        }
    }
}

fn parse_ids(block: &str) -> Vec<u32> {
    block
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(item = s, "relatedQAs entry is not a number, skipped");
                None
            }
        })
        .collect()
}
