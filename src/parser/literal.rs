use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use regex::Regex;
use thiserror::Error;

use super::delimiter::find_matching_delimiter;

/// Why a field that is present in the source could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("`{field}:` is not followed by `{open}`")]
    MissingOpen { field: String, open: char },
    #[error("`{open}` at byte {at} is never closed")]
    Unbalanced { open: char, at: usize },
    #[error("`{field}:` has no recognizable value")]
    NoValue { field: String },
}

/// Outcome of pulling one field out of a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<T> {
    Found(T),
    Absent,
    Malformed(Malformed),
}

impl<T> Extracted<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Extracted::Found(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Default> Extracted<T> {
    /// Collapse to the value, treating absent and malformed alike.
    pub fn or_empty(self) -> T {
        self.found().unwrap_or_default()
    }
}

/// Compiled patterns for one field name.
struct FieldPatterns {
    colon: Regex,
    /// Value shapes, most specific first. Backtick literals lead so prose
    /// containing quote characters is not cut short by the quoted ones.
    values: [(Regex, bool); 6],
    template: Regex,
}

impl FieldPatterns {
    fn new(field: &str) -> Self {
        let key = regex::escape(field);
        let build = |p: String| Regex::new(&p).expect("escaped field pattern");
        FieldPatterns {
            colon: build(format!(r"{key}\s*:")),
            values: [
                (build(format!(r#""{key}"\s*:\s*`([^`]*)`"#)), false),
                (build(format!(r#"{key}\s*:\s*`([^`]*)`"#)), false),
                (build(format!(r#""{key}"\s*:\s*["']([^"']*)["']"#)), false),
                (build(format!(r#"{key}\s*:\s*["']([^"']*)["']"#)), false),
                (build(format!(r#""{key}"\s*:\s*([^,}}\n]+)"#)), true),
                (build(format!(r#"{key}\s*:\s*([^,}}\n]+)"#)), true),
            ],
            template: build(format!(r"{key}\s*:\s*`([^`]*)`")),
        }
    }
}

static FIELD_PATTERNS: LazyLock<Mutex<HashMap<String, Arc<FieldPatterns>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Patterns for `field`, compiled on first use.
fn patterns(field: &str) -> Arc<FieldPatterns> {
    let mut cache = FIELD_PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(p) = cache.get(field) {
        return Arc::clone(p);
    }
    let p = Arc::new(FieldPatterns::new(field));
    cache.insert(field.to_string(), Arc::clone(&p));
    p
}

/// Raw text strictly between the delimiters that follow `field:`.
pub fn extract_block<'a>(content: &'a str, field: &str, open: char, close: char) -> Extracted<&'a str> {
    let Some(m) = patterns(field).colon.find(content) else {
        return Extracted::Absent;
    };
    let Some(rel) = content[m.end()..].find(open) else {
        return Extracted::Malformed(Malformed::MissingOpen {
            field: field.to_string(),
            open,
        });
    };
    let start = m.end() + rel;
    match find_matching_delimiter(content, start, open, close) {
        Some(end) => Extracted::Found(&content[start + open.len_utf8()..end]),
        None => Extracted::Malformed(Malformed::Unbalanced { open, at: start }),
    }
}

pub fn extract_array<'a>(content: &'a str, field: &str) -> Extracted<&'a str> {
    extract_block(content, field, '[', ']')
}

pub fn extract_object<'a>(content: &'a str, field: &str) -> Extracted<&'a str> {
    extract_block(content, field, '{', '}')
}

/// Value of `field:` as a string, with surrounding quotes removed.
pub fn extract_value(content: &str, field: &str) -> Extracted<String> {
    let patterns = patterns(field);
    for (re, unquoted) in &patterns.values {
        if let Some(caps) = re.captures(content) {
            let raw = &caps[1];
            let value = if *unquoted {
                raw.trim().trim_matches(|c: char| c == '\'' || c == '"')
            } else {
                raw
            };
            return Extracted::Found(value.to_string());
        }
    }

    if patterns.colon.is_match(content) {
        Extracted::Malformed(Malformed::NoValue {
            field: field.to_string(),
        })
    } else {
        Extracted::Absent
    }
}

/// Value of `field:` only when written as a backtick template literal.
pub fn extract_template(content: &str, field: &str) -> Extracted<String> {
    match patterns(field).template.captures(content) {
        Some(caps) => Extracted::Found(caps[1].to_string()),
        None => Extracted::Absent,
    }
}

/// Split a string-array block such as `'a', "b", c` into its items.
pub fn split_list(block: &str) -> Vec<String> {
    block
        .split(',')
        .map(|item| item.trim().trim_matches(|c: char| c == '\'' || c == '"'))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Top-level `{…}` chunks of an array block, in order, braces included.
///
/// Stops at the first `{` that has no balancing `}`.
pub struct ObjectChunks<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> ObjectChunks<'a> {
    pub fn new(text: &'a str) -> Self {
        ObjectChunks { text, pos: 0 }
    }
}

impl<'a> Iterator for ObjectChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.text.get(self.pos..)?;
        let start = match rest.find('{') {
            Some(rel) => self.pos + rel,
            None => {
                self.pos = self.text.len();
                return None;
            }
        };
        match find_matching_delimiter(self.text, start, '{', '}') {
            Some(end) => {
                self.pos = end + 1;
                Some(&self.text[start..=end])
            }
            None => {
                self.pos = self.text.len();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ignores_bracket_in_string() {
        let src = r#"tags: ["a]b", "c"], other: 1"#;
        assert_eq!(extract_array(src, "tags"), Extracted::Found(r#""a]b", "c""#));
    }

    #[test]
    fn block_nested_object() {
        let src = "meta: { a: { b: 1 }, c: [2] }, x: 3";
        assert_eq!(extract_object(src, "meta"), Extracted::Found(" a: { b: 1 }, c: [2] "));
    }

    #[test]
    fn block_absent() {
        assert_eq!(extract_array("title: 'x'", "tags"), Extracted::Absent);
    }

    #[test]
    fn block_unbalanced_is_malformed() {
        let src = "tags: ['a', 'b'";
        assert_eq!(
            extract_array(src, "tags"),
            Extracted::Malformed(Malformed::Unbalanced { open: '[', at: 6 })
        );
        assert_eq!(extract_array(src, "tags").or_empty(), "");
    }

    #[test]
    fn block_without_open_is_malformed() {
        assert!(matches!(
            extract_array("tags: null", "tags"),
            Extracted::Malformed(Malformed::MissingOpen { .. })
        ));
    }

    #[test]
    fn value_backtick_keeps_newlines() {
        let src = "title: `Multi\nline`,";
        assert_eq!(extract_value(src, "title"), Extracted::Found("Multi\nline".to_string()));
    }

    #[test]
    fn value_backtick_wins_over_inner_quotes() {
        let src = "explanation: `He said \"no\" and 'yes'`";
        assert_eq!(
            extract_value(src, "explanation").or_empty(),
            "He said \"no\" and 'yes'"
        );
    }

    #[test]
    fn value_single_and_double_quotes() {
        assert_eq!(extract_value("rank: 'A'", "rank").or_empty(), "A");
        assert_eq!(extract_value("rank: \"A\"", "rank").or_empty(), "A");
    }

    #[test]
    fn value_quoted_key() {
        assert_eq!(extract_value(r#"{"rank": "B"}"#, "rank").or_empty(), "B");
    }

    #[test]
    fn value_unquoted() {
        assert_eq!(extract_value("{ id: 12, rank: 'A' }", "id").or_empty(), "12");
        assert_eq!(extract_value("{ id: 7 }", "id").or_empty(), "7");
        assert_eq!(extract_value("check: true\n", "check").or_empty(), "true");
    }

    #[test]
    fn value_absent_vs_malformed() {
        assert_eq!(extract_value("{ id: 1 }", "rank"), Extracted::Absent);
        assert!(matches!(
            extract_value("{rank:}", "rank"),
            Extracted::Malformed(Malformed::NoValue { .. })
        ));
    }

    #[test]
    fn value_takes_first_occurrence() {
        let src = "title: '外側', quiz: [{ title: '内側' }]";
        assert_eq!(extract_value(src, "title").or_empty(), "外側");
    }

    #[test]
    fn template_only_matches_backticks() {
        assert_eq!(extract_template("explanation: 'x'", "explanation"), Extracted::Absent);
        assert_eq!(
            extract_template("explanation: `<p>x</p>`", "explanation").or_empty(),
            "<p>x</p>"
        );
    }

    #[test]
    fn field_patterns_compile_once() {
        let first = patterns("caseTitle");
        let again = patterns("caseTitle");
        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &patterns("caseRank")));

        let src = "caseTitle: 'A', caseRank: B";
        for _ in 0..3 {
            assert_eq!(extract_value(src, "caseTitle"), Extracted::Found("A".into()));
            assert_eq!(extract_value(src, "caseRank"), Extracted::Found("B".into()));
        }
    }

    #[test]
    fn field_names_are_escaped() {
        let src = "a.b: 'dot', axb: 'x'";
        assert_eq!(extract_value(src, "a.b"), Extracted::Found("dot".into()));
        assert_eq!(extract_value("axb: 'x'", "a.b"), Extracted::Absent);
    }

    #[test]
    fn split_list_strips_quotes_and_blanks() {
        assert_eq!(
            split_list(r#" "民法", '契約' , ,成立 "#),
            vec!["民法", "契約", "成立"]
        );
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn chunks_two_objects() {
        let chunks: Vec<_> = ObjectChunks::new("{id:1},{id:2}").collect();
        assert_eq!(chunks, vec!["{id:1}", "{id:2}"]);
    }

    #[test]
    fn chunks_from_extracted_array() {
        let body = extract_array("quiz: [{id:1},{id:2}]", "quiz").or_empty();
        let chunks: Vec<_> = ObjectChunks::new(body).collect();
        assert_eq!(chunks, vec!["{id:1}", "{id:2}"]);
    }

    #[test]
    fn chunks_ignore_internal_commas_and_braces_in_strings() {
        let body = "{ a: '1, 2', b: '}' }, { c: [3, 4] }";
        let chunks: Vec<_> = ObjectChunks::new(body).collect();
        assert_eq!(chunks, vec!["{ a: '1, 2', b: '}' }", "{ c: [3, 4] }"]);
    }

    #[test]
    fn chunks_stop_at_unbalanced() {
        let mut chunks = ObjectChunks::new("{a:1}, {b:2");
        assert_eq!(chunks.next(), Some("{a:1}"));
        assert_eq!(chunks.next(), None);
        assert_eq!(chunks.next(), None);
    }
}
