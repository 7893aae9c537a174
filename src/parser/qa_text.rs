use std::sync::LazyLock;

use regex::Regex;

use crate::dataset::Rank;

// "12. A　問題文" and "12.A 問題文"; \s also covers the full-width space.
// Numbers may be written with full-width digits.
static HEADER_SPACED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9０-９]+)\.\s*([ABC])[　\s]+(.+)$").unwrap());
static HEADER_TIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9０-９]+)\.([ABC])[　\s]+(.+)$").unwrap());
static SUBCATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9０-９]+)\.").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub number: u32,
    pub rank: Rank,
    pub question: String,
    pub answer: String,
}

struct Header {
    number: u32,
    rank: Rank,
    question: String,
}

/// Parse ASCII or full-width decimal digits, so `１２` reads as 12.
fn parse_number(digits: &str) -> Option<u32> {
    digits.chars().try_fold(0u32, |acc, c| {
        let c = match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32)?,
            _ => c,
        };
        acc.checked_mul(10)?.checked_add(c.to_digit(10)?)
    })
}

fn parse_header(line: &str) -> Option<Header> {
    let caps = HEADER_SPACED_RE
        .captures(line)
        .or_else(|| HEADER_TIGHT_RE.captures(line))?;
    Some(Header {
        number: parse_number(&caps[1])?,
        rank: caps[2].parse().ok()?,
        question: caps[3].to_string(),
    })
}

/// Split a one-question-one-answer text into records.
///
/// A header line opens a record; every non-blank line up to the next header
/// belongs to its answer. Anything before the first header is ignored.
pub fn parse_qa_text(content: &str) -> Vec<ParsedQuestion> {
    let normalized = content
        .replace("\r\r\n", "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut questions = Vec::new();
    let mut current: Option<(Header, Vec<&str>)> = None;

    for line in normalized.split('\n').map(str::trim) {
        if let Some(header) = parse_header(line) {
            if let Some((prev, body)) = current.take() {
                questions.push(finish(prev, &body));
            }
            current = Some((header, Vec::new()));
        } else if !line.is_empty() {
            if let Some((_, body)) = current.as_mut() {
                body.push(line);
            }
        }
    }

    if let Some((prev, body)) = current {
        questions.push(finish(prev, &body));
    }

    questions
}

fn finish(header: Header, body: &[&str]) -> ParsedQuestion {
    ParsedQuestion {
        number: header.number,
        rank: header.rank,
        question: header.question,
        answer: body.join("\n").trim().to_string(),
    }
}

/// Leading subcategory number of a source file name, e.g. `3.20-29.txt` -> 3.
pub fn subcategory_from_filename(name: &str) -> Option<u32> {
    parse_number(&SUBCATEGORY_RE.captures(name)?[1])
}
