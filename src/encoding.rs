use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8};

/// How many leading characters are checked for Japanese text.
const PROBE_CHARS: usize = 100;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Utf8,
    Utf8Sig,
    Utf16Le,
    Utf16Be,
    Cp932,
    EucJp,
}

/// Tried in order when reading source files.
pub const READ_ORDER: &[Candidate] = &[Candidate::Utf8, Candidate::Utf8Sig, Candidate::Cp932];

/// Tried in order by the encoding probe.
pub const PROBE_ORDER: &[Candidate] = &[
    Candidate::Utf8,
    Candidate::Utf8Sig,
    Candidate::Utf16Le,
    Candidate::Utf16Be,
    Candidate::Cp932,
    Candidate::EucJp,
];

impl Candidate {
    pub fn label(self) -> &'static str {
        match self {
            Candidate::Utf8 => "utf-8",
            Candidate::Utf8Sig => "utf-8-sig",
            Candidate::Utf16Le => "utf-16le",
            Candidate::Utf16Be => "utf-16be",
            Candidate::Cp932 => "cp932",
            Candidate::EucJp => "euc-jp",
        }
    }

    /// Strict decode: `None` on any malformed sequence.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        let strict = |enc: &'static Encoding, b: &[u8]| {
            enc.decode_without_bom_handling_and_without_replacement(b)
                .map(Cow::into_owned)
        };
        match self {
            Candidate::Utf8 => {
                if bytes.starts_with(UTF8_BOM) {
                    return None;
                }
                strict(UTF_8, bytes)
            }
            Candidate::Utf8Sig => strict(UTF_8, bytes.strip_prefix(UTF8_BOM)?),
            Candidate::Utf16Le => strict(UTF_16LE, bytes.strip_prefix(b"\xFF\xFE").unwrap_or(bytes)),
            Candidate::Utf16Be => strict(UTF_16BE, bytes.strip_prefix(b"\xFE\xFF").unwrap_or(bytes)),
            Candidate::Cp932 => strict(SHIFT_JIS, bytes),
            Candidate::EucJp => strict(EUC_JP, bytes),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which decoding produced a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detected {
    Exact(Candidate),
    /// Every candidate failed; cp932 with U+FFFD for bad bytes.
    Cp932Replace,
}

impl fmt::Display for Detected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detected::Exact(c) => f.write_str(c.label()),
            Detected::Cp932Replace => f.write_str("cp932-replace"),
        }
    }
}

fn has_non_ascii_prefix(text: &str) -> bool {
    text.chars().take(PROBE_CHARS).any(|c| !c.is_ascii())
}

/// Decode with the first candidate that is clean and looks Japanese near the
/// start; otherwise fall back to a lossy cp932 decode. Never fails.
pub fn decode(bytes: &[u8]) -> (String, Detected) {
    for &candidate in READ_ORDER {
        if let Some(text) = candidate.decode(bytes) {
            if has_non_ascii_prefix(&text) {
                return (text, Detected::Exact(candidate));
            }
        }
    }
    let (text, _) = SHIFT_JIS.decode_without_bom_handling(bytes);
    (text.into_owned(), Detected::Cp932Replace)
}

pub fn read_text(path: &Path) -> Result<(String, Detected)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(decode(&bytes))
}

/// Result of trying one candidate in the probe.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub candidate: Candidate,
    pub text: Option<String>,
}

impl ProbeResult {
    pub fn preview(&self, max_chars: usize) -> Option<String> {
        self.text.as_ref().map(|t| t.chars().take(max_chars).collect())
    }
}

pub fn probe(bytes: &[u8]) -> Vec<ProbeResult> {
    PROBE_ORDER
        .iter()
        .map(|&candidate| ProbeResult {
            candidate,
            text: candidate.decode(bytes),
        })
        .collect()
}
