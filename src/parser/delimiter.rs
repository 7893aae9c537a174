/// Which quote character opened the string the scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

/// Scanner state. `Escaped` remembers where to go back to once the
/// character after the backslash has been swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    Quoted(Quote),
    Escaped(Option<Quote>),
}

impl ScanState {
    fn resume(quote: Option<Quote>) -> Self {
        match quote {
            Some(q) => ScanState::Quoted(q),
            None => ScanState::Normal,
        }
    }
}

/// Find the delimiter that closes the `open` found at byte offset `start`.
///
/// Nesting is tracked only outside `'…'` and `"…"` strings, and the character
/// following a backslash is skipped entirely. Returns the byte offset of the
/// balancing `close`, or `None` when `text[start]` is not `open` or the text
/// ends before depth gets back to zero.
pub fn find_matching_delimiter(text: &str, start: usize, open: char, close: char) -> Option<usize> {
    let rest = text.get(start..)?;
    if !rest.starts_with(open) {
        return None;
    }

    let mut state = ScanState::Normal;
    let mut depth: usize = 0;

    for (offset, ch) in rest.char_indices() {
        state = match state {
            ScanState::Escaped(quote) => ScanState::resume(quote),
            ScanState::Quoted(quote) => match ch {
                '\\' => ScanState::Escaped(Some(quote)),
                '\'' if quote == Quote::Single => ScanState::Normal,
                '"' if quote == Quote::Double => ScanState::Normal,
                _ => state,
            },
            ScanState::Normal => match ch {
                '\\' => ScanState::Escaped(None),
                '\'' => ScanState::Quoted(Quote::Single),
                '"' => ScanState::Quoted(Quote::Double),
                c if c == open => {
                    depth += 1;
                    ScanState::Normal
                }
                c if c == close => {
                    // open was seen first, so depth >= 1 here
                    depth -= 1;
                    if depth == 0 {
                        return Some(start + offset);
                    }
                    ScanState::Normal
                }
                _ => ScanState::Normal,
            },
        };
    }

    None
}
