use std::iter::Enumerate;
use std::str::Lines;

/// Line prefix that marks a comment in device configuration dumps.
pub const COMMENT_MARKER: char = '!';

/// One non-empty, non-comment line of configuration text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    /// 1-based line number in the original text, counting skipped lines.
    pub line: usize,
    /// Whitespace-delimited tokens in source order.
    pub tokens: Vec<String>,
    /// The line with surrounding whitespace stripped.
    pub text: String,
    /// Whether the source line began with whitespace (a continuation line).
    pub indented: bool,
}

impl RawStatement {
    /// Return the token at `index`, if present.
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Return the first token.
    pub fn keyword(&self) -> &str {
        self.token(0).unwrap_or_default()
    }

    /// Build a statement from already-split tokens that share a source line.
    pub fn from_tokens(line: usize, tokens: Vec<String>, indented: bool) -> Self {
        let text = tokens.join(" ");
        Self {
            line,
            tokens,
            text,
            indented,
        }
    }
}

/// Lazy statement sequence over borrowed configuration text.
///
/// Cloning the iterator resumes from the same position, so a caller can look
/// ahead and rewind without re-reading the input.
#[derive(Debug, Clone)]
pub struct Statements<'a> {
    lines: Enumerate<Lines<'a>>,
}

impl Iterator for Statements<'_> {
    type Item = RawStatement;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, raw) in self.lines.by_ref() {
            let text = raw.trim();
            if text.is_empty() || text.starts_with(COMMENT_MARKER) {
                continue;
            }
            return Some(RawStatement {
                line: index + 1,
                tokens: text.split_whitespace().map(str::to_string).collect(),
                text: text.to_string(),
                indented: raw.starts_with(char::is_whitespace),
            });
        }
        None
    }
}

/// Split configuration text into statements.
pub fn statements(text: &str) -> Statements<'_> {
    Statements {
        lines: text.lines().enumerate(),
    }
}
