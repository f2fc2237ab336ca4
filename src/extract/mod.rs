//! Cuts generated files out of a free-form model reply.
//!
//! The model is asked to wrap every file as
//!
//! ```text
//! --- FILE: Domain/Feed/sql/load.gql ---
//! ...content...
//! --- END FILE ---
//! ```
//!
//! The scanner looks for an open marker, reads the path from the rest of that
//! line, then takes everything up to the *first* close marker as the body.
//! Anything that does not fit is skipped without error.

use crate::wire::GeneratedFile;

const RULE: &str = "---";
const OPEN_TAG: &str = "FILE:";
const CLOSE_TAG: &str = "END FILE";

pub fn open_marker(path: &str) -> String {
    format!("{RULE} {OPEN_TAG} {path} {RULE}")
}

pub fn close_marker() -> &'static str {
    "--- END FILE ---"
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    /// Open marker; `body_start` is the byte just after its line.
    Open { path: &'a str, body_start: usize },
    /// Close marker spanning `start..end`.
    Close { start: usize, end: usize },
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

fn skip_ws(s: &str, mut i: usize) -> usize {
    while let Some(c) = s[i..].chars().next() {
        if !c.is_whitespace() {
            break;
        }
        i += c.len_utf8();
    }
    i
}

fn skip_inline_ws(s: &str, mut i: usize) -> usize {
    while let Some(c) = s[i..].chars().next() {
        if c == '\n' || !c.is_whitespace() {
            break;
        }
        i += c.len_utf8();
    }
    i
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Try to read an open marker starting at the rule at `at`.
    fn open_at(&self, at: usize) -> Option<Token<'a>> {
        let s = self.src;
        let i = skip_inline_ws(s, at + RULE.len());
        let rest = s[i..].strip_prefix(OPEN_TAG)?;
        let path_start = i + OPEN_TAG.len();
        let line_end = rest.find('\n').map(|n| path_start + n)?;
        let line = s[path_start..line_end].trim_end();
        let path = line.strip_suffix(RULE)?.trim();
        if path.is_empty() {
            return None;
        }
        Some(Token::Open { path, body_start: line_end + 1 })
    }

    /// Try to read a close marker starting at the rule at `at`.
    fn close_at(&self, at: usize) -> Option<Token<'a>> {
        let s = self.src;
        let i = skip_ws(s, at + RULE.len());
        s[i..].strip_prefix(CLOSE_TAG)?;
        let j = skip_ws(s, i + CLOSE_TAG.len());
        s[j..].strip_prefix(RULE)?;
        Some(Token::Close { start: at, end: j + RULE.len() })
    }

    /// Next open marker at or after the cursor.
    fn next_open(&mut self) -> Option<(&'a str, usize)> {
        while let Some(off) = self.src[self.pos..].find(RULE) {
            let at = self.pos + off;
            self.pos = at + 1;
            if let Some(Token::Open { path, body_start }) = self.open_at(at) {
                self.pos = body_start;
                return Some((path, body_start));
            }
        }
        self.pos = self.src.len();
        None
    }

    /// First close marker at or after the cursor; open markers in between
    /// belong to the body.
    fn next_close(&mut self) -> Option<(usize, usize)> {
        let mut from = self.pos;
        while let Some(off) = self.src[from..].find(RULE) {
            let at = from + off;
            if let Some(Token::Close { start, end }) = self.close_at(at) {
                self.pos = end;
                return Some((start, end));
            }
            from = at + 1;
        }
        None
    }
}

/// Extract every well-formed file block, in order of appearance.
///
/// Paths are trimmed; bodies are trimmed and get exactly one trailing newline.
/// Duplicate paths are all kept. A reply without blocks yields an empty list.
pub fn parse_files(reply: &str) -> Vec<GeneratedFile> {
    let mut scanner = Scanner::new(reply);
    let mut files = Vec::new();

    while let Some((path, body_start)) = scanner.next_open() {
        let Some((close_start, _)) = scanner.next_close() else {
            tracing::debug!(path, "file block without close marker dropped");
            break;
        };
        let body = reply[body_start..close_start].trim();
        files.push(GeneratedFile::new(path, format!("{body}\n")));
    }
    files
}
