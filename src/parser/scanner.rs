//! Regex-driven scanner shared by the DDL and SELECT parsers

use crate::identifier::{Identifier, TableName};
use crate::schema::Comment;
use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

fn keyword(pattern: &str) -> Regex {
    Regex::new(&format!(r"(?i)^(?:{})\b", pattern)).expect("keyword pattern is valid")
}

macro_rules! keywords {
    ($($name:ident => $pattern:expr),* $(,)?) => {
        $(pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| keyword($pattern));)*
    };
}

keywords! {
    CREATE => "CREATE",
    TEMP => "TEMP|TEMPORARY",
    VIRTUAL => "VIRTUAL",
    TABLE => "TABLE",
    VIEW => "VIEW",
    IF_NOT_EXISTS => r"IF\s+NOT\s+EXISTS",
    AS => "AS",
    USING => "USING",
    WITHOUT_ROWID => r"WITHOUT\s+ROWID",
    STRICT => "STRICT",
    CONSTRAINT => "CONSTRAINT",
    PRIMARY_KEY => r"PRIMARY\s+KEY",
    NOT_NULL => r"NOT\s+NULL",
    UNIQUE => "UNIQUE",
    CHECK => "CHECK",
    DEFAULT => "DEFAULT",
    COLLATE => "COLLATE",
    REFERENCES => "REFERENCES",
    FOREIGN_KEY => r"FOREIGN\s+KEY",
    ON_CONFLICT => r"ON\s+CONFLICT",
    CONFLICT_RESOLUTION => "ROLLBACK|ABORT|FAIL|IGNORE|REPLACE",
    SORT_ORDER => "ASC|DESC",
    AUTOINCREMENT => "AUTOINCREMENT",
    ON_DELETE => r"ON\s+DELETE",
    ON_UPDATE => r"ON\s+UPDATE",
    FK_ACTION => r"SET\s+NULL|SET\s+DEFAULT|CASCADE|RESTRICT|NO\s+ACTION",
    MATCH => "MATCH",
    NOT_DEFERRABLE => r"NOT\s+DEFERRABLE",
    DEFERRABLE => "DEFERRABLE",
    INITIALLY_DEFERRED => r"INITIALLY\s+DEFERRED",
    INITIALLY_IMMEDIATE => r"INITIALLY\s+IMMEDIATE",
    RESERVED_CONSTANT => "NULL|TRUE|FALSE|CURRENT_TIMESTAMP|CURRENT_DATE|CURRENT_TIME",
    GENERATED => "GENERATED|AS",
    SELECT => "SELECT",
    SELECT_MODE => "DISTINCT|ALL",
    FROM => "FROM",
    COMPOUND => r"UNION\s+ALL|UNION|INTERSECT|EXCEPT",
}

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:0[xX][0-9a-fA-F]+|(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("number pattern is valid")
});

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[xX]?'(?:[^']|'')*'").expect("string pattern is valid"));

/// Cursor over DDL text. All matching is anchored at the cursor.
pub(crate) struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.rest().trim_start().is_empty()
    }

    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(message, self.rest())
    }

    pub fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Skip whitespace and comments, returning the comments.
    pub fn trivia(&mut self) -> Vec<Comment> {
        let mut comments = Vec::new();
        loop {
            self.skip_ws();
            let rest = self.rest();
            if rest.starts_with("--") {
                let end = rest.find('\n').unwrap_or(rest.len());
                comments.push(Comment::Line(rest[..end].trim_end().to_string()));
                self.pos += end;
            } else if rest.starts_with("/*") {
                let end = rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
                comments.push(Comment::Multiline(rest[..end].to_string()));
                self.pos += end;
            } else {
                return comments;
            }
        }
    }

    /// Consume a keyword phrase if it is next.
    pub fn keyword(&mut self, re: &Regex) -> Option<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let m = re.find(rest)?;
        self.pos += m.end();
        Some(&rest[..m.end()])
    }

    pub fn peek_keyword(&self, re: &Regex) -> bool {
        re.is_match(self.rest().trim_start())
    }

    pub fn expect_keyword(&mut self, re: &Regex, what: &str) -> Result<&'a str> {
        self.keyword(re).ok_or_else(|| self.error(format!("expected {}", what)))
    }

    pub fn peek_punct(&self, c: char) -> bool {
        self.rest().trim_start().starts_with(c)
    }

    pub fn punct(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.punct(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`", c)))
        }
    }

    pub fn identifier(&mut self) -> Result<Identifier> {
        self.skip_ws();
        let rest = self.rest();
        let (ident, after) = Identifier::parse(rest)?;
        self.pos += rest.len() - after.len();
        Ok(ident)
    }

    pub fn table_name(&mut self) -> Result<TableName> {
        self.skip_ws();
        let rest = self.rest();
        let (name, after) = TableName::parse(rest)?;
        self.pos += rest.len() - after.len();
        Ok(name)
    }

    pub fn number(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let m = NUMBER.find(rest)?;
        let next = rest[m.end()..].chars().next();
        if next.is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }
        self.pos += m.end();
        Some(&rest[..m.end()])
    }

    pub fn string_literal(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let m = STRING_LITERAL.find(rest)?;
        self.pos += m.end();
        Some(&rest[..m.end()])
    }

    /// Consume a parenthesized group, returning it verbatim with the outer
    /// parentheses. Quoted text is skipped when counting depth.
    pub fn balanced(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        if !rest.starts_with('(') {
            return Err(self.error("expected `(`"));
        }
        match group_end(rest) {
            Some(end) => {
                self.pos += end;
                Ok(&rest[..end])
            }
            None => Err(self.error("unmatched parenthesis")),
        }
    }
}

/// Byte length of the parenthesized group starting at the front of `text`.
fn group_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in TopLevel::new(text) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Iterates characters outside quotes and comments.
struct TopLevel<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> TopLevel<'a> {
    fn new(text: &'a str) -> Self {
        Self { chars: text.char_indices().peekable() }
    }
}

impl Iterator for TopLevel<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (i, c) = self.chars.next()?;
            let close = match c {
                '\'' | '"' | '`' => Some(c),
                '[' => Some(']'),
                _ => None,
            };
            if let Some(close) = close {
                for (_, inner) in self.chars.by_ref() {
                    if inner == close {
                        break;
                    }
                }
                continue;
            }
            if c == '-' && self.chars.peek().is_some_and(|(_, n)| *n == '-') {
                for (_, inner) in self.chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
                continue;
            }
            if c == '/' && self.chars.peek().is_some_and(|(_, n)| *n == '*') {
                self.chars.next();
                let mut prev = ' ';
                for (_, inner) in self.chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
                continue;
            }
            return Some((i, c));
        }
    }
}

/// Byte offsets of characters at parenthesis depth zero, outside quotes
/// and comments.
pub(crate) fn top_level_offsets(text: &str) -> Vec<usize> {
    let mut depth = 0i32;
    let mut offsets = Vec::new();
    for (i, c) in TopLevel::new(text) {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 => offsets.push(i),
            _ => {}
        }
    }
    offsets
}

/// Split on a separator that appears at the top level only.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for i in top_level_offsets(text) {
        if text[i..].starts_with(sep) {
            parts.push(&text[start..i]);
            start = i + sep.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// True when offset `i` starts a word (not preceded by a word character).
pub(crate) fn at_word_start(text: &str, i: usize) -> bool {
    !text[..i]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive_and_bounded() {
        let mut s = Scanner::new("  primary   KEY autoincrement");
        assert!(s.keyword(&PRIMARY_KEY).is_some());
        assert!(s.keyword(&AUTOINCREMENT).is_some());
        assert!(s.is_eof());

        let mut s = Scanner::new("uniqueness");
        assert!(s.keyword(&UNIQUE).is_none());
    }

    #[test]
    fn test_balanced_skips_quoted_parens() {
        let mut s = Scanner::new("(a > ')' AND (b < 2)) rest");
        assert_eq!(s.balanced().unwrap(), "(a > ')' AND (b < 2))");
        assert_eq!(s.rest(), " rest");

        let mut s = Scanner::new("(a > (1)");
        assert!(s.balanced().is_err());
    }

    #[test]
    fn test_numbers() {
        for input in ["42", "-3.5", "+.5", "1e10", "2.5E-3", "0x1F"] {
            let mut s = Scanner::new(input);
            assert_eq!(s.number(), Some(input), "{}", input);
        }
        let mut s = Scanner::new("12abc");
        assert_eq!(s.number(), None);
    }

    #[test]
    fn test_trivia_collects_comments() {
        let mut s = Scanner::new("  -- first\n /* second */ x");
        let comments = s.trivia();
        assert_eq!(
            comments,
            vec![Comment::Line("-- first".into()), Comment::Multiline("/* second */".into())]
        );
        assert_eq!(s.rest(), "x");
    }

    #[test]
    fn test_split_top_level() {
        let parts = split_top_level("a, f(b, c), 'x,y'", ',');
        assert_eq!(parts, vec!["a", " f(b, c)", " 'x,y'"]);
    }
}
