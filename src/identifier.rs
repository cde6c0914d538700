//! Identifiers - parsed SQL names
//!
//! Three shapes are recognised:
//! - bare names: `users`, `user_id`
//! - quoted names: `"first name"`, `` `order` ``, `'x'`, `[select]`
//! - schema/table qualified names: `main.users`, `users.userid`
//!
//! Parsing always consumes one identifier off the front of a string and
//! hands back the unconsumed remainder so the DDL parser can keep going.

use crate::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The quoting character used around an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    Double,
    Backtick,
    Single,
    Bracket,
}

impl Quote {
    pub fn from_open(c: char) -> Option<Self> {
        match c {
            '"' => Some(Quote::Double),
            '`' => Some(Quote::Backtick),
            '\'' => Some(Quote::Single),
            '[' => Some(Quote::Bracket),
            _ => None,
        }
    }

    pub fn open(&self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Backtick => '`',
            Quote::Single => '\'',
            Quote::Bracket => '[',
        }
    }

    pub fn close(&self) -> char {
        match self {
            Quote::Bracket => ']',
            other => other.open(),
        }
    }
}

/// A single parsed name.
///
/// `raw` is the text exactly as it appeared (quotes included); `name` is the
/// unquoted, unescaped value. Equality and hashing use `raw`.
#[derive(Debug, Clone, Eq)]
pub struct Identifier {
    raw: String,
    name: String,
    quote: Option<Quote>,
}

impl Identifier {
    /// Build an identifier from a plain name, quoting it when a bare
    /// rendering would not parse back to the same name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if is_bare(&name) {
            return Self { raw: name.clone(), name, quote: None };
        }
        let raw = format!("\"{}\"", name.replace('"', "\\\""));
        Self { raw, name, quote: Some(Quote::Double) }
    }

    /// Parse one identifier off the front of `input`.
    ///
    /// Leading whitespace is skipped. Returns the identifier and the rest of
    /// the input.
    pub fn parse(input: &str) -> Result<(Self, &str)> {
        let trimmed = input.trim_start();
        let first = trimmed
            .chars()
            .next()
            .ok_or_else(|| Error::parse("expected an identifier, found end of input", input))?;

        if let Some(quote) = Quote::from_open(first) {
            return Self::parse_quoted(trimmed, quote);
        }

        let end = trimmed
            .char_indices()
            .find(|(_, c)| c.is_whitespace() || (c.is_ascii_punctuation() && *c != '_'))
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        let name = &trimmed[..end];

        if name.is_empty() {
            return Err(Error::parse("expected an identifier", trimmed));
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(Error::parse("identifier may not start with a digit", trimmed));
        }

        let ident = Self { raw: name.to_string(), name: name.to_string(), quote: None };
        Ok((ident, &trimmed[end..]))
    }

    fn parse_quoted(input: &str, quote: Quote) -> Result<(Self, &str)> {
        let close = quote.close();
        let mut name = String::new();
        let mut escaped = false;
        // Skip the opening quote, which is always a single byte.
        for (i, c) in input.char_indices().skip(1) {
            if escaped {
                if c != close {
                    name.push('\\');
                }
                name.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == close {
                let end = i + c.len_utf8();
                let ident = Self { raw: input[..end].to_string(), name, quote: Some(quote) };
                return Ok((ident, &input[end..]));
            } else {
                name.push(c);
            }
        }
        Err(Error::parse(format!("missing closing quote {close}"), input))
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quote(&self) -> Option<Quote> {
        self.quote
    }

    /// Case-insensitive comparison against a plain name.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

fn is_bare(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c == '_' || c.is_alphanumeric())
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// `scope.name` - used for `schema.table` and `table.column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultipartIdentifier {
    pub scope: Identifier,
    pub name: Identifier,
}

impl MultipartIdentifier {
    pub fn new(scope: Identifier, name: Identifier) -> Self {
        Self { scope, name }
    }

    /// Parse an identifier and, when it is immediately followed by `.`,
    /// a second one. The result is either a single or a multipart name.
    pub fn parse(input: &str) -> Result<(TableName, &str)> {
        let (first, rest) = Identifier::parse(input)?;
        match rest.strip_prefix('.') {
            Some(after_dot) => {
                let (second, rest) = Identifier::parse(after_dot)?;
                Ok((TableName::Qualified(Self::new(first, second)), rest))
            }
            None => Ok((TableName::Simple(first), rest)),
        }
    }

    pub fn raw(&self) -> String {
        format!("{}.{}", self.scope.raw(), self.name.raw())
    }
}

impl fmt::Display for MultipartIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.name)
    }
}

/// A table name as written in DDL: optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableName {
    Simple(Identifier),
    Qualified(MultipartIdentifier),
}

impl TableName {
    pub fn parse(input: &str) -> Result<(Self, &str)> {
        MultipartIdentifier::parse(input)
    }

    /// The bare table identifier, without schema.
    pub fn ident(&self) -> &Identifier {
        match self {
            TableName::Simple(ident) => ident,
            TableName::Qualified(multi) => &multi.name,
        }
    }

    /// Unquoted table name, without schema.
    pub fn name(&self) -> &str {
        self.ident().name()
    }

    pub fn schema(&self) -> Option<&Identifier> {
        match self {
            TableName::Simple(_) => None,
            TableName::Qualified(multi) => Some(&multi.scope),
        }
    }

    /// Raw, schema-qualified form when a schema exists.
    pub fn fullname(&self) -> String {
        match self {
            TableName::Simple(ident) => ident.raw().to_string(),
            TableName::Qualified(multi) => multi.raw(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        TableName::Simple(Identifier::new(name))
    }
}

impl Serialize for TableName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.fullname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_identifier() {
        let (ident, rest) = Identifier::parse("  user_id INTEGER").unwrap();
        assert_eq!(ident.name(), "user_id");
        assert_eq!(ident.raw(), "user_id");
        assert_eq!(ident.quote(), None);
        assert_eq!(rest, " INTEGER");
    }

    #[test]
    fn test_bare_identifier_stops_at_punctuation() {
        let (ident, rest) = Identifier::parse("value,name").unwrap();
        assert_eq!(ident.name(), "value");
        assert_eq!(rest, ",name");
    }

    #[test]
    fn test_quoted_identifiers() {
        let (ident, rest) = Identifier::parse("\"first name\" TEXT").unwrap();
        assert_eq!(ident.name(), "first name");
        assert_eq!(ident.raw(), "\"first name\"");
        assert_eq!(rest, " TEXT");

        let (ident, _) = Identifier::parse("[select]").unwrap();
        assert_eq!(ident.name(), "select");
        assert_eq!(ident.quote(), Some(Quote::Bracket));

        let (ident, _) = Identifier::parse("`order`").unwrap();
        assert_eq!(ident.name(), "order");
    }

    #[test]
    fn test_escaped_closing_quote() {
        let (ident, rest) = Identifier::parse(r#""say \"hi\"" rest"#).unwrap();
        assert_eq!(ident.name(), "say \"hi\"");
        assert_eq!(rest, " rest");
    }

    #[test]
    fn test_identifier_errors() {
        assert!(Identifier::parse("").is_err());
        assert!(Identifier::parse("   ").is_err());
        assert!(Identifier::parse("1abc").is_err());
        assert!(Identifier::parse("\"unterminated").is_err());
        assert!(Identifier::parse("(abc)").is_err());
    }

    #[test]
    fn test_equality_is_by_raw() {
        let (a, _) = Identifier::parse("name").unwrap();
        let (b, _) = Identifier::parse("\"name\"").unwrap();
        assert_eq!(a.name(), b.name());
        assert_ne!(a, b);
    }

    #[test]
    fn test_multipart() {
        let (name, rest) = MultipartIdentifier::parse("main.users (").unwrap();
        assert_eq!(name.name(), "users");
        assert_eq!(name.schema().map(|s| s.name()), Some("main"));
        assert_eq!(name.fullname(), "main.users");
        assert_eq!(rest, " (");

        let (name, _) = MultipartIdentifier::parse("users (").unwrap();
        assert!(matches!(name, TableName::Simple(_)));
        assert_eq!(name.fullname(), "users");
    }

    #[test]
    fn test_new_quotes_when_needed() {
        assert_eq!(Identifier::new("plain").raw(), "plain");
        assert_eq!(Identifier::new("two words").raw(), "\"two words\"");
        assert_eq!(Identifier::new("9lives").raw(), "\"9lives\"");
    }
}
