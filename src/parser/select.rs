//! Shallow `SELECT` parsing for views and `CREATE TABLE .. AS`
//!
//! Only the outer shape is checked: each compound part must start with
//! `SELECT` and list at least one result column. Expressions and `FROM`
//! clauses are kept as text.

use super::scanner::*;
use crate::schema::{CompoundOperator, SelectMode, SelectStatement, SimpleSelect};
use crate::{Error, Result};

pub fn parse_select(sql: &str) -> Result<SelectStatement> {
    let raw = sql.trim().trim_end_matches(';').trim_end();
    if raw.is_empty() {
        return Err(Error::parse("expected SELECT", sql));
    }

    let mut selects = Vec::new();
    let mut operators = Vec::new();
    let mut start = 0;
    for i in top_level_offsets(raw) {
        if i < start || !at_word_start(raw, i) {
            continue;
        }
        if let Some(m) = COMPOUND.find(&raw[i..]) {
            selects.push(simple_select(&raw[start..i])?);
            operators.push(compound_operator(m.as_str()));
            start = i + m.end();
        }
    }
    selects.push(simple_select(&raw[start..])?);

    if operators.is_empty() {
        let select = selects.remove(0);
        return Ok(SelectStatement::Simple { select, raw: raw.to_string() });
    }
    Ok(SelectStatement::Compound { selects, operators, raw: raw.to_string() })
}

fn compound_operator(word: &str) -> CompoundOperator {
    let word = word.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
    match word.as_str() {
        "UNION ALL" => CompoundOperator::UnionAll,
        "INTERSECT" => CompoundOperator::Intersect,
        "EXCEPT" => CompoundOperator::Except,
        _ => CompoundOperator::Union,
    }
}

fn simple_select(part: &str) -> Result<SimpleSelect> {
    let mut s = Scanner::new(part);
    s.trivia();
    s.expect_keyword(&SELECT, "SELECT")?;
    let mode = match s.keyword(&SELECT_MODE) {
        Some(word) if word.eq_ignore_ascii_case("DISTINCT") => SelectMode::Distinct,
        Some(_) => SelectMode::All,
        None => SelectMode::None,
    };

    let body = s.rest();
    let from = top_level_offsets(body)
        .into_iter()
        .find(|&i| at_word_start(body, i) && FROM.is_match(&body[i..]));
    let (columns_text, tail) = match from {
        Some(i) => (&body[..i], Some(body[i..].trim().to_string())),
        None => (body, None),
    };

    let mut columns = Vec::new();
    for column in split_top_level(columns_text, ',') {
        let column = column.trim();
        if column.is_empty() {
            return Err(Error::parse("empty result column", columns_text));
        }
        columns.push(column.to_string());
    }
    Ok(SimpleSelect { mode, columns, tail })
}
