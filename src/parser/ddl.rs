//! `CREATE TABLE`, `CREATE VIEW` and `CREATE VIRTUAL TABLE` parsing
//!
//! The grammar is deliberately closed: anything outside the supported DDL
//! subset is rejected with a parse error naming where parsing stopped.

use super::scanner::*;
use super::select::parse_select;
use crate::identifier::{Identifier, TableName};
use crate::schema::{
    Collation, Column, Comment, ConflictClause, Constraint, ConstraintKind, DefaultValue, FkAction,
    ForeignKeyClause, IndexedColumn, SortOrder, Statement, Table, TableConstraint,
    TableConstraintKind, View, VirtualTable,
};
use crate::{Error, Result};
use indexmap::IndexMap;

struct Header {
    name: TableName,
    temporary: bool,
    if_not_exists: bool,
    definition: String,
}

#[derive(Default)]
struct Definitions {
    columns: IndexMap<String, Column>,
    constraints: Vec<TableConstraint>,
}

/// Parse a `;`-separated script of `CREATE` statements. Segments holding
/// only whitespace or comments are skipped.
pub fn parse_script(sql: &str) -> Result<Vec<Statement>> {
    split_top_level(sql, ';')
        .into_iter()
        .filter(|segment| {
            let mut s = Scanner::new(segment);
            s.trivia();
            !s.is_eof()
        })
        .map(parse_statement)
        .collect()
}

/// Parse any supported `CREATE` statement.
pub fn parse_statement(sql: &str) -> Result<Statement> {
    let definition = sql.trim().trim_end_matches(';').trim_end().to_string();
    let mut s = Scanner::new(sql);
    let mut comments = s.trivia();
    s.expect_keyword(&CREATE, "CREATE")?;
    let temporary = s.keyword(&TEMP).is_some();
    let is_virtual = !temporary && s.keyword(&VIRTUAL).is_some();

    if s.keyword(&TABLE).is_some() {
        let if_not_exists = s.keyword(&IF_NOT_EXISTS).is_some();
        let name = s.table_name()?;
        let header = Header { name, temporary, if_not_exists, definition };
        if is_virtual {
            return virtual_table(&mut s, header).map(Statement::VirtualTable);
        }
        return table(&mut s, header, &mut comments).map(Statement::Table);
    }

    if !is_virtual && s.keyword(&VIEW).is_some() {
        let if_not_exists = s.keyword(&IF_NOT_EXISTS).is_some();
        let name = s.table_name()?;
        let header = Header { name, temporary, if_not_exists, definition };
        return view(&mut s, header).map(Statement::View);
    }

    Err(s.error("expected TABLE, VIRTUAL TABLE or VIEW"))
}

pub fn parse_table(sql: &str) -> Result<Table> {
    match parse_statement(sql)? {
        Statement::Table(table) => Ok(table),
        _ => Err(Error::parse("expected a CREATE TABLE statement", sql)),
    }
}

pub fn parse_view(sql: &str) -> Result<View> {
    match parse_statement(sql)? {
        Statement::View(view) => Ok(view),
        _ => Err(Error::parse("expected a CREATE VIEW statement", sql)),
    }
}

pub fn parse_virtual_table(sql: &str) -> Result<VirtualTable> {
    match parse_statement(sql)? {
        Statement::VirtualTable(vt) => Ok(vt),
        _ => Err(Error::parse("expected a CREATE VIRTUAL TABLE statement", sql)),
    }
}

/// Parse a standalone column definition.
pub fn parse_column(definition: &str) -> Result<Column> {
    let mut s = Scanner::new(definition);
    let column = column_def(&mut s)?;
    if !s.is_eof() {
        return Err(s.error("unexpected text after column definition"));
    }
    Ok(column)
}

/// Parse a standalone table constraint.
pub fn parse_table_constraint(definition: &str) -> Result<TableConstraint> {
    let mut s = Scanner::new(definition);
    s.trivia();
    let constraint = table_constraint(&mut s)?;
    s.trivia();
    if !s.is_eof() {
        return Err(s.error("unexpected text after table constraint"));
    }
    Ok(constraint)
}

fn table(s: &mut Scanner<'_>, header: Header, comments: &mut Vec<Comment>) -> Result<Table> {
    if s.keyword(&AS).is_some() {
        let select = parse_select(s.rest())?;
        return Ok(Table {
            name: header.name,
            temporary: header.temporary,
            if_not_exists: header.if_not_exists,
            without_rowid: false,
            strict: false,
            columns: IndexMap::new(),
            tableconstraints: Vec::new(),
            comments: std::mem::take(comments),
            select: Some(select),
            definition: header.definition,
        });
    }

    s.expect_punct('(')?;
    let defs = definitions(s, comments)?;

    let mut without_rowid = false;
    let mut strict = false;
    loop {
        if s.keyword(&WITHOUT_ROWID).is_some() {
            without_rowid = true;
        } else if s.keyword(&STRICT).is_some() {
            strict = true;
        } else {
            break;
        }
        if !s.punct(',') {
            break;
        }
    }

    comments.extend(s.trivia());
    s.punct(';');
    comments.extend(s.trivia());
    if !s.is_eof() {
        return Err(s.error("unexpected text after table definition"));
    }

    Ok(Table {
        name: header.name,
        temporary: header.temporary,
        if_not_exists: header.if_not_exists,
        without_rowid,
        strict,
        columns: defs.columns,
        tableconstraints: defs.constraints,
        comments: std::mem::take(comments),
        select: None,
        definition: header.definition,
    })
}

/// Column and table-constraint list, consuming the closing `)`.
fn definitions(s: &mut Scanner<'_>, table_comments: &mut Vec<Comment>) -> Result<Definitions> {
    let mut defs = Definitions::default();
    loop {
        table_comments.extend(s.trivia());
        if s.is_eof() {
            return Err(s.error("unmatched parenthesis: missing `)`"));
        }
        if starts_table_constraint(s) {
            defs.constraints.push(table_constraint(s)?);
            table_comments.extend(s.trivia());
        } else if !defs.constraints.is_empty() {
            return Err(s.error("column definition after table constraint"));
        } else {
            let column = column_def(s)?;
            insert_column(&mut defs.columns, column)?;
        }
        if s.punct(',') {
            continue;
        }
        if s.punct(')') {
            break;
        }
        return Err(s.error("expected `,` or `)`"));
    }
    if defs.columns.is_empty() {
        return Err(s.error("table must define at least one column"));
    }
    validate(&defs)?;
    Ok(defs)
}

fn insert_column(columns: &mut IndexMap<String, Column>, column: Column) -> Result<()> {
    if columns.keys().any(|k| k.eq_ignore_ascii_case(column.name())) {
        return Err(Error::parse("duplicate column", column.name.raw()));
    }
    columns.insert(column.name().to_string(), column);
    Ok(())
}

/// Cross-item checks: table constraints name real columns, at most one
/// primary key, and at most one foreign key per column.
fn validate(defs: &Definitions) -> Result<()> {
    let mut primary_keys = defs.columns.values().filter(|c| c.is_primary_key()).count();
    for tc in &defs.constraints {
        if matches!(tc.kind, TableConstraintKind::PrimaryKey { .. }) {
            primary_keys += 1;
        }
        for col in tc.columns() {
            if !defs.columns.keys().any(|k| k.eq_ignore_ascii_case(col.name())) {
                return Err(Error::parse("table constraint names an unknown column", col.raw()));
            }
        }
    }
    if primary_keys > 1 {
        return Err(Error::parse("table has more than one primary key", "PRIMARY KEY"));
    }

    for column in defs.columns.values() {
        let table_fks = defs
            .constraints
            .iter()
            .filter(|tc| matches!(tc.kind, TableConstraintKind::ForeignKey { .. }))
            .filter(|tc| tc.involves(column.name()))
            .count();
        if column.references().len() + table_fks > 1 {
            return Err(Error::parse(
                "column is covered by more than one foreign key",
                column.name.raw(),
            ));
        }
    }
    Ok(())
}

fn starts_table_constraint(s: &Scanner<'_>) -> bool {
    [&CONSTRAINT, &PRIMARY_KEY, &UNIQUE, &CHECK, &FOREIGN_KEY]
        .iter()
        .any(|re| s.peek_keyword(re))
}

fn starts_column_constraint(s: &Scanner<'_>) -> bool {
    [
        &CONSTRAINT, &PRIMARY_KEY, &NOT_NULL, &UNIQUE, &CHECK, &DEFAULT, &COLLATE, &REFERENCES,
        &ON_CONFLICT,
    ]
    .iter()
    .any(|re| s.peek_keyword(re))
}

fn at_item_end(s: &Scanner<'_>) -> bool {
    s.is_eof() || s.peek_punct(',') || s.peek_punct(')')
}

fn column_def(s: &mut Scanner<'_>) -> Result<Column> {
    s.trivia();
    let name = s.identifier()?;
    let mut column = Column::new(name, None);

    let mut datatype = String::new();
    loop {
        column.comments.extend(s.trivia());
        if s.peek_punct('(') {
            if datatype.is_empty() {
                return Err(s.error("unexpected `(` in column definition"));
            }
            datatype.push_str(s.balanced()?);
            break;
        }
        if at_item_end(s) || starts_column_constraint(s) {
            break;
        }
        if s.peek_keyword(&GENERATED) {
            return Err(s.error("generated columns are not supported"));
        }
        let word = s.identifier()?;
        if !datatype.is_empty() {
            datatype.push(' ');
        }
        datatype.push_str(word.raw());
    }
    if !datatype.is_empty() {
        column.datatype = Some(datatype);
    }

    loop {
        column.comments.extend(s.trivia());
        if at_item_end(s) {
            break;
        }
        column.constraints.push(column_constraint(s)?);
    }
    Ok(column)
}

fn constraint_name(s: &mut Scanner<'_>) -> Result<Option<Identifier>> {
    if s.keyword(&CONSTRAINT).is_some() {
        Ok(Some(s.identifier()?))
    } else {
        Ok(None)
    }
}

fn column_constraint(s: &mut Scanner<'_>) -> Result<Constraint> {
    let name = constraint_name(s)?;
    let kind = if s.keyword(&PRIMARY_KEY).is_some() {
        let order = sort_order(s);
        let conflict = conflict_clause(s)?;
        let autoincrement = s.keyword(&AUTOINCREMENT).is_some();
        ConstraintKind::PrimaryKey { order, conflict, autoincrement }
    } else if s.keyword(&NOT_NULL).is_some() {
        ConstraintKind::NotNull { conflict: conflict_clause(s)? }
    } else if s.keyword(&UNIQUE).is_some() {
        ConstraintKind::Unique { conflict: conflict_clause(s)? }
    } else if s.keyword(&CHECK).is_some() {
        ConstraintKind::Check { expression: s.balanced()?.to_string() }
    } else if s.keyword(&DEFAULT).is_some() {
        ConstraintKind::Default { value: default_value(s)? }
    } else if s.keyword(&COLLATE).is_some() {
        ConstraintKind::Collate { collation: collation(s)? }
    } else if s.keyword(&REFERENCES).is_some() {
        ConstraintKind::References { clause: foreign_key_clause(s)? }
    } else if s.peek_keyword(&ON_CONFLICT) {
        return Err(s.error("ON CONFLICT must follow PRIMARY KEY, UNIQUE or NOT NULL"));
    } else {
        return Err(s.error("unknown column constraint"));
    };
    Ok(Constraint { name, kind })
}

fn sort_order(s: &mut Scanner<'_>) -> Option<SortOrder> {
    s.keyword(&SORT_ORDER).map(|word| {
        if word.eq_ignore_ascii_case("DESC") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    })
}

fn conflict_clause(s: &mut Scanner<'_>) -> Result<Option<ConflictClause>> {
    if s.keyword(&ON_CONFLICT).is_none() {
        return Ok(None);
    }
    let word = s.expect_keyword(&CONFLICT_RESOLUTION, "conflict resolution")?;
    ConflictClause::from_keyword(word)
        .map(Some)
        .ok_or_else(|| s.error("unknown conflict resolution"))
}

fn collation(s: &mut Scanner<'_>) -> Result<Collation> {
    let name = s.identifier()?;
    Collation::from_name(name.name())
        .ok_or_else(|| Error::parse("unknown collation (expected BINARY, NOCASE or RTRIM)", name.raw()))
}

fn default_value(s: &mut Scanner<'_>) -> Result<DefaultValue> {
    if s.peek_punct('(') {
        return Ok(DefaultValue::Expression(s.balanced()?.to_string()));
    }
    if let Some(literal) = s.string_literal() {
        return Ok(DefaultValue::Literal(literal.to_string()));
    }
    if let Some(number) = s.number() {
        return Ok(DefaultValue::Number(number.to_string()));
    }
    if let Some(constant) = s.keyword(&RESERVED_CONSTANT) {
        return Ok(DefaultValue::Constant(constant.to_ascii_uppercase()));
    }
    if at_item_end(s) {
        return Err(s.error("DEFAULT requires a value"));
    }
    Ok(DefaultValue::Identifier(s.identifier()?))
}

fn identifier_list(s: &mut Scanner<'_>) -> Result<Vec<Identifier>> {
    s.expect_punct('(')?;
    let mut idents = Vec::new();
    loop {
        s.trivia();
        idents.push(s.identifier()?);
        s.trivia();
        if s.punct(',') {
            continue;
        }
        s.expect_punct(')')?;
        return Ok(idents);
    }
}

fn indexed_column_list(s: &mut Scanner<'_>) -> Result<Vec<IndexedColumn>> {
    s.expect_punct('(')?;
    let mut columns = Vec::new();
    loop {
        s.trivia();
        let mut column = IndexedColumn::new(s.identifier()?);
        if s.keyword(&COLLATE).is_some() {
            column.collation = Some(collation(s)?);
        }
        column.order = sort_order(s);
        columns.push(column);
        s.trivia();
        if s.punct(',') {
            continue;
        }
        s.expect_punct(')')?;
        return Ok(columns);
    }
}

fn foreign_key_clause(s: &mut Scanner<'_>) -> Result<ForeignKeyClause> {
    let table = s.identifier()?;
    let columns = if s.peek_punct('(') { identifier_list(s)? } else { Vec::new() };
    let mut clause = ForeignKeyClause::new(table, columns);

    loop {
        if s.keyword(&ON_DELETE).is_some() {
            if clause.on_delete.is_some() {
                return Err(s.error("ON DELETE given more than once"));
            }
            clause.on_delete = Some(fk_action(s)?);
        } else if s.keyword(&ON_UPDATE).is_some() {
            if clause.on_update.is_some() {
                return Err(s.error("ON UPDATE given more than once"));
            }
            clause.on_update = Some(fk_action(s)?);
        } else if s.keyword(&MATCH).is_some() {
            // The engine parses MATCH but never enforces it.
            s.identifier()?;
        } else {
            break;
        }
    }

    clause.deferred = if s.keyword(&NOT_DEFERRABLE).is_some() {
        initially(s);
        Some(false)
    } else if s.keyword(&DEFERRABLE).is_some() {
        Some(initially(s).unwrap_or(false))
    } else {
        None
    };
    Ok(clause)
}

fn fk_action(s: &mut Scanner<'_>) -> Result<FkAction> {
    let phrase = s.expect_keyword(&FK_ACTION, "foreign key action")?;
    FkAction::from_phrase(phrase).ok_or_else(|| s.error("unknown foreign key action"))
}

fn initially(s: &mut Scanner<'_>) -> Option<bool> {
    if s.keyword(&INITIALLY_DEFERRED).is_some() {
        Some(true)
    } else if s.keyword(&INITIALLY_IMMEDIATE).is_some() {
        Some(false)
    } else {
        None
    }
}

fn table_constraint(s: &mut Scanner<'_>) -> Result<TableConstraint> {
    let name = constraint_name(s)?;
    let kind = if s.keyword(&PRIMARY_KEY).is_some() {
        let columns = indexed_column_list(s)?;
        TableConstraintKind::PrimaryKey { columns, conflict: conflict_clause(s)? }
    } else if s.keyword(&UNIQUE).is_some() {
        let columns = indexed_column_list(s)?;
        TableConstraintKind::Unique { columns, conflict: conflict_clause(s)? }
    } else if s.keyword(&CHECK).is_some() {
        TableConstraintKind::Check { expression: s.balanced()?.to_string() }
    } else if s.keyword(&FOREIGN_KEY).is_some() {
        let columns = identifier_list(s)?;
        s.expect_keyword(&REFERENCES, "REFERENCES")?;
        let clause = foreign_key_clause(s)?;
        if !clause.columns.is_empty() && clause.columns.len() != columns.len() {
            return Err(s.error("foreign key column count does not match referenced columns"));
        }
        TableConstraintKind::ForeignKey { columns, clause }
    } else {
        return Err(s.error("unknown table constraint"));
    };
    Ok(TableConstraint { name, kind })
}

fn view(s: &mut Scanner<'_>, header: Header) -> Result<View> {
    let column_names = if s.peek_punct('(') { Some(identifier_list(s)?) } else { None };
    s.expect_keyword(&AS, "AS")?;
    let select = parse_select(s.rest())?;
    Ok(View {
        name: header.name,
        temporary: header.temporary,
        if_not_exists: header.if_not_exists,
        column_names,
        select,
        definition: header.definition,
    })
}

fn virtual_table(s: &mut Scanner<'_>, header: Header) -> Result<VirtualTable> {
    s.expect_keyword(&USING, "USING")?;
    let module = s.identifier()?;
    let args = if s.peek_punct('(') {
        let group = s.balanced()?;
        Some(group[1..group.len() - 1].trim().to_string())
    } else {
        None
    };
    s.trivia();
    s.punct(';');
    s.trivia();
    if !s.is_eof() {
        return Err(s.error("unexpected text after virtual table definition"));
    }

    let mut vt = VirtualTable {
        name: header.name,
        if_not_exists: header.if_not_exists,
        module,
        args,
        columns: IndexMap::new(),
        tableconstraints: Vec::new(),
        options: Vec::new(),
        definition: header.definition,
    };
    if VirtualTable::is_registered_module(vt.module.name()) {
        if let Some(args) = vt.args.clone() {
            fts_arguments(&args, &mut vt)?;
        }
    }
    Ok(vt)
}

/// fts4 arguments are column names, table constraints, or `key=value`
/// module options.
fn fts_arguments(args: &str, vt: &mut VirtualTable) -> Result<()> {
    for item in split_top_level(args, ',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(Error::parse("empty fts4 argument", args));
        }
        if split_top_level(item, '=').len() > 1 {
            vt.options.push(item.to_string());
            continue;
        }
        let probe = Scanner::new(item);
        if starts_table_constraint(&probe) {
            vt.tableconstraints.push(parse_table_constraint(item)?);
        } else {
            insert_column(&mut vt.columns, parse_column(item)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_skips_empty_segments() {
        let script = "CREATE TABLE a (x TEXT);\n\nCREATE VIEW v AS SELECT x FROM a;\n-- done\n";
        let statements = parse_script(script).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].name(), "v");
        assert!(parse_script("CREATE TABLE a (x TEXT); DROP TABLE a").is_err());
    }

    #[test]
    fn test_simple_table() {
        let table = parse_table("CREATE TABLE testtable(name TEXT, value INTEGER);").unwrap();
        assert_eq!(table.name(), "testtable");
        assert_eq!(table.column_names(), vec!["name", "value"]);
        assert!(!table.temporary());
        assert_eq!(table.definition(), "CREATE TABLE testtable(name TEXT, value INTEGER)");
    }

    #[test]
    fn test_header_flags() {
        let table =
            parse_table("create temporary table if not exists main.\"my table\" (a)").unwrap();
        assert!(table.temporary());
        assert!(table.if_not_exists());
        assert_eq!(table.name(), "my table");
        assert_eq!(table.fullname(), "main.\"my table\"");
        assert_eq!(table.column("a").unwrap().datatype, None);
    }

    #[test]
    fn test_column_constraints() {
        let table = parse_table(
            "CREATE TABLE t (
                id INTEGER PRIMARY KEY DESC ON CONFLICT FAIL AUTOINCREMENT,
                name TEXT NOT NULL ON CONFLICT IGNORE UNIQUE COLLATE NOCASE,
                score REAL CHECK (score >= 0 AND (score < 100)) DEFAULT -1.5e2,
                created TEXT DEFAULT CURRENT_TIMESTAMP,
                note TEXT DEFAULT 'it''s',
                flags INTEGER DEFAULT (1 << 2),
                kind TEXT DEFAULT plain
            )",
        )
        .unwrap();

        let id = table.column("id").unwrap();
        assert_eq!(
            id.constraints[0].kind,
            ConstraintKind::PrimaryKey {
                order: Some(SortOrder::Desc),
                conflict: Some(ConflictClause::Fail),
                autoincrement: true,
            }
        );

        let name = table.column("name").unwrap();
        assert_eq!(name.constraints.len(), 3);
        assert_eq!(
            name.constraints[0].kind,
            ConstraintKind::NotNull { conflict: Some(ConflictClause::Ignore) }
        );
        assert_eq!(
            name.constraints[2].kind,
            ConstraintKind::Collate { collation: Collation::NoCase }
        );

        let score = table.column("score").unwrap();
        assert_eq!(
            score.constraints[0].kind,
            ConstraintKind::Check { expression: "(score >= 0 AND (score < 100))".into() }
        );
        assert_eq!(
            score.constraints[1].kind,
            ConstraintKind::Default { value: DefaultValue::Number("-1.5e2".into()) }
        );

        let created = table.column("created").unwrap();
        assert_eq!(
            created.constraints[0].kind,
            ConstraintKind::Default { value: DefaultValue::Constant("CURRENT_TIMESTAMP".into()) }
        );

        let note = table.column("note").unwrap();
        assert_eq!(
            note.constraints[0].kind,
            ConstraintKind::Default { value: DefaultValue::Literal("'it''s'".into()) }
        );

        let flags = table.column("flags").unwrap();
        assert_eq!(
            flags.constraints[0].kind,
            ConstraintKind::Default { value: DefaultValue::Expression("(1 << 2)".into()) }
        );

        let kind = table.column("kind").unwrap();
        assert!(matches!(
            kind.constraints[0].kind,
            ConstraintKind::Default { value: DefaultValue::Identifier(_) }
        ));
    }

    #[test]
    fn test_multiword_datatypes() {
        let table = parse_table(
            "CREATE TABLE t (a UNSIGNED BIG INT, b VARCHAR(255) NOT NULL, c DECIMAL(10, 5))",
        )
        .unwrap();
        assert_eq!(table.column("a").unwrap().datatype.as_deref(), Some("UNSIGNED BIG INT"));
        assert_eq!(table.column("b").unwrap().datatype.as_deref(), Some("VARCHAR(255)"));
        assert_eq!(table.column("c").unwrap().datatype.as_deref(), Some("DECIMAL(10, 5)"));
    }

    #[test]
    fn test_foreign_key_clauses() {
        let table = parse_table(
            "CREATE TABLE posts (
                postid INTEGER PRIMARY KEY,
                userid INT REFERENCES users(userid) ON UPDATE CASCADE ON DELETE SET NULL DEFERRABLE INITIALLY DEFERRED,
                editor INT,
                FOREIGN KEY (editor) REFERENCES users(userid) NOT DEFERRABLE
            )",
        )
        .unwrap();
        let fk = table.foreign_key("userid").unwrap();
        assert_eq!(fk.clause.on_delete, Some(FkAction::SetNull));
        assert_eq!(fk.clause.on_update, Some(FkAction::Cascade));
        assert_eq!(fk.clause.deferred, Some(true));

        let fk = table.foreign_key("editor").unwrap();
        assert_eq!(fk.clause.deferred, Some(false));

        let plain = parse_table("CREATE TABLE p (a INT REFERENCES x(y) DEFERRABLE)").unwrap();
        assert_eq!(plain.foreign_key("a").unwrap().clause.deferred, Some(false));
        let none = parse_table("CREATE TABLE p (a INT REFERENCES x(y))").unwrap();
        assert_eq!(none.foreign_key("a").unwrap().clause.deferred, None);
    }

    #[test]
    fn test_duplicate_fk_actions_rejected() {
        let err = parse_table(
            "CREATE TABLE p (a INT REFERENCES x(y) ON DELETE CASCADE ON DELETE RESTRICT)",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_two_foreign_keys_on_one_column_rejected() {
        assert!(parse_table(
            "CREATE TABLE p (a INT REFERENCES x(y), FOREIGN KEY (a) REFERENCES z(w))"
        )
        .is_err());
        assert!(parse_table("CREATE TABLE p (a INT REFERENCES x(y) REFERENCES z(w))").is_err());
    }

    #[test]
    fn test_table_constraints() {
        let table = parse_table(
            "CREATE TABLE t (
                a INT, b TEXT,
                CONSTRAINT pk PRIMARY KEY (a, b DESC) ON CONFLICT ROLLBACK,
                UNIQUE (b COLLATE NOCASE),
                CHECK (a > 0)
            ) WITHOUT ROWID, STRICT",
        )
        .unwrap();
        assert_eq!(table.tableconstraints().len(), 3);
        assert!(table.without_rowid());
        assert!(table.strict());
        let pk = &table.tableconstraints()[0];
        assert_eq!(pk.name.as_ref().map(|n| n.name()), Some("pk"));
        assert_eq!(pk.to_string(), "CONSTRAINT pk PRIMARY KEY (a, b DESC) ON CONFLICT ROLLBACK");
    }

    #[test]
    fn test_comments_attach_to_column_or_table() {
        let table = parse_table(
            "CREATE TABLE t ( -- about the table
                a TEXT /* about a */,
                b INTEGER -- about b
            )",
        )
        .unwrap();
        assert_eq!(table.comments(), &[Comment::Line("-- about the table".into())]);
        assert_eq!(
            table.column("a").unwrap().comments,
            vec![Comment::Multiline("/* about a */".into())]
        );
        assert_eq!(
            table.column("b").unwrap().comments,
            vec![Comment::Line("-- about b".into())]
        );
    }

    #[test]
    fn test_parse_errors_name_offending_text() {
        let err = parse_table("CREATE TABLE t (a TEXT NOT NULL BOGUS)").unwrap_err();
        match err {
            Error::Parse { near, .. } => assert!(near.starts_with("BOGUS")),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(parse_table("CREATE TABLE t (a TEXT").is_err());
        assert!(parse_table("CREATE TABLE t ()").is_err());
        assert!(parse_table("CREATE TABLE t (a, a)").is_err());
        assert!(parse_table("CREATE TABLE t (a ON CONFLICT FAIL)").is_err());
        assert!(parse_table("CREATE TABLE t (a COLLATE KLINGON)").is_err());
        assert!(parse_table("CREATE TABLE t (a, UNIQUE (b))").is_err());
        assert!(parse_table("CREATE TABLE t (a INT GENERATED ALWAYS AS (1))").is_err());
        assert!(parse_table("CREATE INDEX i ON t(a)").is_err());
        assert!(parse_table("CREATE TABLE t (a) garbage").is_err());
    }

    #[test]
    fn test_create_table_as_select() {
        let table = parse_table("CREATE TABLE copy AS SELECT a, b FROM t").unwrap();
        assert!(table.columns().is_empty());
        assert!(table.select().is_some());
    }

    #[test]
    fn test_view() {
        let view = parse_view("CREATE VIEW IF NOT EXISTS v (x, y) AS SELECT a, b FROM t;").unwrap();
        assert!(view.if_not_exists);
        assert_eq!(view.name(), "v");
        let names: Vec<_> = view.column_names.unwrap().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(!view.select.is_compound());
    }

    #[test]
    fn test_virtual_tables() {
        let vt = parse_virtual_table(
            "CREATE VIRTUAL TABLE docs USING fts4(title, body TEXT, tokenize=porter)",
        )
        .unwrap();
        assert_eq!(vt.module.name(), "fts4");
        assert_eq!(vt.columns.keys().collect::<Vec<_>>(), vec!["title", "body"]);
        assert_eq!(vt.options, vec!["tokenize=porter"]);

        let vt = parse_virtual_table("CREATE VIRTUAL TABLE IF NOT EXISTS r USING rtree(id, minx, maxx)")
            .unwrap();
        assert!(vt.if_not_exists);
        assert_eq!(vt.args.as_deref(), Some("id, minx, maxx"));
        assert!(vt.columns.is_empty());

        let vt = parse_virtual_table("CREATE VIRTUAL TABLE x USING custom").unwrap();
        assert_eq!(vt.args, None);
    }

    #[test]
    fn test_round_trip_through_constructor() {
        let sources = [
            "CREATE TABLE a (name TEXT)",
            "CREATE TABLE users (userid INTEGER PRIMARY KEY, fname TEXT)",
            "CREATE TABLE posts (postid INTEGER PRIMARY KEY, userid INT REFERENCES users(userid), post BLOB)",
            "CREATE TABLE t (a INT NOT NULL DEFAULT 0, b TEXT COLLATE RTRIM, CONSTRAINT c CHECK (a < 10), FOREIGN KEY (a) REFERENCES o(x) ON DELETE CASCADE)",
        ];
        for source in sources {
            let table = parse_table(source).unwrap();
            let rebuilt = table.to_constructor().to_table().unwrap();
            assert_eq!(rebuilt, table, "{}", source);
        }
    }
}
