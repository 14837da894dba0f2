//! A hand-rolled recognizer for the small SQL subset the in-memory backend
//! understands: `CREATE TABLE`, `INSERT`, `SELECT`, `UPDATE`, `DELETE`, each
//! with an optional single-column `WHERE col = <value>` clause.
//!
//! This is reference/test scaffolding, not a SQL engine: it exists so the
//! frontend pipeline (dialect selection, bind-by-name rewriting, the
//! statement/rowset/transaction API) has something real to execute against
//! in this repository's own test suite, the same role a `dummy` backend
//! plays for an FFI-driven crate that otherwise needs a live database.

use edba::error::{Error, Result};

use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Literal {
    Placeholder,
    Null,
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone)]
pub struct WhereClause {
    pub column: String,
    pub value: Literal,
}

#[derive(Debug, Clone)]
pub enum Statement {
    CreateTable {
        table: String,
        columns: Vec<String>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Literal>,
    },
    Select {
        table: String,
        columns: Vec<String>,
        filter: Option<WhereClause>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Literal)>,
        filter: Option<WhereClause>,
    },
    Delete {
        table: String,
        filter: Option<WhereClause>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(String),
    Placeholder,
    Punct(char),
}

fn tokenize(sql: &str) -> Result<Vec<Token>> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
        } else if c == '\'' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end] != b'\'' {
                end += 1;
            }
            if end >= bytes.len() {
                return Err(Error::edba_error("unterminated string literal"));
            }
            out.push(Token::Str(sql[start..end].to_string()));
            i = end + 1;
        } else if c == '?' {
            out.push(Token::Placeholder);
            i += 1;
        } else if c == '(' || c == ')' || c == ',' || c == '=' || c == ';' || c == '*' {
            out.push(Token::Punct(c));
            i += 1;
        } else if c.is_ascii_digit() || (c == '-' && i + 1 < bytes.len() && (bytes[i + 1] as char).is_ascii_digit()) {
            let start = i;
            i += 1;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            out.push(Token::Num(sql[start..i].to_string()));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push(Token::Ident(sql[start..i].to_string()));
        } else {
            return Err(Error::edba_error(format!("unexpected character '{c}' in SQL")));
        }
    }
    Ok(out)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let t = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| Error::edba_error("unexpected end of SQL"))?;
        self.pos += 1;
        Ok(t)
    }

    fn expect_ident(&mut self, word: &str) -> Result<()> {
        match self.next()? {
            Token::Ident(i) if i.eq_ignore_ascii_case(word) => Ok(()),
            other => Err(Error::edba_error(format!(
                "expected '{word}', found {other:?}"
            ))),
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(i) => Ok(i),
            other => Err(Error::edba_error(format!("expected identifier, found {other:?}"))),
        }
    }

    fn punct(&mut self, c: char) -> Result<()> {
        match self.next()? {
            Token::Punct(p) if p == c => Ok(()),
            other => Err(Error::edba_error(format!("expected '{c}', found {other:?}"))),
        }
    }

    fn peek_is_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(i)) if i.eq_ignore_ascii_case(word))
    }

    fn literal(&mut self) -> Result<Literal> {
        match self.next()? {
            Token::Placeholder => Ok(Literal::Placeholder),
            Token::Num(n) => n
                .parse()
                .map(Literal::Int)
                .map_err(|_| Error::edba_error(format!("'{n}' is not an integer literal"))),
            Token::Str(s) => Ok(Literal::Str(s)),
            Token::Ident(i) if i.eq_ignore_ascii_case("null") => Ok(Literal::Null),
            other => Err(Error::edba_error(format!("expected a value, found {other:?}"))),
        }
    }

    /// Comma-separated identifiers inside `( ... )`.
    fn paren_ident_list(&mut self) -> Result<Vec<String>> {
        self.punct('(')?;
        let mut names = Vec::new();
        loop {
            names.push(self.ident()?);
            // Skip an optional type name, e.g. `id integer`.
            if matches!(self.peek(), Some(Token::Ident(_))) {
                self.ident()?;
            }
            match self.next()? {
                Token::Punct(',') => continue,
                Token::Punct(')') => break,
                other => return Err(Error::edba_error(format!("expected ',' or ')', found {other:?}"))),
            }
        }
        Ok(names)
    }

    fn where_clause(&mut self) -> Result<Option<WhereClause>> {
        if !self.peek_is_ident("where") {
            return Ok(None);
        }
        self.next()?;
        let column = self.ident()?;
        self.punct('=')?;
        let value = self.literal()?;
        Ok(Some(WhereClause { column, value }))
    }

    fn create_table(&mut self) -> Result<Statement> {
        self.expect_ident("create")?;
        self.expect_ident("table")?;
        let table = self.ident()?;
        let columns = self.paren_ident_list()?;
        Ok(Statement::CreateTable { table, columns })
    }

    fn insert(&mut self) -> Result<Statement> {
        self.expect_ident("insert")?;
        self.expect_ident("into")?;
        let table = self.ident()?;
        let columns = self.paren_ident_list()?;
        self.expect_ident("values")?;
        self.punct('(')?;
        let mut values = Vec::new();
        loop {
            values.push(self.literal()?);
            match self.next()? {
                Token::Punct(',') => continue,
                Token::Punct(')') => break,
                other => return Err(Error::edba_error(format!("expected ',' or ')', found {other:?}"))),
            }
        }
        if values.len() != columns.len() {
            return Err(Error::edba_error(
                "insert column list and values list have different lengths",
            ));
        }
        Ok(Statement::Insert { table, columns, values })
    }

    fn select(&mut self) -> Result<Statement> {
        self.expect_ident("select")?;
        let mut columns = Vec::new();
        if matches!(self.peek(), Some(Token::Punct('*'))) {
            self.next()?;
        } else {
            loop {
                columns.push(self.ident()?);
                if matches!(self.peek(), Some(Token::Punct(','))) {
                    self.next()?;
                    continue;
                }
                break;
            }
        }
        self.expect_ident("from")?;
        let table = self.ident()?;
        let filter = self.where_clause()?;
        Ok(Statement::Select { table, columns, filter })
    }

    fn update(&mut self) -> Result<Statement> {
        self.expect_ident("update")?;
        let table = self.ident()?;
        self.expect_ident("set")?;
        let mut assignments = Vec::new();
        loop {
            let col = self.ident()?;
            self.punct('=')?;
            let val = self.literal()?;
            assignments.push((col, val));
            if matches!(self.peek(), Some(Token::Punct(','))) {
                self.next()?;
                continue;
            }
            break;
        }
        let filter = self.where_clause()?;
        Ok(Statement::Update { table, assignments, filter })
    }

    fn delete(&mut self) -> Result<Statement> {
        self.expect_ident("delete")?;
        self.expect_ident("from")?;
        let table = self.ident()?;
        let filter = self.where_clause()?;
        Ok(Statement::Delete { table, filter })
    }
}

/// Parses one SQL statement (no trailing `;` expected — batches are split by
/// the caller before reaching this).
pub fn parse(sql: &str) -> Result<Statement> {
    let sql = sql.trim().trim_end_matches(';').trim();
    let tokens = tokenize(sql)?;
    let mut p = Parser { tokens, pos: 0 };
    let stmt = match p.peek() {
        Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("create") => p.create_table()?,
        Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("insert") => p.insert()?,
        Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("select") => p.select()?,
        Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("update") => p.update()?,
        Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("delete") => p.delete()?,
        other => return Err(Error::edba_error(format!("unsupported SQL statement: {other:?}"))),
    };
    if p.pos != p.tokens.len() {
        return Err(Error::edba_error("trailing tokens after statement"));
    }
    Ok(stmt)
}

impl Literal {
    /// Resolves a literal against the statement's positional bind table,
    /// consuming the next bound value when it is a placeholder.
    pub fn resolve(&self, bound: &mut std::slice::Iter<'_, Value>) -> Result<Value> {
        match self {
            Literal::Placeholder => bound
                .next()
                .cloned()
                .ok_or_else(|| Error::edba_error("not enough bound values for placeholders")),
            Literal::Null => Ok(Value::Null),
            Literal::Int(n) => Ok(Value::Int(*n)),
            Literal::Str(s) => Ok(Value::Str(s.clone())),
        }
    }
}
