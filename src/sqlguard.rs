// Copyright (C) 2025 Nuwaira
// All Rights Reserved.
//
// NOTICE: All information contained herein is, and remains
// the property of Nuwaira.
// The intellectual and technical concepts contained
// herein are proprietary to Nuwaira
// and are protected by trade secret or copyright law.
// Dissemination of this information or reproduction of this material
// is strictly forbidden unless prior written permission is obtained
// from Nuwaira.

//! Read-only statement guard.
//!
//! A conservative allow-list, not a SQL parser. It looks at the leading keyword
//! and refuses anything that could carry a second statement. It keeps
//! well-behaved clients from writing by accident; it is not a security boundary
//! against someone who already controls the SQL text.

use std::fmt;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Show,
    Describe,
    Explain,
}

impl StatementKind {
    pub const ALLOWED: [StatementKind; 4] = [
        StatementKind::Select,
        StatementKind::Show,
        StatementKind::Describe,
        StatementKind::Explain,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Show => "SHOW",
            StatementKind::Describe => "DESCRIBE",
            StatementKind::Explain => "EXPLAIN",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        Self::ALLOWED
            .iter()
            .copied()
            .find(|k| k.keyword().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A statement that passed the guard, ready to send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOnlyStatement {
    pub kind: StatementKind,
    /// Statement text with surrounding whitespace trimmed.
    pub sql: String,
}

pub fn validate(sql: &str) -> DbResult<ReadOnlyStatement> {
    check_separators(sql)?;

    let start = skip_trivia(sql, 0).map_err(reject)?;
    if start >= sql.len() {
        return Err(reject("empty statement"));
    }
    if sql[start..].starts_with("/*!") {
        return Err(reject("statement must not start with an executable comment"));
    }

    let word_end = sql[start..]
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .map_or(sql.len(), |n| start + n);
    let word = &sql[start..word_end];
    let kind = StatementKind::from_keyword(word).ok_or_else(|| {
        if word.is_empty() {
            reject("statement has no leading keyword")
        } else {
            reject(format!(
                "only SELECT, SHOW, DESCRIBE and EXPLAIN statements are allowed, got '{}'",
                word
            ))
        }
    })?;

    Ok(ReadOnlyStatement {
        kind,
        sql: sql[start..].trim_end().to_string(),
    })
}

fn reject(msg: impl Into<String>) -> DbError {
    DbError::WriteStatementRejected(msg.into())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Quoted(u8),
    LineComment,
    BlockComment,
}

/// Walk the whole text and fail on any `;` that is not inside a `'...'` or
/// `"..."` string literal. Comments and backtick identifiers get no exemption.
fn check_separators(sql: &str) -> DbResult<()> {
    let bytes = sql.as_bytes();
    let mut state = Scan::Code;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            Scan::Code => match b {
                b'\'' | b'"' | b'`' => state = Scan::Quoted(b),
                b'#' => state = Scan::LineComment,
                b'-' if is_dash_comment(bytes, i) => {
                    state = Scan::LineComment;
                    i += 1;
                }
                // `/*!...*/` and `/*+...*/` are run by the server, so their
                // body is scanned as code
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    if !matches!(bytes.get(i + 2), Some(b'!') | Some(b'+')) {
                        state = Scan::BlockComment;
                    }
                    i += 1;
                }
                b';' => return Err(reject("statement separators are not allowed")),
                _ => {}
            },
            Scan::Quoted(b'`') => match b {
                b'`' => state = Scan::Code,
                b';' => return Err(reject("statement separators are not allowed")),
                _ => {}
            },
            Scan::Quoted(q) => {
                if b == b'\\' {
                    // under NO_BACKSLASH_ESCAPES `\'` ends the literal, so where
                    // the string stops would depend on the server's sql_mode
                    if bytes.get(i + 1) == Some(&q) {
                        return Err(reject(
                            "backslash-escaped quotes are ambiguous, double the quote instead",
                        ));
                    }
                    i += 1;
                } else if b == q {
                    state = Scan::Code;
                }
            }
            Scan::LineComment => match b {
                b'\n' => state = Scan::Code,
                b';' => return Err(reject("statement separators are not allowed")),
                _ => {}
            },
            Scan::BlockComment => match b {
                b'*' if bytes.get(i + 1) == Some(&b'/') => {
                    state = Scan::Code;
                    i += 1;
                }
                b';' => return Err(reject("statement separators are not allowed")),
                _ => {}
            },
        }
        i += 1;
    }

    match state {
        Scan::Quoted(_) => Err(reject("unterminated quoted string")),
        Scan::BlockComment => Err(reject("unterminated comment")),
        _ => Ok(()),
    }
}

/// `--` only opens a comment when followed by whitespace or end of input.
fn is_dash_comment(bytes: &[u8], i: usize) -> bool {
    bytes.get(i + 1) == Some(&b'-')
        && bytes
            .get(i + 2)
            .map_or(true, |c| c.is_ascii_whitespace() || c.is_ascii_control())
}

/// Skip whitespace and plain comments starting at `from`, returning the index
/// of the first significant byte (or `sql.len()`).
fn skip_trivia(sql: &str, from: usize) -> Result<usize, &'static str> {
    let bytes = sql.as_bytes();
    let mut i = from;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return Ok(i);
        }
        if bytes[i] == b'#' || (bytes[i] == b'-' && is_dash_comment(bytes, i)) {
            match sql[i..].find('\n') {
                Some(n) => i += n + 1,
                None => return Ok(bytes.len()),
            }
        } else if sql[i..].starts_with("/*") && !sql[i..].starts_with("/*!") {
            match sql[i + 2..].find("*/") {
                Some(n) => i += n + 4,
                None => return Err("unterminated comment"),
            }
        } else {
            return Ok(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rejected(sql: &str) {
        match validate(sql) {
            Err(DbError::WriteStatementRejected(_)) => {}
            other => panic!("expected rejection for {:?}, got {:?}", sql, other),
        }
    }

    #[test]
    fn test_allowed_keywords() {
        let cases = vec![
            ("SELECT 1", StatementKind::Select),
            ("select * from users", StatementKind::Select),
            ("  \n\tShow tables", StatementKind::Show),
            ("DESCRIBE users", StatementKind::Describe),
            ("explain select * from t", StatementKind::Explain),
            ("SELECT*FROM t", StatementKind::Select),
            ("-- note\nSELECT 1", StatementKind::Select),
            ("/* hi */ SELECT 1", StatementKind::Select),
            ("# hash comment\nshow databases", StatementKind::Show),
        ];
        for (sql, kind) in cases {
            let stmt = validate(sql).unwrap_or_else(|e| panic!("{:?}: {}", sql, e));
            assert_eq!(stmt.kind, kind, "{}", sql);
        }
    }

    #[test]
    fn test_write_statements_rejected() {
        for sql in [
            "DELETE FROM users",
            "insert into t values (1)",
            "UPDATE t SET a = 1",
            "DROP TABLE users",
            "CREATE TABLE x (id int)",
            "TRUNCATE t",
            "CALL proc()",
            "SET @a = 1",
            "WITH x AS (SELECT 1) SELECT * FROM x",
            "SELECTED 1",
            "DESC users",
            "(SELECT 1)",
            "",
            "   ",
            "-- only a comment",
            "/*!SELECT 1*/",
        ] {
            assert_rejected(sql);
        }
    }

    #[test]
    fn test_statement_stacking_rejected() {
        for sql in [
            "SELECT 1; DROP TABLE users",
            "SELECT 1;DROP TABLE users",
            "SELECT 1; -- trailing\n DELETE FROM t",
            "SELECT 1;;",
            "SELECT 1 /*! ; DROP TABLE users */",
            "SELECT 'a'; DELETE FROM t",
            "SELECT \"it's\"; DELETE FROM t",
        ] {
            assert_rejected(sql);
        }
    }

    #[test]
    fn test_separator_inside_literals_allowed() {
        let ok = vec![
            "SELECT ';' AS semi",
            "SELECT \"a;b\"",
            "SELECT 'it''s; fine'",
            "SELECT 'c:\\\\dir;x'",
            "SELECT 1 -- plain comment",
        ];
        for sql in ok {
            assert!(validate(sql).is_ok(), "{}", sql);
        }
    }

    #[test]
    fn test_trailing_separator_rejected() {
        assert_rejected("SELECT 1;");
        assert_rejected("  SELECT 1 ;  \n");
        assert_rejected("SELECT 1 -- ;");
    }

    #[test]
    fn test_separator_outside_string_literal_rejected() {
        for sql in [
            "SELECT 1 -- comment; with separator",
            "SELECT 1 # comment; too",
            "SELECT /* ; */ 1",
            "/* ; */ SELECT 1",
            "-- ;\nSELECT 1",
            "SELECT `odd;name` FROM t",
        ] {
            assert_rejected(sql);
        }
    }

    #[test]
    fn test_backslash_quote_rejected() {
        // would end at `a\'` on a server running NO_BACKSLASH_ESCAPES
        assert_rejected("SELECT 'a\\'; DROP TABLE users; -- '");
        assert_rejected("SELECT 'escaped \\'; still string'");
        assert_rejected("SELECT \"a\\\"b\"");
    }

    #[test]
    fn test_unterminated_input_rejected() {
        assert_rejected("SELECT 'open");
        assert_rejected("SELECT 1 /* open");
        assert_rejected("/* open SELECT 1");
    }

    #[test]
    fn test_double_dash_without_space_is_code() {
        // `1--1` is arithmetic, so the `;` after it is a real separator
        assert_rejected("SELECT 1--1; DROP TABLE t");
    }

    #[test]
    fn test_sql_is_trimmed() {
        let stmt = validate("\n  SELECT 1  \n").unwrap();
        assert_eq!(stmt.sql, "SELECT 1");
    }
}
