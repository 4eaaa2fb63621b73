//! SQL statement validation for read-only enforcement.
//!
//! The `query` tool only runs statements that pass this gate. The gate is a
//! syntactic heuristic over the statement text, not a SQL parser:
//!
//! 1. **Prefix**: after trimming, the leading word must be `SELECT` or `WITH`.
//! 2. **Forbidden keyword**: no whole-word occurrence of a write or
//!    administrative keyword anywhere in the text (`created_at` is fine,
//!    `CREATE` is not).
//! 3. **Single statement**: no `;` followed by more SQL. The text is
//!    tokenized with `sqlparser`'s SQLite dialect, so separators inside
//!    literals, quoted identifiers, and comments don't count.
//!
//! Rules are checked in that order and the first failure is reported. The
//! statement that gets executed is always the caller's original text; the
//! trimmed, case-folded view exists only for inspection.
//!
//! Statements can still reach write semantics without a banned keyword, so
//! the connection itself is opened read-only (see [`crate::db::pool`]).

use crate::error::{DbError, DbResult};
use regex::{Regex, RegexBuilder};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::fmt;
use std::sync::LazyLock;

/// Leading keywords a statement may start with.
pub const ALLOWED_PREFIXES: &[&str] = &["SELECT", "WITH"];

/// Keywords that must not appear as whole words anywhere in a query.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "REPLACE", "ATTACH", "DETACH",
    "PRAGMA", "VACUUM", "TRUNCATE", "REINDEX",
];

static FORBIDDEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = FORBIDDEN_KEYWORDS.join("|");
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
        .case_insensitive(true)
        .build()
        .expect("forbidden keyword pattern is a fixed, valid regex")
});

/// Why the gate refused a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The statement does not start with an allowed keyword (includes empty input).
    Prefix { found: Option<String> },
    /// A write or administrative keyword appears as a whole word.
    ForbiddenKeyword { keyword: String },
    /// More SQL follows a statement separator.
    MultipleStatements,
    /// The text could not be tokenized (unterminated literal or comment).
    Unreadable { reason: String },
}

impl Rejection {
    /// Short machine-friendly name of the violated rule.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Prefix { .. } => "prefix",
            Self::ForbiddenKeyword { .. } => "forbidden_keyword",
            Self::MultipleStatements | Self::Unreadable { .. } => "single_statement",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix { found: None } => write!(
                f,
                "Only SELECT queries are allowed. Query must start with SELECT or WITH, but it is empty."
            ),
            Self::Prefix { found: Some(word) } => write!(
                f,
                "Only SELECT queries are allowed. Query must start with SELECT or WITH, not '{}'.",
                word
            ),
            Self::ForbiddenKeyword { keyword } => write!(
                f,
                "Query contains forbidden keyword: {}. Only read-only queries are allowed.",
                keyword
            ),
            Self::MultipleStatements => write!(
                f,
                "Multiple statements are not allowed. Send one query per call."
            ),
            Self::Unreadable { reason } => write!(
                f,
                "Query could not be read as a single statement: {}.",
                reason
            ),
        }
    }
}

impl From<Rejection> for DbError {
    fn from(rejection: Rejection) -> Self {
        DbError::validation(rejection.rule(), rejection.to_string())
    }
}

/// Inspect `sql` and decide whether it may run on the read-only query path.
///
/// Pure function of its input: no I/O, no shared state, same verdict every call.
///
/// # Examples
///
/// ```
/// use sqlite_mcp_server::tools::sql_validator::{check, Rejection};
///
/// assert!(check("  select id from deals").is_ok());
/// assert_eq!(
///     check("SELECT * FROM users; DELETE FROM users"),
///     Err(Rejection::ForbiddenKeyword { keyword: "DELETE".to_string() })
/// );
/// ```
pub fn check(sql: &str) -> Result<(), Rejection> {
    let trimmed = sql.trim();

    let leading = leading_word(trimmed);
    if !ALLOWED_PREFIXES
        .iter()
        .any(|prefix| prefix.eq_ignore_ascii_case(leading))
    {
        let found = if trimmed.is_empty() {
            None
        } else if leading.is_empty() {
            trimmed.chars().next().map(String::from)
        } else {
            Some(leading.to_string())
        };
        return Err(Rejection::Prefix { found });
    }

    if let Some(m) = FORBIDDEN_PATTERN.find(trimmed) {
        return Err(Rejection::ForbiddenKeyword {
            keyword: m.as_str().to_uppercase(),
        });
    }

    ensure_single_statement(trimmed)
}

/// Validate SQL for read-only execution in the query tool.
///
/// Returns `Err(DbError::Validation)` naming the violated rule.
pub fn validate_readonly(sql: &str) -> DbResult<()> {
    check(sql).map_err(DbError::from)
}

/// The maximal run of identifier characters at the start of `s`.
fn leading_word(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, c)| !is_word_char(*c))
        .map(|(idx, _)| idx)
        .unwrap_or(s.len());
    &s[..end]
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Reject text where a `;` is followed by any token other than whitespace or a comment.
fn ensure_single_statement(sql: &str) -> Result<(), Rejection> {
    let dialect = SQLiteDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| Rejection::Unreadable {
            reason: e.to_string(),
        })?;

    let mut after_separator = false;
    for token in &tokens {
        match token {
            Token::SemiColon => after_separator = true,
            Token::Whitespace(_) | Token::EOF => {}
            _ if after_separator => return Err(Rejection::MultipleStatements),
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Prefix rule
    // =========================================================================

    #[test]
    fn test_select_admitted() {
        assert!(check("SELECT * FROM users").is_ok());
    }

    #[test]
    fn test_leading_whitespace_and_lowercase_admitted() {
        assert!(check("  select id from deals").is_ok());
    }

    #[test]
    fn test_cte_admitted() {
        let sql = "WITH won AS (SELECT * FROM deals WHERE stage = 'Closed Won') SELECT COUNT(*) FROM won";
        assert!(check(sql).is_ok());
    }

    #[test]
    fn test_select_star_without_space_admitted() {
        assert!(check("SELECT*FROM users").is_ok());
    }

    #[test]
    fn test_empty_rejected_by_prefix() {
        assert_eq!(check(""), Err(Rejection::Prefix { found: None }));
        assert_eq!(check(" \n\t "), Err(Rejection::Prefix { found: None }));
    }

    #[test]
    fn test_drop_rejected_by_prefix() {
        let err = check("DROP TABLE users").unwrap_err();
        assert_eq!(
            err,
            Rejection::Prefix {
                found: Some("DROP".to_string())
            }
        );
        assert_eq!(err.rule(), "prefix");
        assert!(err.to_string().contains("must start with SELECT or WITH"));
    }

    #[test]
    fn test_word_that_merely_starts_with_select_rejected() {
        assert!(matches!(
            check("SELECTED FROM users"),
            Err(Rejection::Prefix { .. })
        ));
    }

    #[test]
    fn test_leading_punctuation_rejected() {
        let err = check("(SELECT 1)").unwrap_err();
        assert_eq!(
            err,
            Rejection::Prefix {
                found: Some("(".to_string())
            }
        );
    }

    #[test]
    fn test_leading_comment_rejected() {
        assert!(matches!(
            check("-- count\nSELECT 1"),
            Err(Rejection::Prefix { .. })
        ));
    }

    // =========================================================================
    // Forbidden keyword rule
    // =========================================================================

    #[test]
    fn test_chained_delete_names_keyword() {
        let err = check("SELECT * FROM users; DELETE FROM users").unwrap_err();
        assert_eq!(
            err,
            Rejection::ForbiddenKeyword {
                keyword: "DELETE".to_string()
            }
        );
        assert!(err.to_string().contains("DELETE"));
    }

    #[test]
    fn test_every_forbidden_keyword_is_caught() {
        for keyword in FORBIDDEN_KEYWORDS {
            let sql = format!("SELECT 1 FROM t WHERE x = 1 {} y", keyword.to_lowercase());
            assert_eq!(
                check(&sql),
                Err(Rejection::ForbiddenKeyword {
                    keyword: keyword.to_string()
                }),
                "expected {} to be rejected",
                keyword
            );
        }
    }

    #[test]
    fn test_identifiers_containing_keywords_admitted() {
        assert!(check("SELECT created_at, updated_by FROM users").is_ok());
        assert!(check("SELECT dropdown_count FROM widgets").is_ok());
        assert!(check("SELECT * FROM deleted_items").is_ok());
        assert!(check("SELECT replacement FROM parts").is_ok());
    }

    #[test]
    fn test_reports_first_keyword_by_position() {
        let err = check("WITH x AS (SELECT 1) SELECT * FROM x; UPDATE t SET a = 1; DROP TABLE t")
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::ForbiddenKeyword {
                keyword: "UPDATE".to_string()
            }
        );
    }

    #[test]
    fn test_keyword_inside_literal_still_rejected() {
        // Known limitation of a keyword search
        assert!(matches!(
            check("SELECT * FROM notes WHERE body = 'please update me'"),
            Err(Rejection::ForbiddenKeyword { .. })
        ));
    }

    #[test]
    fn test_replace_function_rejected() {
        assert_eq!(
            check("SELECT replace(name, 'a', 'b') FROM users"),
            Err(Rejection::ForbiddenKeyword {
                keyword: "REPLACE".to_string()
            })
        );
    }

    // =========================================================================
    // Single statement rule
    // =========================================================================

    #[test]
    fn test_trailing_semicolon_admitted() {
        assert!(check("SELECT 1;").is_ok());
        assert!(check("SELECT 1;  \n").is_ok());
    }

    #[test]
    fn test_two_selects_rejected() {
        assert_eq!(
            check("SELECT 1; SELECT 2"),
            Err(Rejection::MultipleStatements)
        );
    }

    #[test]
    fn test_semicolon_inside_quotes_admitted() {
        assert!(check("SELECT 'a;b' AS s").is_ok());
        assert!(check("SELECT \"odd;name\" FROM t").is_ok());
        assert!(check("SELECT [x;y] FROM t").is_ok());
        assert!(check("SELECT `x;y` FROM t").is_ok());
    }

    #[test]
    fn test_quote_inside_comment_does_not_hide_separator() {
        assert_eq!(
            check("SELECT 1 AS a -- it's\n; SELECT 2 AS b"),
            Err(Rejection::MultipleStatements)
        );
        assert_eq!(
            check("SELECT 1 /* ' */; SELECT 2 /* ' */"),
            Err(Rejection::MultipleStatements)
        );
    }

    #[test]
    fn test_semicolon_inside_comment_admitted() {
        assert!(check("SELECT 1 -- note; see docs\n").is_ok());
        assert!(check("SELECT 1 /* a; b */ AS n").is_ok());
        assert!(check("SELECT 1; -- trailing note\n").is_ok());
    }

    #[test]
    fn test_unterminated_literal_rejected() {
        let err = check("SELECT 'open; SELECT 2").unwrap_err();
        assert!(matches!(err, Rejection::Unreadable { .. }));
        assert_eq!(err.rule(), "single_statement");
    }

    #[test]
    fn test_escaped_quote_does_not_hide_separator() {
        assert!(check("SELECT 'it''s'; SELECT 2").is_err());
        assert!(check("SELECT 'it''s;fine'").is_ok());
    }

    // =========================================================================
    // Purity / wrapper
    // =========================================================================

    #[test]
    fn test_check_is_idempotent() {
        for sql in ["SELECT 1", "DROP TABLE t", "SELECT 1; DELETE FROM t", ""] {
            assert_eq!(check(sql), check(sql));
        }
    }

    #[test]
    fn test_validate_readonly_maps_to_validation_error() {
        let err = validate_readonly("VACUUM").unwrap_err();
        assert!(matches!(err, DbError::Validation { rule: "prefix", .. }));

        let err = validate_readonly("SELECT 1; VACUUM").unwrap_err();
        match err {
            DbError::Validation { rule, reason } => {
                assert_eq!(rule, "forbidden_keyword");
                assert!(reason.contains("VACUUM"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
