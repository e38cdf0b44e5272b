//! Statement Classification and Splitting
//!
//! Execution dispatch needs two pure text-level facts about a SQL string:
//! which protocol to run it under (rows, CTE probe, or write), and where the
//! statement boundaries are in a multi-statement blob.
//!
//! Classification is a case-insensitive prefix check on the trimmed text, so
//! space-less but valid SQL such as `SELECT*FROM t` still routes to the
//! result-set protocol. Splitting tracks quote and comment state so that
//! semicolons inside string literals, quoted identifiers, or comments never
//! terminate a statement.

use serde::{Deserialize, Serialize};

/// Execution category of a single SQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementCategory {
    /// `SELECT ...` — executes and fetches a result set
    Select,
    /// `WITH ...` — may read or write; resolved after execution
    Cte,
    /// Everything else: INSERT/UPDATE/DELETE/DDL/utility statements
    Mutating,
}

/// Classify a raw SQL statement by its leading text.
///
/// The category comes from a case-insensitive prefix check on the trimmed
/// text (`SELECT...` reads, `WITH...` is a CTE, everything else mutates);
/// the returned string is the canonicalized (upper-cased) first token, kept
/// for reporting. Pure and total: the empty string classifies as `Mutating`
/// with an empty keyword, which the dispatcher rejects before connecting.
#[must_use]
pub fn classify(sql: &str) -> (StatementCategory, String) {
    let trimmed = sql.trim_start();
    let keyword: String = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase();

    let upper = trimmed.to_uppercase();
    let category = if upper.starts_with("SELECT") {
        StatementCategory::Select
    } else if upper.starts_with("WITH") {
        StatementCategory::Cte
    } else {
        StatementCategory::Mutating
    };

    (category, keyword)
}

/// Split a multi-statement SQL blob on statement-terminating semicolons.
///
/// The tokenizer tracks:
/// - single-quoted strings with backslash escapes and doubled quotes,
/// - double-quoted strings with the same escapes,
/// - backtick-quoted identifiers,
/// - `--` and `#` line comments, `/* ... */` block comments.
///
/// Semicolons inside any of those never split. Fragments that are empty
/// after trimming are dropped.
#[must_use]
pub fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = SplitState::Normal;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            SplitState::Normal => match ch {
                ';' => {
                    push_fragment(&mut statements, &mut current);
                    continue;
                }
                '\'' => state = SplitState::Quoted('\''),
                '"' => state = SplitState::Quoted('"'),
                '`' => state = SplitState::Backtick,
                '#' => state = SplitState::LineComment,
                '-' if chars.peek() == Some(&'-') => {
                    current.push(ch);
                    current.push(chars.next().unwrap_or('-'));
                    state = SplitState::LineComment;
                    continue;
                }
                '/' if chars.peek() == Some(&'*') => {
                    current.push(ch);
                    current.push(chars.next().unwrap_or('*'));
                    state = SplitState::BlockComment;
                    continue;
                }
                _ => {}
            },
            SplitState::Quoted(quote) => {
                if ch == '\\' {
                    current.push(ch);
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                    continue;
                }
                if ch == quote {
                    // A doubled quote is an escaped quote, not a terminator
                    if chars.peek() == Some(&quote) {
                        current.push(ch);
                        current.push(chars.next().unwrap_or(quote));
                        continue;
                    }
                    state = SplitState::Normal;
                }
            }
            SplitState::Backtick => {
                if ch == '`' {
                    state = SplitState::Normal;
                }
            }
            SplitState::LineComment => {
                if ch == '\n' {
                    state = SplitState::Normal;
                }
            }
            SplitState::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    current.push(ch);
                    current.push(chars.next().unwrap_or('/'));
                    state = SplitState::Normal;
                    continue;
                }
            }
        }
        current.push(ch);
    }

    push_fragment(&mut statements, &mut current);
    statements
}

#[derive(Clone, Copy)]
enum SplitState {
    Normal,
    Quoted(char),
    Backtick,
    LineComment,
    BlockComment,
}

fn push_fragment(statements: &mut Vec<String>, current: &mut String) {
    let fragment = current.trim();
    if !fragment.is_empty() {
        statements.push(fragment.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_select_any_case() {
        assert_eq!(classify("SELECT 1").0, StatementCategory::Select);
        assert_eq!(classify("  select * from t"), (StatementCategory::Select, "SELECT".into()));
        assert_eq!(classify("\n\tSeLeCt id FROM users").0, StatementCategory::Select);
    }

    #[test]
    fn test_classify_with_is_cte() {
        let (category, keyword) = classify("WITH cte AS (SELECT 1) SELECT * FROM cte");
        assert_eq!(category, StatementCategory::Cte);
        assert_eq!(keyword, "WITH");
        assert_eq!(classify("with x as (select 1) delete from t").0, StatementCategory::Cte);
    }

    #[test]
    fn test_classify_everything_else_is_mutating() {
        for sql in [
            "INSERT INTO t VALUES (1)",
            "update t set a = 1",
            "DELETE FROM t",
            "CREATE TABLE t (id INT)",
            "DROP TABLE t",
            "SHOW TABLES",
        ] {
            assert_eq!(classify(sql).0, StatementCategory::Mutating, "{sql}");
        }
    }

    #[test]
    fn test_classify_empty_string() {
        let (category, keyword) = classify("");
        assert_eq!(category, StatementCategory::Mutating);
        assert_eq!(keyword, "");

        let (category, keyword) = classify("   \n\t ");
        assert_eq!(category, StatementCategory::Mutating);
        assert_eq!(keyword, "");
    }

    #[test]
    fn test_classify_is_a_prefix_check() {
        // MySQL accepts space-less forms; they must still route to the
        // result-set protocol
        let (category, keyword) = classify("SELECT*FROM t");
        assert_eq!(category, StatementCategory::Select);
        assert_eq!(keyword, "SELECT*FROM");

        assert_eq!(classify("SELECT(1)").0, StatementCategory::Select);
        assert_eq!(classify("select(1)").0, StatementCategory::Select);
        assert_eq!(classify("WITH(oddity) AS (SELECT 1) SELECT 1").0, StatementCategory::Cte);
    }

    #[test]
    fn test_split_plain_statements() {
        let parts = split_statements("INSERT INTO t VALUES (1); DELETE FROM t; ");
        assert_eq!(parts, vec!["INSERT INTO t VALUES (1)", "DELETE FROM t"]);
    }

    #[test]
    fn test_split_semicolon_inside_single_quotes() {
        let parts = split_statements("INSERT INTO t VALUES ('a;b'); SELECT 1");
        assert_eq!(parts, vec!["INSERT INTO t VALUES ('a;b')", "SELECT 1"]);
    }

    #[test]
    fn test_split_escaped_quote_in_literal() {
        let parts = split_statements(r"INSERT INTO t VALUES ('O\'Brien; Esq.'); SELECT 1");
        assert_eq!(parts, vec![r"INSERT INTO t VALUES ('O\'Brien; Esq.')", "SELECT 1"]);
    }

    #[test]
    fn test_split_doubled_quote_in_literal() {
        let parts = split_statements("INSERT INTO t VALUES ('it''s; fine'); SELECT 1");
        assert_eq!(parts, vec!["INSERT INTO t VALUES ('it''s; fine')", "SELECT 1"]);
    }

    #[test]
    fn test_split_semicolon_in_backtick_identifier() {
        let parts = split_statements("SELECT `weird;name` FROM t; SELECT 2");
        assert_eq!(parts, vec!["SELECT `weird;name` FROM t", "SELECT 2"]);
    }

    #[test]
    fn test_split_semicolon_in_comments() {
        let parts = split_statements("SELECT 1 -- trailing; comment\n; SELECT 2");
        assert_eq!(parts, vec!["SELECT 1 -- trailing; comment", "SELECT 2"]);

        let parts = split_statements("SELECT /* a;b */ 1; SELECT 2");
        assert_eq!(parts, vec!["SELECT /* a;b */ 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_drops_empty_fragments() {
        assert_eq!(split_statements(";;  ;"), Vec::<String>::new());
        assert_eq!(split_statements("SELECT 1;;"), vec!["SELECT 1"]);
    }

    #[test]
    fn test_split_unterminated_literal_keeps_remainder() {
        // Malformed input still yields the raw tail instead of losing text
        let parts = split_statements("INSERT INTO t VALUES ('unterminated; SELECT 1");
        assert_eq!(parts, vec!["INSERT INTO t VALUES ('unterminated; SELECT 1"]);
    }
}
