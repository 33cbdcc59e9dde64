//! Positional placeholder rewriting for backends that number their parameters.
//!
//! Statements are written with JDBC-style `?` placeholders (optionally numbered as `?N`).
//! `PostgreSQL` wants `$N`, so its session rewrites them before preparing.

use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};
use scanner::{State, scan_digits};

/// Rewrite `?` and `?N` placeholders as `$N`.
///
/// Bare `?` placeholders are numbered by occurrence starting at 1. Text inside quoted
/// strings, quoted identifiers, comments, and dollar-quoted bodies is left alone.
///
/// Warning: `PostgreSQL` also uses `?` as a JSON operator (`?`, `?|`, `?&`). Statements
/// using those operators should be sent with translation turned off.
///
/// Returns a borrowed `Cow` when no changes are needed.
///
/// ```rust
/// use sql_fluent::translation::translate_placeholders;
///
/// let sql = translate_placeholders("SELECT * FROM movie WHERE title = ? AND id > ?", true);
/// assert_eq!(sql, "SELECT * FROM movie WHERE title = $1 AND id > $2");
/// ```
#[must_use]
pub fn translate_placeholders(sql: &str, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }

    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut next_bare = 1_usize;
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b'?' => {
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                    buf.push_str(&sql[copied..idx]);
                    buf.push('$');
                    if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        buf.push_str(digits);
                        idx = digits_end - 1;
                    } else {
                        buf.push_str(&next_bare.to_string());
                        next_bare += 1;
                    }
                    copied = idx + 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    idx += 1;
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied.min(sql.len())..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

/// Number of placeholders a statement carries after translation to `$N` form.
///
/// This is the highest `$N` seen outside literals and comments.
#[must_use]
pub fn count_numbered_placeholders(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut highest = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        highest = highest.max(digits.parse().unwrap_or(0));
                        idx = digits_end - 1;
                    } else if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_end(bytes, idx) {
                    idx += 1;
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                } else if is_block_comment_start(bytes, idx) {
                    idx += 1;
                    state = State::BlockComment(depth + 1);
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }
    highest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_bare_placeholders_by_occurrence() {
        let sql = "insert into movie(title, directed_by) values (?, ?)";
        let res = translate_placeholders(sql, true);
        assert_eq!(res, "insert into movie(title, directed_by) values ($1, $2)");
    }

    #[test]
    fn keeps_explicit_numbers() {
        let sql = "select * from t where a = ?1 and b = ?2 or a = ?1";
        let res = translate_placeholders(sql, true);
        assert_eq!(res, "select * from t where a = $1 and b = $2 or a = $1");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', ? -- ?\n/* ? /* ? */ ? */ from t where a = ?";
        let res = translate_placeholders(sql, true);
        assert_eq!(res, "select '?', $1 -- ?\n/* ? /* ? */ ? */ from t where a = $2");
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$body$ select ? from t $body$ where a = ?";
        let res = translate_placeholders(sql, true);
        assert_eq!(res, "$body$ select ? from t $body$ where a = $1");
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let sql = "select 'Amélie', ? from t where name = 'Léon'";
        let res = translate_placeholders(sql, true);
        assert_eq!(res, "select 'Amélie', $1 from t where name = 'Léon'");
    }

    #[test]
    fn untouched_sql_is_borrowed() {
        let sql = "select 1";
        assert!(matches!(translate_placeholders(sql, true), Cow::Borrowed(_)));
        let sql = "select ?";
        assert!(matches!(translate_placeholders(sql, false), Cow::Borrowed(_)));
    }

    #[test]
    fn counts_highest_placeholder() {
        assert_eq!(count_numbered_placeholders("select $1, $3, '$7'"), 3);
        assert_eq!(count_numbered_placeholders("select 1"), 0);
    }
}
