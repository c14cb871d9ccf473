//! SQL text conventions that vary per target database.
//!
//! Statements are built with `?` markers. A [`Dialect`] decides how markers are
//! rendered for the driver, how enum values are cast, and which syntax is used for
//! offset/fetch, windowed counts and procedure calls. [`Postgres`] is the default.

use crate::param::EnumValue;
use heck::ToSnakeCase;
use std::fmt;
use std::sync::Arc;

/// The placeholder marker used in statement text.
pub const MARKER: char = '?';

/// Maps the Rust type name of an enum onto a database type name.
pub trait EnumTypeTranslator: Send + Sync {
    fn translate(&self, type_name: &str) -> String;
}

impl<F> EnumTypeTranslator for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn translate(&self, type_name: &str) -> String {
        self(type_name)
    }
}

/// `DayOfWeek` becomes `day_of_week`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

impl EnumTypeTranslator for SnakeCase {
    fn translate(&self, type_name: &str) -> String {
        type_name.to_snake_case()
    }
}

/// Uses the Rust type name unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl EnumTypeTranslator for Verbatim {
    fn translate(&self, type_name: &str) -> String {
        type_name.to_string()
    }
}

/// SQL generation conventions.
///
/// Every method has a PostgreSQL default; implementors only override what differs.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Translator for enum type names.
    fn enum_translator(&self) -> &dyn EnumTypeTranslator;

    /// Placeholder for an enum value: a marker cast to the enum's database type.
    fn enum_placeholder(&self, value: &EnumValue) -> String {
        match value.db_type() {
            Some(db_type) => format!("{MARKER}::{db_type}"),
            None => format!(
                "{MARKER}::{}",
                self.enum_translator().translate(value.type_name())
            ),
        }
    }

    /// Offset/limit suffix. `None` means no upper bound.
    fn offset_clause(&self, offset: u64, limit: Option<u32>) -> String {
        match limit {
            Some(limit) => format!(" OFFSET {offset} ROWS FETCH FIRST {limit} ROWS ONLY"),
            None => format!(" OFFSET {offset} ROWS"),
        }
    }

    /// Suffix that stops a query after its first row.
    fn first_row_only(&self) -> &'static str {
        " FETCH FIRST 1 ROWS ONLY"
    }

    /// Page rewrite for a simple query: the body is materialized once and counted
    /// with a window function.
    fn materialized_count(&self, body: &str, table: &str, count: &str, suffix: &str) -> String {
        format!(
            "WITH {table} AS MATERIALIZED ({body}) SELECT *, COUNT(*) OVER () AS {count} FROM {table}{suffix}"
        )
    }

    /// Page rewrite for a compound query, wrapped in a plain derived table.
    fn derived_count(&self, body: &str, table: &str, count: &str, suffix: &str) -> String {
        format!("SELECT *, COUNT(*) OVER () AS {count} FROM ({body}) AS {table}{suffix}")
    }

    /// Statement that invokes a stored function or procedure.
    fn procedure_call(&self, call: &str) -> String {
        format!("SELECT * FROM {call} AS result")
    }

    /// Render statement text for the driver.
    ///
    /// Markers outside quoted literals, quoted identifiers and comments become
    /// `$1`, `$2`, ... in order of appearance.
    fn render(&self, text: &str) -> String {
        let mut n = 0usize;
        let (sql, _) = scan_markers(text, |out| {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        });
        sql
    }

    /// Number of markers the text would bind.
    fn count_placeholders(&self, text: &str) -> usize {
        scan_markers(text, |out| out.push(MARKER)).1
    }
}

/// PostgreSQL conventions with a configurable enum type translator.
#[derive(Clone)]
pub struct Postgres {
    translator: Arc<dyn EnumTypeTranslator>,
}

impl Postgres {
    pub fn new() -> Self {
        Self {
            translator: Arc::new(SnakeCase),
        }
    }

    /// Use a different enum type name translator.
    pub fn with_enum_translator(mut self, translator: impl EnumTypeTranslator + 'static) -> Self {
        self.translator = Arc::new(translator);
        self
    }
}

impl Default for Postgres {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Postgres {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Postgres").finish_non_exhaustive()
    }
}

impl Dialect for Postgres {
    fn enum_translator(&self) -> &dyn EnumTypeTranslator {
        self.translator.as_ref()
    }
}

/// Whether `text` contains a bindable marker.
pub(crate) fn has_marker(text: &str) -> bool {
    scan_markers(text, |_| {}).1 > 0
}

/// Walks `text`, copying it to a new string and calling `on_marker` in place of
/// every marker that sits outside literals, quoted identifiers, dollar-quoted
/// bodies and comments. Returns the copy and the marker count.
pub(crate) fn scan_markers(text: &str, mut on_marker: impl FnMut(&mut String)) -> (String, usize) {
    let mut out = String::with_capacity(text.len() + 8);
    let mut count = 0;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        let len = match c {
            MARKER => {
                count += 1;
                on_marker(&mut out);
                rest = &rest[1..];
                continue;
            }
            '\'' => quoted_len(rest, '\'', false),
            '"' => quoted_len(rest, '"', false),
            '-' if rest.starts_with("--") => rest.find('\n').unwrap_or(rest.len()),
            '/' if rest.starts_with("/*") => rest[2..].find("*/").map_or(rest.len(), |end| end + 4),
            '$' => dollar_quoted_len(rest).unwrap_or(1),
            c if c.is_alphanumeric() || c == '_' => {
                let word = rest
                    .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
                    .unwrap_or(rest.len());
                // E'...' takes backslash escapes
                if word == 1 && matches!(c, 'E' | 'e') && rest[1..].starts_with('\'') {
                    1 + quoted_len(&rest[1..], '\'', true)
                } else {
                    word
                }
            }
            c => c.len_utf8(),
        };
        out.push_str(&rest[..len]);
        rest = &rest[len..];
    }
    (out, count)
}

/// Byte length of the quoted run at the start of `text`, closing quote included.
/// A doubled quote stays inside; so does an escaped one when `backslash` is set.
/// An unterminated run extends to the end.
fn quoted_len(text: &str, quote: char, backslash: bool) -> usize {
    let mut chars = text.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if backslash && c == '\\' {
            chars.next();
        } else if c == quote {
            if text[i + 1..].starts_with(quote) {
                chars.next();
            } else {
                return i + 1;
            }
        }
    }
    text.len()
}

/// Byte length of a `$tag$ ... $tag$` body at the start of `text`, or `None`
/// when the `$` does not open one (e.g. `$1`).
fn dollar_quoted_len(text: &str) -> Option<usize> {
    let tag_len = text[1..].find('$')?;
    let tag = &text[1..=tag_len];
    let mut tag_chars = tag.chars();
    if let Some(first) = tag_chars.next() {
        let valid = (first.is_alphabetic() || first == '_')
            && tag_chars.all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return None;
        }
    }
    let delimiter = &text[..tag_len + 2];
    let body = &text[delimiter.len()..];
    Some(
        body.find(delimiter)
            .map_or(text.len(), |end| 2 * delimiter.len() + end),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_become_numbered_placeholders() {
        let pg = Postgres::new();
        assert_eq!(
            pg.render("SELECT a FROM t WHERE b = ? AND c = ?::color"),
            "SELECT a FROM t WHERE b = $1 AND c = $2::color"
        );
    }

    #[test]
    fn quoted_markers_are_left_alone() {
        let pg = Postgres::new();
        let text = "SELECT '?', \"odd?\" FROM t WHERE x = ? -- really?\n AND y = ? /* ? */";
        assert_eq!(pg.count_placeholders(text), 2);
        assert_eq!(
            pg.render(text),
            "SELECT '?', \"odd?\" FROM t WHERE x = $1 -- really?\n AND y = $2 /* ? */"
        );
    }

    #[test]
    fn doubled_quotes_stay_inside_the_literal() {
        let pg = Postgres::new();
        assert_eq!(pg.count_placeholders("SELECT 'it''s ?' , ?"), 1);
    }

    #[test]
    fn dollar_quoted_bodies_hide_markers() {
        let pg = Postgres::new();
        assert_eq!(pg.count_placeholders("SELECT $$what?$$ || ?"), 1);
        assert_eq!(
            pg.render("SELECT $fn$ a ? $$ b ? $fn$, ?"),
            "SELECT $fn$ a ? $$ b ? $fn$, $1"
        );
        // positional parameters are not quote openers
        assert_eq!(pg.count_placeholders("SELECT $1, ?"), 1);
        assert_eq!(pg.count_placeholders("SELECT $$never closed ?"), 0);
    }

    #[test]
    fn escape_strings_allow_backslash_quotes() {
        let pg = Postgres::new();
        assert_eq!(pg.count_placeholders(r"SELECT E'it\'s ?', ?"), 1);
        assert_eq!(pg.count_placeholders(r"SELECT e'\\', ?"), 1);
        // an identifier ending in e is not an escape prefix
        assert_eq!(pg.count_placeholders("SELECT name FROM t WHERE type = ?"), 1);
        assert_eq!(
            pg.render("SELECT tablename, 'x' FROM t WHERE a$b = ?"),
            "SELECT tablename, 'x' FROM t WHERE a$b = $1"
        );
    }

    #[test]
    fn snake_case_translation() {
        assert_eq!(SnakeCase.translate("Color"), "color");
        assert_eq!(SnakeCase.translate("DayOfWeek"), "day_of_week");
        assert_eq!(Verbatim.translate("DayOfWeek"), "DayOfWeek");
        let upper = |name: &str| name.to_uppercase();
        assert_eq!(upper.translate("Color"), "COLOR");
    }

    #[test]
    fn offset_clause_with_and_without_limit() {
        let pg = Postgres::new();
        assert_eq!(
            pg.offset_clause(8, Some(4)),
            " OFFSET 8 ROWS FETCH FIRST 4 ROWS ONLY"
        );
        assert_eq!(pg.offset_clause(3, None), " OFFSET 3 ROWS");
    }
}
