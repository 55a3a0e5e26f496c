//! SQL identifier quoting and sanitization utilities.
//!
//! Identifier quoting is the one piece of SQL text that legitimately
//! varies by dialect. All three quoting styles escape the closing
//! character by doubling it, which makes them safe for any input string.

/// Quote a SQL identifier using ANSI double-quoting (PostgreSQL, SQLite).
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`).
///
/// # Examples
///
/// ```
/// use cpql_core::quote_ident;
///
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("user\"name"), "\"user\"\"name\"");
/// assert_eq!(quote_ident("select"), "\"select\""); // SQL keyword
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL identifier using MySQL backtick quoting.
///
/// Embedded backticks are escaped by doubling them.
///
/// # Examples
///
/// ```
/// use cpql_core::quote_ident_mysql;
///
/// assert_eq!(quote_ident_mysql("users"), "`users`");
/// assert_eq!(quote_ident_mysql("user`name"), "`user``name`");
/// ```
#[inline]
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a SQL identifier using SQL Server bracket quoting.
///
/// Embedded closing brackets are escaped by doubling them (`]` → `]]`).
///
/// # Examples
///
/// ```
/// use cpql_core::quote_ident_mssql;
///
/// assert_eq!(quote_ident_mssql("users"), "[users]");
/// assert_eq!(quote_ident_mssql("user]name"), "[user]]name]");
/// ```
#[inline]
pub fn quote_ident_mssql(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Sanitize a SQL identifier by removing non-alphanumeric/underscore characters.
///
/// Use this where quoting is not possible. This strips characters rather
/// than erroring; an input of only invalid characters yields an empty
/// string.
#[inline]
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
