//! Dialect descriptors for the four supported databases.
//!
//! Generated SQL is dialect-invariant except where the databases
//! genuinely disagree: identifier quoting, pagination syntax,
//! set-membership syntax, and identity retrieval after INSERT.
//! Parameter placeholders are uniformly `@name`; provider-specific
//! rebinding is the execution layer's concern.

use cpql_core::{Error, Result, quote_ident, quote_ident_mssql, quote_ident_mysql};
use serde::{Deserialize, Serialize};

/// A supported SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    SqlServer,
    Postgres,
    MySql,
    Sqlite,
}

/// Pagination rendering: an optional `TOP (n)` select modifier and an
/// optional trailing clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Inserted after `SELECT [DISTINCT]` (SQL Server `TOP`).
    pub select_modifier: Option<String>,
    /// Appended after ORDER BY.
    pub suffix: Option<String>,
}

impl Dialect {
    /// All supported dialects, for round-trip testing and docs.
    pub const ALL: [Dialect; 4] = [
        Dialect::SqlServer,
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::Sqlite,
    ];

    /// Human-readable dialect name.
    pub const fn name(self) -> &'static str {
        match self {
            Dialect::SqlServer => "SQL Server",
            Dialect::Postgres => "PostgreSQL",
            Dialect::MySql => "MySQL",
            Dialect::Sqlite => "SQLite",
        }
    }

    /// Quote an identifier for this dialect.
    pub fn quote(self, name: &str) -> String {
        match self {
            Dialect::SqlServer => quote_ident_mssql(name),
            Dialect::MySql => quote_ident_mysql(name),
            Dialect::Postgres | Dialect::Sqlite => quote_ident(name),
        }
    }

    /// Quote a `schema.table` reference.
    pub fn qualified_table(self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(table)),
            None => self.quote(table),
        }
    }

    /// Render pagination for this dialect.
    ///
    /// SQL Server's `OFFSET .. FETCH` requires an ORDER BY clause; a
    /// limit-only query without ordering renders `TOP (n)` instead, and
    /// an offset without ordering is unsupported.
    pub fn pagination(
        self,
        limit: Option<u64>,
        offset: Option<u64>,
        has_order_by: bool,
    ) -> Result<Pagination> {
        if limit.is_none() && offset.is_none() {
            return Ok(Pagination::default());
        }
        match self {
            Dialect::SqlServer => {
                if has_order_by {
                    let offset = offset.unwrap_or(0);
                    let mut suffix = format!(" OFFSET {offset} ROWS");
                    if let Some(limit) = limit {
                        suffix.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
                    }
                    Ok(Pagination {
                        select_modifier: None,
                        suffix: Some(suffix),
                    })
                } else if offset.is_none() {
                    Ok(Pagination {
                        select_modifier: limit.map(|n| format!("TOP ({n}) ")),
                        suffix: None,
                    })
                } else {
                    Err(Error::DialectUnsupported {
                        dialect: self.name().to_string(),
                        feature: "OFFSET without ORDER BY".to_string(),
                    })
                }
            }
            Dialect::MySql => {
                let suffix = match (offset, limit) {
                    (None, Some(limit)) => format!(" LIMIT {limit}"),
                    (Some(offset), Some(limit)) => format!(" LIMIT {offset}, {limit}"),
                    // MySQL has no offset-only form; the documented idiom
                    // is an unreachable row count.
                    (Some(offset), None) => format!(" LIMIT {offset}, 18446744073709551615"),
                    (None, None) => unreachable!(),
                };
                Ok(Pagination {
                    select_modifier: None,
                    suffix: Some(suffix),
                })
            }
            Dialect::Postgres | Dialect::Sqlite => {
                let mut suffix = String::new();
                match limit {
                    Some(limit) => suffix.push_str(&format!(" LIMIT {limit}")),
                    // SQLite requires LIMIT before OFFSET.
                    None if self == Dialect::Sqlite => suffix.push_str(" LIMIT -1"),
                    None => {}
                }
                if let Some(offset) = offset {
                    suffix.push_str(&format!(" OFFSET {offset}"));
                }
                Ok(Pagination {
                    select_modifier: None,
                    suffix: Some(suffix),
                })
            }
        }
    }

    /// Render set membership against a single bindable parameter.
    ///
    /// PostgreSQL binds the whole set as an array (`= ANY(@p)`); the
    /// other dialects use `IN (@p)` and rely on the execution layer to
    /// expand list parameters.
    pub fn set_membership(self, column: &str, placeholder: &str, negated: bool) -> String {
        match self {
            Dialect::Postgres => {
                if negated {
                    format!("{column} <> ALL({placeholder})")
                } else {
                    format!("{column} = ANY({placeholder})")
                }
            }
            _ => {
                if negated {
                    format!("{column} NOT IN ({placeholder})")
                } else {
                    format!("{column} IN ({placeholder})")
                }
            }
        }
    }

    /// The statement suffix that retrieves a generated key after INSERT,
    /// or `None` when the dialect has no inline form.
    pub fn identity_suffix(self, key_column: &str) -> Option<String> {
        match self {
            Dialect::SqlServer => Some("; SELECT SCOPE_IDENTITY()".to_string()),
            Dialect::MySql => Some("; SELECT LAST_INSERT_ID()".to_string()),
            Dialect::Postgres => Some(format!(" RETURNING {key_column}")),
            Dialect::Sqlite => None,
        }
    }

    /// Whether this dialect supports table-valued parameters.
    pub const fn supports_table_valued_parameters(self) -> bool {
        matches!(self, Dialect::SqlServer)
    }

    /// Fail with [`Error::DialectUnsupported`] unless `supported`.
    pub fn require(self, feature: &str, supported: bool) -> Result<()> {
        if supported {
            Ok(())
        } else {
            Err(Error::DialectUnsupported {
                dialect: self.name().to_string(),
                feature: feature.to_string(),
            })
        }
    }
}
