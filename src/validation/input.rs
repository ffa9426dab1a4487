//! Identifier sanitization and validation.
//!
//! Every table and column name that reaches a DDL statement is produced by
//! [`sanitize_identifier`] and checked by [`validate_identifier`]. The schema
//! builder interpolates names into SQL without quoting, so these two functions
//! are the only defense against identifier injection.
//!
//! # Security
//!
//! Sanitization prevents:
//! - SQL injection via malicious file or header names
//! - Unquoted identifiers that collide with reserved words
//! - Identifiers the database would truncate or reject

use thiserror::Error;

/// Maximum identifier length (PostgreSQL truncates past `NAMEDATALEN - 1`)
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Suffix appended to identifiers that collide with a reserved word
pub const RESERVED_SUFFIX: &str = "_1";

/// Extension of the delimited text files the loader picks up
pub const SOURCE_EXTENSION: &str = "csv";

/// Errors that can occur during identifier validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier is empty after sanitization
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Identifier exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Identifier contains characters outside the allow-list
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Identifier has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),

    /// Identifier is a reserved word
    #[error("{field} cannot be a reserved word: {word}")]
    ReservedWord { field: &'static str, word: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Turn an arbitrary file or column name into a SQL identifier.
///
/// # Rules
///
/// Applied in this order:
/// - Lower-case the input
/// - Replace each run of whitespace with a single underscore
/// - Strip every character outside `[A-Za-z0-9_]`
/// - Append [`RESERVED_SUFFIX`] when the result is a reserved word
///
/// The result may be empty; callers run [`validate_identifier`] before using it.
///
/// # Examples
///
/// ```
/// use dir_to_db::validation::input::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("My File!"), "my_file");
/// assert_eq!(sanitize_identifier("Order"), "order_1");
/// assert_eq!(sanitize_identifier("unit  price ($)"), "unit_price_");
/// ```
pub fn sanitize_identifier(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut sanitized = String::with_capacity(lowered.len());
    let mut in_whitespace = false;

    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                sanitized.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        if ch.is_ascii_alphanumeric() || ch == '_' {
            sanitized.push(ch);
        }
    }

    if is_sql_reserved_word(&sanitized) {
        sanitized.push_str(RESERVED_SUFFIX);
    }

    sanitized
}

/// Derive a table name from a source file name.
///
/// The recognized extension is removed before sanitizing, so `Sales 2024.csv`
/// becomes `sales_2024`.
///
/// # Examples
///
/// ```
/// use dir_to_db::validation::input::table_name_for_file;
///
/// assert_eq!(table_name_for_file("csv1.csv"), "csv1");
/// assert_eq!(table_name_for_file("User.CSV"), "user_1");
/// ```
pub fn table_name_for_file(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case(SOURCE_EXTENSION) => stem,
        _ => file_name,
    };
    sanitize_identifier(stem)
}

/// Validate a sanitized identifier before it is used in DDL.
///
/// # Rules
///
/// - Must not be empty
/// - Must not exceed [`MAX_IDENTIFIER_LENGTH`] bytes
/// - Must not start with a digit
/// - May contain only lowercase ASCII letters, digits and underscores
/// - Cannot be a SQL reserved word
///
/// # Examples
///
/// ```
/// use dir_to_db::validation::input::validate_identifier;
///
/// assert!(validate_identifier("height", "column name").is_ok());
/// assert!(validate_identifier("", "column name").is_err());
/// assert!(validate_identifier("2024_sales", "table name").is_err());
/// assert!(validate_identifier("users; drop", "table name").is_err());
/// ```
pub fn validate_identifier(name: &str, field: &'static str) -> ValidationResult<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(ValidationError::Empty(field));
    };

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_IDENTIFIER_LENGTH,
            actual: name.len(),
        });
    }

    if first_char.is_ascii_digit() {
        return Err(ValidationError::InvalidFormat(
            field,
            format!("'{}' must not start with a digit", name),
        ));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
    {
        return Err(ValidationError::InvalidCharacters {
            field,
            reason: format!("invalid character: '{}'", c),
        });
    }

    if is_sql_reserved_word(name) {
        return Err(ValidationError::ReservedWord {
            field,
            word: name.to_string(),
        });
    }

    Ok(())
}

/// Reserved words, upper-case and sorted for binary search
const RESERVED_WORDS: &[&str] = &[
    "ALL",
    "ALTER",
    "ANALYSE",
    "ANALYZE",
    "AND",
    "ANY",
    "ARRAY",
    "AS",
    "ASC",
    "ASYMMETRIC",
    "AUTHORIZATION",
    "BEGIN",
    "BETWEEN",
    "BIGINT",
    "BINARY",
    "BOOLEAN",
    "BOTH",
    "BY",
    "CASE",
    "CAST",
    "CHAR",
    "CHECK",
    "COLLATE",
    "COLLATION",
    "COLUMN",
    "COMMIT",
    "CONCURRENTLY",
    "CONSTRAINT",
    "CREATE",
    "CROSS",
    "CURRENT_CATALOG",
    "CURRENT_DATE",
    "CURRENT_ROLE",
    "CURRENT_SCHEMA",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "DATABASE",
    "DATE",
    "DECIMAL",
    "DEFAULT",
    "DEFERRABLE",
    "DELETE",
    "DESC",
    "DISTINCT",
    "DO",
    "DOUBLE",
    "DROP",
    "ELSE",
    "END",
    "EXCEPT",
    "EXEC",
    "EXECUTE",
    "FALSE",
    "FETCH",
    "FLOAT",
    "FOR",
    "FOREIGN",
    "FREEZE",
    "FROM",
    "FULL",
    "FUNCTION",
    "GRANT",
    "GROUP",
    "HAVING",
    "ILIKE",
    "IN",
    "INDEX",
    "INITIALLY",
    "INNER",
    "INSERT",
    "INT",
    "INTEGER",
    "INTERSECT",
    "INTERVAL",
    "INTO",
    "IS",
    "ISNULL",
    "JOIN",
    "KEY",
    "LATERAL",
    "LEADING",
    "LEFT",
    "LIKE",
    "LIMIT",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "NATURAL",
    "NOT",
    "NOTNULL",
    "NULL",
    "NUMERIC",
    "OFFSET",
    "ON",
    "ONLY",
    "OR",
    "ORDER",
    "OUTER",
    "OVERLAPS",
    "PLACING",
    "PRIMARY",
    "PROCEDURE",
    "REAL",
    "REFERENCES",
    "RETURNING",
    "REVOKE",
    "RIGHT",
    "ROLLBACK",
    "SCHEMA",
    "SELECT",
    "SESSION_USER",
    "SET",
    "SIMILAR",
    "SMALLINT",
    "SOME",
    "SYMMETRIC",
    "SYSTEM_USER",
    "TABLE",
    "TABLESAMPLE",
    "TEXT",
    "THEN",
    "TIME",
    "TIMESTAMP",
    "TO",
    "TOP",
    "TRAILING",
    "TRANSACTION",
    "TRIGGER",
    "TRUE",
    "UNION",
    "UNIQUE",
    "UPDATE",
    "USER",
    "USING",
    "VALUES",
    "VARCHAR",
    "VARIADIC",
    "VERBOSE",
    "VIEW",
    "WHEN",
    "WHERE",
    "WINDOW",
    "WITH",
];

/// Check if a word is a SQL reserved word.
///
/// Covers the PostgreSQL reserved keywords, common statement keywords across
/// dialects, and the type names the schema builder emits.
pub fn is_sql_reserved_word(word: &str) -> bool {
    let upper = word.to_uppercase();
    RESERVED_WORDS.binary_search(&upper.as_str()).is_ok()
}
