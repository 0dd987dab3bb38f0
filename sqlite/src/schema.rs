//! SQL schema generation with customizable table prefixes.
//!
//! Three tables hold the durable mirror of a registry:
//!
//! - `{prefix}modules`: one row per registered package
//! - `{prefix}commands`: the command specs of each package, in descriptor
//!   order, deleted with their module
//! - `{prefix}help`: help lines keyed by package id
//!
//! Help rows are not tied to a module row; the registry writes them
//! best-effort and independently of the descriptor.
//!
//! Prefixes must contain only alphanumeric characters and underscores, so
//! several registries (e.g. `prod_`, `test_`) can share one database file.

use crate::error::{Result, SqliteError};

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Generates the `CREATE` statements for all tables with the given prefix.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is empty or
/// contains characters other than alphanumerics and underscores.
pub fn generate_schema_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS {prefix}commands (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    full_name TEXT NOT NULL,
    short_alias TEXT,
    sub_command TEXT,
    is_default INTEGER NOT NULL DEFAULT 0,
    takes_arguments INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (module_id) REFERENCES {prefix}modules(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS {prefix}help (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    command TEXT NOT NULL,
    sub_command TEXT,
    arg_type TEXT NOT NULL DEFAULT 'None',
    description TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{prefix}commands_module ON {prefix}commands(module_id);
CREATE INDEX IF NOT EXISTS idx_{prefix}commands_name ON {prefix}commands(full_name);
CREATE INDEX IF NOT EXISTS idx_{prefix}help_package ON {prefix}help(package_id);
"#,
        prefix = prefix
    );

    Ok(sql)
}

/// Generates SQL to drop all tables in reverse dependency order.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
DROP TABLE IF EXISTS {prefix}help;
DROP TABLE IF EXISTS {prefix}commands;
DROP TABLE IF EXISTS {prefix}modules;
"#,
        prefix = prefix
    );

    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_prefix() {
        assert!(validate_prefix("reg_").is_ok());
        assert!(validate_prefix("test123").is_ok());
        assert!(validate_prefix("A_B_C").is_ok());
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("drop;--").is_err());
        assert!(validate_prefix("hello world").is_err());
        assert!(validate_prefix("test-prefix").is_err());
    }

    #[test]
    fn test_generate_schema_sql_contains_tables() {
        let sql = generate_schema_sql("reg_").unwrap();
        assert!(sql.contains("reg_modules"));
        assert!(sql.contains("reg_commands"));
        assert!(sql.contains("reg_help"));
        assert!(sql.contains("idx_reg_commands_module"));
        assert!(sql.contains("idx_reg_help_package"));
    }

    #[test]
    fn test_generate_drop_sql_invalid_prefix() {
        assert!(generate_drop_sql("").is_err());
        assert!(generate_schema_sql("a b").is_err());
    }

    #[test]
    fn test_commands_cascade_with_module() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn.execute_batch(&generate_schema_sql("t_").unwrap()).unwrap();

        conn.execute(
            "INSERT INTO t_modules (package_id, display_name) VALUES ('p', 'P')",
            [],
        )
        .unwrap();
        let module_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO t_commands (module_id, position, full_name) VALUES (?1, 0, 'sms')",
            [module_id],
        )
        .unwrap();

        // Orphan command rows are refused
        assert!(
            conn.execute(
                "INSERT INTO t_commands (module_id, position, full_name) VALUES (9999, 0, 'x')",
                [],
            )
            .is_err()
        );

        conn.execute("DELETE FROM t_modules WHERE package_id = 'p'", [])
            .unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM t_commands", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
