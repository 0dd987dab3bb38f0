//! Conversion between registry types and SQLite rows.
//!
//! A [`ModuleDescriptor`] is split across two tables: the module row and one
//! row per [`CommandSpec`], ordered by `position`. Help lines live in their
//! own table and are folded back into the descriptor when it is loaded, so a
//! reloaded descriptor carries the help that was last persisted for it.
//!
//! These functions take a plain [`Connection`]; callers wrap them in a
//! transaction when several statements must apply together.

use command_registry_core::{ArgType, CommandHelp, CommandSpec, ModuleDescriptor};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Result, SqliteError};

const OTHER_PREFIX: &str = "Other:";

/// Converts an [`ArgType`] to its stored string form.
///
/// [`ArgType::Other`] keeps its name after an `Other:` marker.
pub(crate) fn arg_type_to_string(arg_type: &ArgType) -> String {
    match arg_type {
        ArgType::None => "None".to_string(),
        ArgType::Path => "Path".to_string(),
        ArgType::PhoneNumber => "PhoneNumber".to_string(),
        ArgType::ContactName => "ContactName".to_string(),
        ArgType::Number => "Number".to_string(),
        ArgType::Text => "Text".to_string(),
        ArgType::Other(name) => format!("{OTHER_PREFIX}{name}"),
    }
}

/// Parses a stored string back into an [`ArgType`].
pub(crate) fn string_to_arg_type(s: &str) -> Result<ArgType> {
    match s {
        "None" => Ok(ArgType::None),
        "Path" => Ok(ArgType::Path),
        "PhoneNumber" => Ok(ArgType::PhoneNumber),
        "ContactName" => Ok(ArgType::ContactName),
        "Number" => Ok(ArgType::Number),
        "Text" => Ok(ArgType::Text),
        other => match other.strip_prefix(OTHER_PREFIX) {
            Some(name) => Ok(ArgType::Other(name.to_string())),
            None => Err(SqliteError::ConversionError(format!(
                "unknown argument type: {other}"
            ))),
        },
    }
}

/// Inserts a descriptor's module row and command rows.
///
/// Returns the number of command rows written. The caller must have
/// removed any previous row for the same package.
pub fn insert_module(conn: &Connection, prefix: &str, descriptor: &ModuleDescriptor) -> Result<usize> {
    conn.execute(
        &format!("INSERT INTO {prefix}modules (package_id, display_name) VALUES (?1, ?2)"),
        params![descriptor.package_id, descriptor.display_name],
    )?;
    let module_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {prefix}commands \
         (module_id, position, full_name, short_alias, sub_command, is_default, takes_arguments) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    ))?;
    for (position, spec) in descriptor.commands.iter().enumerate() {
        stmt.execute(params![
            module_id,
            position as i64,
            spec.full_name,
            spec.short_alias,
            spec.sub_command,
            spec.is_default,
            spec.takes_arguments,
        ])?;
    }

    Ok(descriptor.commands.len())
}

/// Deletes a module row; its command rows go with it.
///
/// Returns whether a row existed.
pub fn delete_module(conn: &Connection, prefix: &str, package_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        &format!("DELETE FROM {prefix}modules WHERE package_id = ?1"),
        params![package_id],
    )?;
    Ok(deleted > 0)
}

/// Package ids of every stored module, sorted.
pub fn load_package_ids(conn: &Connection, prefix: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT package_id FROM {prefix}modules ORDER BY package_id"
    ))?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Reconstructs a stored descriptor, including its persisted help.
///
/// Returns `None` if no module row exists for `package_id`.
pub fn load_module(conn: &Connection, prefix: &str, package_id: &str) -> Result<Option<ModuleDescriptor>> {
    let row = conn
        .query_row(
            &format!("SELECT id, display_name FROM {prefix}modules WHERE package_id = ?1"),
            params![package_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    let Some((module_id, display_name)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT full_name, short_alias, sub_command, is_default, takes_arguments \
         FROM {prefix}commands WHERE module_id = ?1 ORDER BY position"
    ))?;
    let commands = stmt
        .query_map(params![module_id], |row| {
            Ok(CommandSpec {
                full_name: row.get(0)?,
                short_alias: row.get(1)?,
                sub_command: row.get(2)?,
                is_default: row.get(3)?,
                takes_arguments: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(ModuleDescriptor {
        package_id: package_id.to_string(),
        display_name,
        commands,
        help: load_help(conn, prefix, package_id)?,
    }))
}

/// Replaces the help lines of `package_id`.
///
/// Returns the number of rows written.
pub fn replace_help(conn: &Connection, prefix: &str, package_id: &str, help: &[CommandHelp]) -> Result<usize> {
    delete_help(conn, prefix, package_id)?;

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {prefix}help (package_id, position, command, sub_command, arg_type, description) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    ))?;
    for (position, line) in help.iter().enumerate() {
        stmt.execute(params![
            package_id,
            position as i64,
            line.command,
            line.sub_command,
            arg_type_to_string(&line.arg_type),
            line.description,
        ])?;
    }
    Ok(help.len())
}

pub fn delete_help(conn: &Connection, prefix: &str, package_id: &str) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {prefix}help WHERE package_id = ?1"),
        params![package_id],
    )?;
    Ok(())
}

/// Loads the help lines of `package_id` in the order they were written.
pub fn load_help(conn: &Connection, prefix: &str, package_id: &str) -> Result<Vec<CommandHelp>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT command, sub_command, arg_type, description \
         FROM {prefix}help WHERE package_id = ?1 ORDER BY position"
    ))?;
    let rows = stmt.query_map(params![package_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut help = Vec::new();
    for row in rows {
        let (command, sub_command, arg_type, description) = row?;
        help.push(CommandHelp {
            command,
            sub_command,
            arg_type: string_to_arg_type(&arg_type)?,
            description,
        });
    }
    Ok(help)
}
