//! Integration tests for the command-registry-sqlite crate.

use command_registry::{Registry, RegistryError};
use command_registry_core::{ArgType, CommandHelp, CommandSpec, ModuleDescriptor};
use command_registry_sqlite::{Migration, SqliteStore};
use rusqlite::Connection;

fn registry_over(store: &SqliteStore) -> Registry {
    Registry::builder()
        .store(store.clone())
        .help_store(store.clone())
        .build()
        .unwrap()
}

fn wifi_module() -> ModuleDescriptor {
    ModuleDescriptor::new("org.example.wifiaccess", "Wifi Access")
        .with_command(CommandSpec::new("wifi").with_alias("wf").as_default())
        .with_command(CommandSpec::new("wifi").with_sub_command("list"))
        .with_help(CommandHelp::new("wifi", ArgType::None, "Show the Wi-Fi state"))
        .with_help(
            CommandHelp::new("wifi", ArgType::None, "List visible networks").with_sub_command("list"),
        )
}

fn sms_module() -> ModuleDescriptor {
    ModuleDescriptor::new("org.example.smssend", "Sms Send")
        .with_command(CommandSpec::new("sms").with_alias("s").as_default().with_arguments())
        .with_help(CommandHelp::new("sms", ArgType::ContactName, "Send a message"))
}

fn status(path: &std::path::Path, prefix: &str) -> command_registry_sqlite::MigrationStatus {
    Migration::new(Connection::open(path).unwrap(), prefix)
        .unwrap()
        .status()
        .unwrap()
}

#[test]
fn test_registry_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");

    {
        let store = SqliteStore::open(&path, "reg_").unwrap();
        let registry = registry_over(&store);
        registry.register_module(wifi_module()).unwrap();
        registry.register_module(sms_module()).unwrap();
    }

    let st = status(&path, "reg_");
    assert_eq!(st.module_count, 2);
    assert_eq!(st.command_count, 3);
    assert_eq!(st.help_count, 3);

    let store = SqliteStore::open(&path, "reg_").unwrap();
    let registry = registry_over(&store);
    assert_eq!(
        registry.load_report().loaded,
        vec!["org.example.smssend", "org.example.wifiaccess"]
    );
    assert_eq!(registry.module("org.example.wifiaccess").unwrap(), wifi_module());
    assert_eq!(registry.lookup("wf").unwrap().name(), "wifi");
    assert_eq!(
        registry.resolve("s", None, true).unwrap().package_id,
        "org.example.smssend"
    );
    assert_eq!(registry.help("org.example.smssend").unwrap().len(), 1);
}

#[test]
fn test_unregister_removes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");
    let store = SqliteStore::open(&path, "reg_").unwrap();
    let registry = registry_over(&store);

    registry.register_module(wifi_module()).unwrap();
    assert!(registry.unregister_module("org.example.wifiaccess").unwrap());

    let st = status(&path, "reg_");
    assert!(st.tables_exist);
    assert_eq!(st.module_count, 0);
    assert_eq!(st.command_count, 0);
    assert_eq!(st.help_count, 0);
}

#[test]
fn test_reregistration_replaces_rows() {
    let store = SqliteStore::open_in_memory("reg_").unwrap();
    let registry = registry_over(&store);

    registry
        .register_module(
            ModuleDescriptor::new("a", "A").with_command(CommandSpec::new("sms").with_alias("s")),
        )
        .unwrap();
    let replacement =
        ModuleDescriptor::new("a", "A").with_command(CommandSpec::new("call").with_alias("c"));
    registry.register_module(replacement.clone()).unwrap();

    assert_eq!(store.load_module("a").unwrap().unwrap(), replacement);
    assert!(registry.help("a").unwrap().is_empty());
}

#[test]
fn test_clash_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");
    let store = SqliteStore::open(&path, "reg_").unwrap();
    let registry = registry_over(&store);

    registry.register_module(sms_module()).unwrap();
    let clashing = ModuleDescriptor::new("org.example.other", "Other")
        .with_command(CommandSpec::new("sms").as_default().with_arguments());
    assert!(matches!(
        registry.register_module(clashing),
        Err(RegistryError::Clash(_))
    ));

    assert_eq!(status(&path, "reg_").module_count, 1);
}

#[test]
fn test_corrupt_row_is_skipped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");
    {
        let store = SqliteStore::open(&path, "reg_").unwrap();
        let registry = registry_over(&store);
        registry.register_module(wifi_module()).unwrap();
        registry.register_module(sms_module()).unwrap();
    }

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE reg_commands SET is_default = 'maybe' WHERE full_name = 'sms'",
        [],
    )
    .unwrap();
    drop(conn);

    let store = SqliteStore::open(&path, "reg_").unwrap();
    let registry = registry_over(&store);
    let report = registry.load_report();
    assert_eq!(report.loaded, vec!["org.example.wifiaccess"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        report.skipped[0].package_id.as_deref(),
        Some("org.example.smssend")
    );
    assert!(registry.lookup("sms").is_none());

    assert!(registry.unregister_module("org.example.smssend").unwrap());
    let st = status(&path, "reg_");
    assert_eq!(st.module_count, 1);
    assert_eq!(st.help_count, 2);
}

#[test]
fn test_store_failure_keeps_memory_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");
    let store = SqliteStore::open(&path, "reg_").unwrap();
    let registry = registry_over(&store);

    let mut migration = Migration::new(Connection::open(&path).unwrap(), "reg_").unwrap();
    migration.down().unwrap();

    let err = registry.register_module(wifi_module()).unwrap_err();
    assert!(matches!(err, RegistryError::Store(_)));
    assert_eq!(registry.lookup("wf").unwrap().name(), "wifi");
    assert!(registry.contains_module("org.example.wifiaccess"));
}

#[test]
fn test_prefixes_share_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");

    let prod = SqliteStore::open(&path, "prod_").unwrap();
    let test = SqliteStore::open(&path, "test_").unwrap();
    registry_over(&prod).register_module(wifi_module()).unwrap();
    registry_over(&test).register_module(sms_module()).unwrap();

    assert_eq!(
        registry_over(&prod).module_packages(),
        vec!["org.example.wifiaccess"]
    );
    assert_eq!(
        registry_over(&test).module_packages(),
        vec!["org.example.smssend"]
    );
}

#[test]
fn test_invalid_prefix_is_rejected() {
    assert!(SqliteStore::open_in_memory("bad prefix").is_err());
    assert!(SqliteStore::new(Connection::open_in_memory().unwrap(), "").is_err());
}
