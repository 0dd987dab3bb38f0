use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use command_registry::{DescriptorSet, Registry, RegistryConfig, RegistryError};
use command_registry_core::{ArgType, ModuleBundle};
use command_registry_sqlite::{Migration, SqliteStore};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "modreg")]
#[command(about = "Inspect and edit a persisted command registry")]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Database file path (overrides `storage.path` from the config).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Table prefix (overrides `storage.prefix` from the config).
    #[arg(long, global = true)]
    prefix: Option<String>,
    /// Registry configuration YAML.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level regardless of RUST_LOG.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register modules from descriptor JSON files.
    Register(RegisterArgs),
    /// Unregister a module by package id.
    Unregister(UnregisterArgs),
    /// Show the entry for a command name or short alias.
    Lookup(LookupArgs),
    /// Print the package that would execute an invocation.
    Resolve(ResolveArgs),
    /// List registered modules.
    List(ListArgs),
    /// Print the help lines stored for a module.
    Help(HelpArgs),
    /// Write every registered module into a bundle file.
    Export(ExportArgs),
    /// Table lifecycle operations.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
struct RegisterArgs {
    /// A descriptor JSON file (repeatable).
    #[arg(long)]
    file: Vec<PathBuf>,
    /// A directory of descriptor JSON files (repeatable).
    #[arg(long)]
    dir: Vec<PathBuf>,
    /// A bundle JSON file (repeatable).
    #[arg(long)]
    bundle: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct UnregisterArgs {
    /// Package id of the module.
    package_id: String,
}

#[derive(Debug, Args)]
struct LookupArgs {
    /// Full command name or short alias.
    name: String,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Full command name or short alias.
    name: String,
    /// Sub-command of the invocation.
    sub_command: Option<String>,
    /// The invocation carries arguments.
    #[arg(long)]
    with_args: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Print descriptors as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct HelpArgs {
    /// Package id of the module.
    package_id: String,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Output JSON bundle path.
    #[arg(long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create registry tables in the database.
    Up,
    /// Drop registry tables from the database.
    Down,
    /// Show table status and row counts.
    Status,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match cli.command {
        Command::Register(args) => run_register(&cli.global, args),
        Command::Unregister(args) => run_unregister(&cli.global, args),
        Command::Lookup(args) => run_lookup(&cli.global, args),
        Command::Resolve(args) => run_resolve(&cli.global, args),
        Command::List(args) => run_list(&cli.global, args),
        Command::Help(args) => run_help(&cli.global, args),
        Command::Export(args) => run_export(&cli.global, args),
        Command::Migrate(args) => run_migrate(&cli.global, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Err(e) = result {
        eprintln!("Log system initialization failed: {e}");
    }
}

// ---------------------------------------------------------------------------
// Registry setup
// ---------------------------------------------------------------------------

/// Where the registry lives, after merging the config file with flags.
struct Storage {
    config: RegistryConfig,
    db: PathBuf,
    prefix: String,
}

fn resolve_storage(global: &GlobalArgs) -> Result<Storage, String> {
    let config = match &global.config {
        Some(path) => RegistryConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => RegistryConfig::default(),
    };

    let db = global
        .db
        .clone()
        .or_else(|| config.storage.path.clone())
        .ok_or_else(|| "No database given: pass --db or set storage.path in the config".to_string())?;
    let prefix = global
        .prefix
        .clone()
        .unwrap_or_else(|| config.storage.prefix.clone());

    Ok(Storage { config, db, prefix })
}

fn open_registry(global: &GlobalArgs) -> Result<Registry, String> {
    let storage = resolve_storage(global)?;
    let store = SqliteStore::open(&storage.db, storage.prefix.as_str())
        .map_err(|e| format!("Failed to open database '{}': {e}", storage.db.display()))?;

    let registry = Registry::builder()
        .store(store.clone())
        .help_store(store)
        .config(storage.config)
        .build()
        .map_err(|e| format!("Failed to load registry: {e}"))?;

    let report = registry.load_report();
    debug!(
        loaded = report.loaded.len(),
        skipped = report.skipped.len(),
        db = %storage.db.display(),
        "Opened registry"
    );
    Ok(registry)
}

// ---------------------------------------------------------------------------
// register / unregister
// ---------------------------------------------------------------------------

fn run_register(global: &GlobalArgs, args: RegisterArgs) -> Result<(), String> {
    if args.file.is_empty() && args.dir.is_empty() && args.bundle.is_empty() {
        return Err("Failed to load descriptors: pass --file, --dir or --bundle".to_string());
    }

    // Every source is loaded; a broken one aborts before anything is registered
    let mut builder = DescriptorSet::builder();
    for file in args.file {
        builder = builder.from_file(file);
    }
    for dir in args.dir {
        builder = builder.from_dir(dir);
    }
    for bundle in args.bundle {
        builder = builder.from_bundle(bundle);
    }
    let set = builder
        .build()
        .map_err(|e| format!("Failed to load descriptors: {e}"))?;

    let registry = open_registry(global)?;
    let total = set.len();
    let mut failed = 0usize;

    for descriptor in set.into_descriptors() {
        let package_id = descriptor.package_id.clone();
        match registry.register_module(descriptor) {
            Ok(()) => println!("Registered {package_id}"),
            // The in-memory registration stands; only the mirror write failed
            Err(RegistryError::Store(e)) => {
                eprintln!("{package_id}: registered but not persisted: {e}");
                failed += 1;
            }
            Err(e) => {
                eprintln!("{package_id}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {total} module(s) failed to register"));
    }
    Ok(())
}

fn run_unregister(global: &GlobalArgs, args: UnregisterArgs) -> Result<(), String> {
    let registry = open_registry(global)?;
    let removed = registry
        .unregister_module(&args.package_id)
        .map_err(|e| format!("Failed to unregister '{}': {e}", args.package_id))?;

    if removed {
        println!("Unregistered {}", args.package_id);
    } else {
        println!("{} is not registered", args.package_id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// lookup / resolve / list / help
// ---------------------------------------------------------------------------

fn run_lookup(global: &GlobalArgs, args: LookupArgs) -> Result<(), String> {
    let registry = open_registry(global)?;
    let entry = registry
        .lookup(&args.name)
        .ok_or_else(|| format!("No command or alias '{}'", args.name))?;

    let aliases: Vec<String> = registry
        .aliases()
        .into_iter()
        .filter(|(_, command)| command == entry.name())
        .map(|(alias, _)| alias)
        .collect();

    println!("{}", entry.name());
    println!("  Aliases: {}", join_or_dash(&aliases));
    println!(
        "  Providers: {}",
        join_or_dash(&entry.providers().collect::<Vec<_>>())
    );
    println!("  Default: {}", entry.default_provider().unwrap_or("-"));
    println!(
        "  Default with arguments: {}",
        entry.default_with_args_provider().unwrap_or("-")
    );
    for (sub_command, owner) in entry.sub_commands() {
        println!("  Sub-command {sub_command}: {owner}");
    }
    Ok(())
}

fn run_resolve(global: &GlobalArgs, args: ResolveArgs) -> Result<(), String> {
    let registry = open_registry(global)?;
    let resolution = registry
        .resolve(&args.name, args.sub_command.as_deref(), args.with_args)
        .ok_or_else(|| format!("No module executes '{}'", args.name))?;
    println!("{}", resolution.package_id);
    Ok(())
}

fn run_list(global: &GlobalArgs, args: ListArgs) -> Result<(), String> {
    let registry = open_registry(global)?;
    let modules = registry.list_modules();

    if args.json {
        let raw = serde_json::to_string_pretty(&modules)
            .map_err(|err| format!("Failed to serialize modules: {err}"))?;
        println!("{raw}");
        return Ok(());
    }

    for module in &modules {
        println!(
            "{}\t{}\t{}",
            module.package_id,
            module.display_name,
            module.command_names().join(",")
        );
    }
    Ok(())
}

fn run_help(global: &GlobalArgs, args: HelpArgs) -> Result<(), String> {
    let registry = open_registry(global)?;
    if !registry.contains_module(&args.package_id) {
        return Err(format!("{} is not registered", args.package_id));
    }

    let help = registry
        .help(&args.package_id)
        .map_err(|e| format!("Failed to read help for '{}': {e}", args.package_id))?;
    for line in &help {
        let mut usage = line.command.clone();
        if let Some(sub_command) = &line.sub_command {
            usage.push(' ');
            usage.push_str(sub_command);
        }
        if let Some(arg) = arg_placeholder(&line.arg_type) {
            usage.push(' ');
            usage.push_str(&arg);
        }
        println!("{usage}  {}", line.description);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

fn run_export(global: &GlobalArgs, args: ExportArgs) -> Result<(), String> {
    let registry = open_registry(global)?;
    let mut bundle = ModuleBundle::new(PACKAGE_VERSION, chrono::Utc::now().to_rfc3339());
    bundle.modules = registry.list_modules();

    create_parent_dir(&args.output)?;
    let raw = serde_json::to_string_pretty(&bundle)
        .map_err(|err| format!("Failed to serialize module bundle: {err}"))?;
    fs::write(&args.output, raw)
        .map_err(|err| format!("Failed to write '{}': {err}", args.output.display()))?;

    println!(
        "Exported {} module(s) into '{}'.",
        bundle.module_count(),
        args.output.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(global: &GlobalArgs, args: MigrateArgs) -> Result<(), String> {
    let storage = resolve_storage(global)?;
    let conn = rusqlite::Connection::open(&storage.db)
        .map_err(|e| format!("Failed to open database '{}': {e}", storage.db.display()))?;
    let mut migration = Migration::new(conn, storage.prefix.as_str())
        .map_err(|e| format!("Failed to initialize migration: {e}"))?;

    match args.operation {
        MigrateOperation::Up => {
            migration
                .up()
                .map_err(|e| format!("Migration up failed: {e}"))?;
            println!(
                "Migration up complete. Tables created with prefix '{}' in '{}'.",
                storage.prefix,
                storage.db.display()
            );
        }
        MigrateOperation::Down => {
            migration
                .down()
                .map_err(|e| format!("Migration down failed: {e}"))?;
            println!(
                "Migration down complete. Tables with prefix '{}' dropped from '{}'.",
                storage.prefix,
                storage.db.display()
            );
        }
        MigrateOperation::Status => {
            let status = migration
                .status()
                .map_err(|e| format!("Failed to get migration status: {e}"))?;
            println!("Migration Status:");
            println!(
                "  Tables exist: {}",
                if status.tables_exist { "yes" } else { "no" }
            );
            println!("  Module count: {}", status.module_count);
            println!("  Command count: {}", status.command_count);
            println!("  Help count: {}", status.help_count);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn join_or_dash<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(|item| item.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Usage placeholder for an argument kind; `None` takes no argument.
fn arg_placeholder(arg_type: &ArgType) -> Option<String> {
    let placeholder = match arg_type {
        ArgType::None => return None,
        ArgType::Path => "<path>".to_string(),
        ArgType::PhoneNumber => "<phone number>".to_string(),
        ArgType::ContactName => "<contact>".to_string(),
        ArgType::Number => "<number>".to_string(),
        ArgType::Text => "<text>".to_string(),
        ArgType::Other(name) => format!("<{name}>"),
    };
    Some(placeholder)
}

fn create_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    Ok(())
}
