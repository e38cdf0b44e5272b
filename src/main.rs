//! Sqlporter CLI Entry Point
//!
//! Thin command-line surface over the sqlporter library. Subcommands:
//! - `profile` - named connection profile management (add/list/remove/test)
//! - `exec` - classify and execute one SQL statement or mutating batch
//! - `export` / `export-table` / `export-db` - serialize data as CSV or INSERT dumps
//! - `import-sql` / `import-csv` - atomic batch ingestion
//! - `tables` / `structure` / `databases` / `create-db` - schema introspection
//!
//! All stdout output is JSON: one success or error envelope per invocation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use sqlporter::{
    export, import, profile::default_store_path, ConnectionProfile, DatabaseEngine, ErrorEnvelope,
    ExportFormat, FieldBinding, Metadata, MySqlEngine, ProfileStore, Result, SqlPorterError,
    SuccessEnvelope,
};

/// Sqlporter - SQL execution and data interchange for MySQL
#[derive(Parser)]
#[command(name = "sqlporter")]
#[command(about = "SQL execution and data interchange engine for MySQL")]
#[command(version)]
struct Cli {
    /// Profile store file (defaults to the per-user store)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage named connection profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Execute SQL against a profile
    Exec {
        /// Profile name
        #[arg(long)]
        profile: String,

        /// SQL text (mutually exclusive with --file)
        #[arg(long)]
        sql: Option<String>,

        /// Read SQL text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Execute SQL and serialize the outcome as csv or insert_sql
    Export {
        #[arg(long)]
        profile: String,

        #[arg(long)]
        sql: String,

        /// Output format: insert_sql or csv
        #[arg(long)]
        format: String,

        /// Table name for the generated INSERT statements (inferred if omitted)
        #[arg(long)]
        table: Option<String>,
    },

    /// Export every row of one table
    ExportTable {
        #[arg(long)]
        profile: String,

        #[arg(long)]
        table: String,

        #[arg(long)]
        format: String,
    },

    /// Export every table of the profile's database
    ExportDb {
        #[arg(long)]
        profile: String,

        #[arg(long)]
        format: String,
    },

    /// Execute a multi-statement SQL file or blob as one atomic batch
    ImportSql {
        #[arg(long)]
        profile: String,

        #[arg(long)]
        sql: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Import CSV records into an existing table as one atomic batch
    ImportCsv {
        #[arg(long)]
        profile: String,

        #[arg(long)]
        table: String,

        /// CSV file (first line is the header)
        #[arg(long)]
        file: PathBuf,

        /// Field mapping entries, `position=column` or `header=column`
        #[arg(long = "map")]
        map: Vec<String>,
    },

    /// List base tables of the profile's database
    Tables {
        #[arg(long)]
        profile: String,
    },

    /// Show ordered column descriptors and index metadata for one table
    Structure {
        #[arg(long)]
        profile: String,

        #[arg(long)]
        table: String,
    },

    /// List databases on the instance (system schemas filtered)
    Databases {
        #[arg(long)]
        profile: String,
    },

    /// Create the profile's database if it does not exist
    CreateDb {
        #[arg(long)]
        profile: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Add a new named profile
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        host: String,

        #[arg(long, default_value_t = 3306)]
        port: u16,

        #[arg(long)]
        database: String,

        #[arg(long)]
        user: String,

        #[arg(long, default_value = "")]
        password: String,
    },

    /// List stored profiles (passwords redacted)
    List,

    /// Remove a profile by name
    Remove {
        #[arg(long)]
        name: String,
    },

    /// Open a connection and report server metadata
    Test {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let started = Instant::now();

    let command = command_name(&cli.command);
    let profile_name = profile_name(&cli.command).unwrap_or_default();

    match run(cli).await {
        Ok(data) => {
            let meta = Metadata::new(started.elapsed().as_millis() as u64);
            let envelope = SuccessEnvelope::new(profile_name, command, data, meta);
            println!("{}", serde_json::to_string(&envelope).expect("envelope serializes"));
        }
        Err(err) => {
            let envelope = ErrorEnvelope::from_error(profile_name, command, &err);
            println!("{}", serde_json::to_string(&envelope).expect("envelope serializes"));
            std::process::exit(1);
        }
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Profile { action } => match action {
            ProfileAction::Add { .. } => "profile-add",
            ProfileAction::List => "profile-list",
            ProfileAction::Remove { .. } => "profile-remove",
            ProfileAction::Test { .. } => "profile-test",
        },
        Commands::Exec { .. } => "exec",
        Commands::Export { .. } => "export",
        Commands::ExportTable { .. } => "export-table",
        Commands::ExportDb { .. } => "export-db",
        Commands::ImportSql { .. } => "import-sql",
        Commands::ImportCsv { .. } => "import-csv",
        Commands::Tables { .. } => "tables",
        Commands::Structure { .. } => "structure",
        Commands::Databases { .. } => "databases",
        Commands::CreateDb { .. } => "create-db",
    }
}

fn profile_name(command: &Commands) -> Option<String> {
    match command {
        Commands::Profile { action } => match action {
            ProfileAction::Add { name, .. }
            | ProfileAction::Remove { name }
            | ProfileAction::Test { name } => Some(name.clone()),
            ProfileAction::List => None,
        },
        Commands::Exec { profile, .. }
        | Commands::Export { profile, .. }
        | Commands::ExportTable { profile, .. }
        | Commands::ExportDb { profile, .. }
        | Commands::ImportSql { profile, .. }
        | Commands::ImportCsv { profile, .. }
        | Commands::Tables { profile }
        | Commands::Structure { profile, .. }
        | Commands::Databases { profile }
        | Commands::CreateDb { profile } => Some(profile.clone()),
    }
}

fn open_store(path: &Option<PathBuf>) -> Result<ProfileStore> {
    match path {
        Some(path) => ProfileStore::load(path),
        None => ProfileStore::load(default_store_path()?),
    }
}

fn resolve_profile(store_path: &Option<PathBuf>, name: &str) -> Result<ConnectionProfile> {
    let store = open_store(store_path)?;
    Ok(store.get(name)?.clone())
}

fn sql_from(sql: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (sql, file) {
        (Some(_), Some(_)) => {
            Err(SqlPorterError::invalid_input("pass either --sql or --file, not both"))
        }
        (Some(sql), None) => Ok(sql),
        (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
            SqlPorterError::invalid_input(format!("could not read {}: {e}", path.display()))
        }),
        (None, None) => Err(SqlPorterError::invalid_input("one of --sql or --file is required")),
    }
}

async fn run(cli: Cli) -> Result<serde_json::Value> {
    let store_path = cli.store;

    match cli.command {
        Commands::Profile { action } => run_profile(&store_path, action).await,

        Commands::Exec { profile, sql, file } => {
            let profile = resolve_profile(&store_path, &profile)?;
            let sql = sql_from(sql, file)?;
            let outcome = MySqlEngine::execute(&profile, &sql).await?;
            Ok(serde_json::to_value(outcome).expect("outcome serializes"))
        }

        Commands::Export { profile, sql, format, table } => {
            let format: ExportFormat = format.parse()?;
            let profile = resolve_profile(&store_path, &profile)?;
            let document = export::export_query(&profile, &sql, format, table.as_deref()).await?;
            Ok(serde_json::to_value(document).expect("document serializes"))
        }

        Commands::ExportTable { profile, table, format } => {
            let format: ExportFormat = format.parse()?;
            let profile = resolve_profile(&store_path, &profile)?;
            let document = export::export_table(&profile, &table, format).await?;
            Ok(serde_json::to_value(document).expect("document serializes"))
        }

        Commands::ExportDb { profile, format } => {
            let format: ExportFormat = format.parse()?;
            let profile = resolve_profile(&store_path, &profile)?;
            let document = export::export_database(&profile, format).await?;
            Ok(serde_json::to_value(document).expect("document serializes"))
        }

        Commands::ImportSql { profile, sql, file } => {
            let profile = resolve_profile(&store_path, &profile)?;
            let sql = sql_from(sql, file)?;
            let report = import::import_statements(&profile, &sql).await?;
            Ok(serde_json::to_value(report).expect("report serializes"))
        }

        Commands::ImportCsv { profile, table, file, map } => {
            let profile = resolve_profile(&store_path, &profile)?;
            let bytes = std::fs::read(&file).map_err(|e| {
                SqlPorterError::invalid_input(format!("could not read {}: {e}", file.display()))
            })?;
            let bindings = map
                .iter()
                .map(|entry| entry.parse::<FieldBinding>())
                .collect::<Result<Vec<_>>>()?;
            let mapping = if bindings.is_empty() { None } else { Some(bindings.as_slice()) };
            let report = import::import_csv(&profile, &table, &bytes, mapping).await?;
            Ok(serde_json::to_value(report).expect("report serializes"))
        }

        Commands::Tables { profile } => {
            let profile = resolve_profile(&store_path, &profile)?;
            let tables = MySqlEngine::list_tables(&profile).await?;
            Ok(serde_json::json!({ "tables": tables }))
        }

        Commands::Structure { profile, table } => {
            let profile = resolve_profile(&store_path, &profile)?;
            let columns = MySqlEngine::table_structure(&profile, &table).await?;
            if columns.is_empty() {
                return Err(SqlPorterError::schema_mismatch(format!(
                    "Table '{}.{}' does not exist",
                    profile.database, table
                )));
            }
            let details = MySqlEngine::table_details(&profile, &table).await?;
            Ok(serde_json::json!({ "columns": columns, "details": details }))
        }

        Commands::Databases { profile } => {
            let profile = resolve_profile(&store_path, &profile)?;
            let databases = MySqlEngine::list_databases(&profile).await?;
            Ok(serde_json::json!({ "databases": databases }))
        }

        Commands::CreateDb { profile } => {
            let profile = resolve_profile(&store_path, &profile)?;
            MySqlEngine::create_database(&profile).await?;
            Ok(serde_json::json!({ "database": profile.database, "created": true }))
        }
    }
}

async fn run_profile(
    store_path: &Option<PathBuf>,
    action: ProfileAction,
) -> Result<serde_json::Value> {
    match action {
        ProfileAction::Add { name, host, port, database, user, password } => {
            let mut store = open_store(store_path)?;
            store.add(ConnectionProfile { name: name.clone(), host, port, database, user, password })?;
            store.save()?;
            Ok(serde_json::json!({ "added": name }))
        }

        ProfileAction::List => {
            let store = open_store(store_path)?;
            let profiles: Vec<serde_json::Value> = store
                .list()
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.name,
                        "host": p.host,
                        "port": p.port,
                        "database": p.database,
                        "user": p.user,
                    })
                })
                .collect();
            Ok(serde_json::json!({ "profiles": profiles }))
        }

        ProfileAction::Remove { name } => {
            let mut store = open_store(store_path)?;
            store.remove(&name)?;
            store.save()?;
            Ok(serde_json::json!({ "removed": name }))
        }

        ProfileAction::Test { name } => {
            let profile = resolve_profile(store_path, &name)?;
            let info = MySqlEngine::validate_connection(&profile).await?;
            Ok(serde_json::to_value(info).expect("info serializes"))
        }
    }
}
