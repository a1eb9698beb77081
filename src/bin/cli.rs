//! SpendWise CLI
//!
//! Maintenance commands over a local SpendWise database.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spendwise::error::Result;
use spendwise::schema::register_default_models;
use spendwise::storage::{parse_filter, FindOptions, SortOrder};
use spendwise::sync::settings::{KEY_DATE_BACKUP, KEY_DATE_SYNC, KEY_FILE_ID};
use spendwise::sync::{JsonFileSettings, RemoteStore, SettingsStore};
use spendwise::{
    DataSync, EntityStore, Filter, Migrator, OperationResult, SchemaRegistry, SpendwiseError,
    SqlEngine, SqliteEngine, StorageConfig, StorageMode,
};

#[derive(Parser)]
#[command(name = "spendwise-cli")]
#[command(about = "SpendWise database maintenance")]
#[command(version)]
struct Cli {
    /// Database path
    #[arg(long, env = "SPENDWISE_DB_PATH")]
    db_path: Option<String>,

    /// Settings file (holds the backup id and sync cursor)
    #[arg(long, env = "SPENDWISE_SETTINGS")]
    settings: Option<String>,

    /// Journal mode: local (WAL) or cloud-safe (DELETE)
    #[arg(long, env = "SPENDWISE_STORAGE_MODE", default_value = "local")]
    storage_mode: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update tables for the built-in entities
    Migrate {
        /// Also add/drop columns on existing tables
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        check_update: bool,
    },
    /// Export every table as a JSON document
    Export {
        /// Output file
        path: PathBuf,
    },
    /// Import a JSON document (current or legacy layout)
    Import {
        /// Input file
        path: PathBuf,
        /// Clear every table first
        #[arg(long)]
        replace: bool,
    },
    /// Query one entity
    Find {
        /// Entity type, e.g. SpendItem
        entity: String,
        /// Filter as JSON, e.g. '{"price": {"$gt": 10000}}'
        #[arg(short, long)]
        filter: Option<String>,
        /// Sort column
        #[arg(short, long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Maximum rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Row counts, database size and backup state
    Stats,
    /// Upload a backup to Google Drive
    #[cfg(feature = "drive")]
    Backup {
        /// OAuth access token
        #[arg(long, env = "SPENDWISE_ACCESS_TOKEN")]
        token: String,
    },
    /// Merge the Google Drive backup into the local database
    #[cfg(feature = "drive")]
    Sync {
        /// OAuth access token
        #[arg(long, env = "SPENDWISE_ACCESS_TOKEN")]
        token: String,
    },
}

fn default_data_path(file: &str) -> String {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spendwise")
        .join(file)
        .to_string_lossy()
        .into_owned()
}

fn expand(path: Option<String>, default_file: &str) -> String {
    let path = path.unwrap_or_else(|| default_data_path(default_file));
    shellexpand::tilde(&path).into_owned()
}

fn report(result: OperationResult) -> Result<()> {
    match result.error {
        None => {
            println!("{}", result.message);
            Ok(())
        }
        Some(e) => {
            eprintln!("{}", result.message);
            Err(e)
        }
    }
}

struct App {
    engine: Arc<SqliteEngine>,
    registry: Arc<SchemaRegistry>,
    settings: Arc<JsonFileSettings>,
}

impl App {
    fn open(cli: &Cli) -> Result<Self> {
        let storage_mode: StorageMode = cli.storage_mode.parse()?;
        let config = StorageConfig {
            storage_mode,
            ..StorageConfig::local(expand(cli.db_path.clone(), "spendwise.db"))
        };
        let engine = Arc::new(SqliteEngine::open(config)?);

        let registry = Arc::new(SchemaRegistry::new());
        register_default_models(&registry)?;

        let settings = Arc::new(JsonFileSettings::open(expand(
            cli.settings.clone(),
            "settings.json",
        ))?);

        Ok(Self {
            engine,
            registry,
            settings,
        })
    }

    fn sql_engine(&self) -> Arc<dyn SqlEngine> {
        self.engine.clone()
    }

    fn data_sync(&self, remote: Arc<dyn RemoteStore>) -> DataSync {
        DataSync::new(
            self.sql_engine(),
            self.registry.clone(),
            remote,
            self.settings.clone(),
        )
    }

    #[cfg(feature = "drive")]
    fn drive_sync(&self) -> DataSync {
        self.data_sync(Arc::new(spendwise::sync::DriveClient::new()))
    }

    /// Local-only commands never touch the remote store
    fn offline_sync(&self) -> DataSync {
        self.data_sync(Arc::new(spendwise::sync::MemoryRemoteStore::new()))
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::open(&cli)?;

    // Tables must exist before anything reads them
    if !matches!(cli.command, Commands::Migrate { .. }) {
        let summary = Migrator::new(app.sql_engine()).migrate_all(&app.registry, false);
        if let Some((_, e)) = summary.failures.into_iter().next() {
            return Err(e);
        }
    }

    match cli.command {
        Commands::Migrate { check_update } => {
            let summary = Migrator::new(app.sql_engine()).migrate_all(&app.registry, check_update);
            for migration in &summary.reports {
                if migration.is_noop() {
                    println!("{}: up to date", migration.table);
                } else {
                    println!(
                        "{}: created={} added={:?} removed={:?}",
                        migration.table, migration.created, migration.added, migration.removed
                    );
                }
            }
            if let Some((entity, e)) = summary.failures.into_iter().next() {
                eprintln!("{}: migration failed", entity);
                return Err(e);
            }
        }

        Commands::Export { path } => report(app.offline_sync().export_to_file(&path))?,

        Commands::Import { path, replace } => {
            report(app.offline_sync().import_from_file(&path, replace))?
        }

        Commands::Find {
            entity,
            filter,
            sort,
            desc,
            limit,
        } => {
            let filter = match filter {
                Some(text) => parse_filter(&serde_json::from_str(&text)?)?,
                None => Filter::new(),
            };
            let mut options = FindOptions::default();
            if let Some(column) = sort {
                let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
                options = options.sort_by(column, order);
            }
            if let Some(limit) = limit {
                options = options.limit(limit);
            }

            let store = EntityStore::for_entity(app.sql_engine(), &app.registry, &entity)?;
            let records = store.find_with(&filter, &options)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Commands::Stats => {
            let mut tables = serde_json::Map::new();
            for schema in app.registry.schemas() {
                let table = schema.table().to_string();
                let count = EntityStore::new(app.sql_engine(), schema).count(&Filter::new())?;
                tables.insert(table, count.into());
            }
            let stats = serde_json::json!({
                "db_path": app.engine.db_path(),
                "db_size_bytes": app.engine.db_size()?,
                "tables": tables,
                "backup_file_id": app.settings.get(KEY_FILE_ID),
                "last_backup": app.settings.get(KEY_DATE_BACKUP),
                "last_sync": app.settings.get(KEY_DATE_SYNC),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        #[cfg(feature = "drive")]
        Commands::Backup { token } => report(app.drive_sync().backup(&token).await)?,

        #[cfg(feature = "drive")]
        Commands::Sync { token } => report(app.drive_sync().sync(&token).await)?,
    }

    app.engine.close()?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

fn exit_status(e: &SpendwiseError) -> u8 {
    u8::try_from(e.code()).unwrap_or(1)
}
