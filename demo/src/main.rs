//! Activity-log core demo CLI.
//!
//! Usage:
//!   cargo run -p demo -- run
//!   cargo run -p demo -- run --store activity.jsonl --config activity.toml
//!   cargo run -p demo -- history --store activity.jsonl --principal 7
//!   cargo run -p demo -- schema --dialect sqlite

mod report;
mod scenario;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use actlog_config::ActivityConfig;
use actlog_contracts::{
    error::{ActivityError, ActivityResult},
    record::{ActivityQuery, PrincipalId, SubjectRef},
};
use actlog_core::{traits::ActivityStore, ContextRegistry};
use actlog_store::{create_statements, Dialect, InMemoryActivityStore, JsonlActivityStore};

use scenario::Session;

/// Configuration used when `--config` is not given.
const DEFAULT_CONFIG: &str = r#"
failure_policy = "propagate"

[contexts]
update_context = "update"

[subjects.articles]
"#;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Activity-log core demo.
///
/// Records the lifecycle of an article, queries stored history, and renders
/// the relational schema.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Activity-log core demo",
    long_about = "Walks an article through create, update, publish and delete,\n\
                  recording each step as an activity record with its update context."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the editorial lifecycle and print the article's history.
    Run {
        /// JSONL journal to write to. In memory when omitted.
        #[arg(long)]
        store: Option<PathBuf>,
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print stored activity from a journal.
    History {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Subject type tag, e.g. `articles`. Requires `--subject-id`.
        #[arg(long, requires = "subject_id")]
        subject_type: Option<String>,
        #[arg(long, requires = "subject_type")]
        subject_id: Option<String>,
        /// Only records this principal is responsible for.
        #[arg(long)]
        principal: Option<i64>,
    },
    /// Print the DDL for every registered context table.
    Schema {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = SqlDialect::Postgres)]
        dialect: SqlDialect,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SqlDialect {
    Postgres,
    Sqlite,
}

impl From<SqlDialect> for Dialect {
    fn from(dialect: SqlDialect) -> Self {
        match dialect {
            SqlDialect::Postgres => Dialect::Postgres,
            SqlDialect::Sqlite => Dialect::Sqlite,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-event output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { store, config } => {
            print_banner();
            run(store.as_deref(), config.as_deref())
        }
        Command::History {
            store,
            config,
            subject_type,
            subject_id,
            principal,
        } => {
            let subject = subject_type.zip(subject_id).map(|(t, id)| SubjectRef::new(t, id));
            history(&store, config.as_deref(), subject, principal.map(PrincipalId))
        }
        Command::Schema { config, dialect } => schema(config.as_deref(), dialect.into()),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> ActivityResult<ActivityConfig> {
    match path {
        Some(path) => ActivityConfig::from_file(path),
        None => ActivityConfig::from_toml_str(DEFAULT_CONFIG),
    }
}

fn open_store(path: Option<&Path>) -> ActivityResult<Box<dyn ActivityStore>> {
    Ok(match path {
        Some(path) => Box::new(JsonlActivityStore::open(path)?),
        None => Box::new(InMemoryActivityStore::new()),
    })
}

fn run(store: Option<&Path>, config: Option<&Path>) -> ActivityResult<()> {
    let config = load_config(config)?;
    let registry = config.registry(ContextRegistry::with_defaults())?;
    let session = Session::default();
    let hooks = config.build_dispatcher(open_store(store)?, registry, Some(session.resolver()))?;

    info!(policy = ?hooks.policy(), "dispatcher ready");

    println!("=== Editorial lifecycle ===");
    println!();
    let entries = scenario::run_scenario(&hooks, &session)?;

    println!("=== Article history ===");
    println!();
    report::history(&entries);
    println!();
    Ok(())
}

fn history(
    store: &Path,
    config: Option<&Path>,
    subject: Option<SubjectRef>,
    principal: Option<PrincipalId>,
) -> ActivityResult<()> {
    if !store.exists() {
        return Err(ActivityError::storage(format!(
            "journal '{}' does not exist",
            store.display()
        )));
    }

    let config = load_config(config)?;
    let registry = config.registry(ContextRegistry::with_defaults())?;
    let relations: Vec<String> = registry.bindings().map(|(name, _)| name.to_string()).collect();
    let logger = config.build_logger(open_store(Some(store))?, registry, None)?;

    let mut query = ActivityQuery::all();
    if let Some(subject) = subject {
        query = query.for_subject(subject);
    }
    if let Some(principal) = principal {
        query = query.by_principal(principal);
    }
    let query = relations.into_iter().fold(query, |query, name| query.with(name));

    report::history(&logger.query(&query)?);
    Ok(())
}

fn schema(config: Option<&Path>, dialect: Dialect) -> ActivityResult<()> {
    let config = load_config(config)?;
    let registry = config.registry(ContextRegistry::with_defaults())?;

    println!("-- responsible_id refers to {}.id", config.user_model);
    for statement in create_statements(&registry, dialect) {
        println!("{};", statement);
        println!();
    }
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Activity-log core");
    println!("=================");
    println!();
    println!("Per lifecycle event:");
    println!("  [1] Hook dispatcher checks the subject type's audited events");
    println!("  [2] Updates: dirty attributes are diffed into an update context");
    println!("  [3] Logger resolves the responsible principal (explicit or current)");
    println!("  [4] Record and context are persisted as one unit");
    println!();
}
