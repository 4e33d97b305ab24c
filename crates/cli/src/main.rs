mod error_presentation;
mod migrate_cmd;
mod registry;
mod schema_cmd;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atlas_core::{Error, StateError};

/// Exit codes: 0 success, 1 user error, 2 lock contention, 3 the target
/// state contradicts the migration history.
const EXIT_USER: i32 = 1;
const EXIT_LOCKED: i32 = 2;
const EXIT_DIRTY: i32 = 3;

#[derive(Debug, Parser)]
#[command(name = "atlas", about = "Schema-as-code engine for relational databases")]
struct Cli {
    /// Input variables for declarative documents (`name=value`).
    #[arg(long = "var", global = true)]
    vars: Vec<String>,
    /// Named configuration profile.
    #[arg(long = "env", global = true)]
    env: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Declarative workflow: inspect, diff, and apply schema states.
    Schema {
        #[command(subcommand)]
        command: SchemaCommand,
    },
    /// Versioned workflow: manage and execute a migration directory.
    Migrate {
        #[command(subcommand)]
        command: MigrateCommand,
    },
}

#[derive(Debug, Args)]
struct TargetFlags {
    /// Target database URL.
    #[arg(long)]
    url: String,
    /// Restrict operations to these schemas.
    #[arg(long = "schema")]
    schemas: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum SchemaCommand {
    /// Inspect the target and print its canonical form.
    Inspect(TargetFlags),
    /// Print the statements that reconcile the target with the desired
    /// state.
    Diff {
        #[command(flatten)]
        target: TargetFlags,
        /// Desired state URL.
        #[arg(long)]
        to: String,
        /// Twin database used to normalize the desired state.
        #[arg(long = "dev-url")]
        dev_url: Option<String>,
    },
    /// Diff and execute against the target.
    Apply {
        #[command(flatten)]
        target: TargetFlags,
        #[arg(long)]
        to: String,
        #[arg(long = "dev-url")]
        dev_url: Option<String>,
        #[arg(long = "dry-run")]
        dry_run: bool,
        #[arg(long = "auto-approve")]
        auto_approve: bool,
    },
    /// Drop every object in the connected schemas.
    Clean {
        #[command(flatten)]
        target: TargetFlags,
        #[arg(long = "auto-approve")]
        auto_approve: bool,
    },
}

#[derive(Debug, Args)]
struct DirFlags {
    /// Migration directory URL (`file://path`).
    #[arg(long, default_value = "file://migrations")]
    dir: String,
}

#[derive(Debug, Subcommand)]
enum MigrateCommand {
    /// Plan the changes between the migration history and a desired state
    /// and write them as a new migration file.
    Diff {
        #[command(flatten)]
        dir: DirFlags,
        /// Desired state URL.
        #[arg(long)]
        to: String,
        /// Twin database the directory is replayed against.
        #[arg(long = "dev-url")]
        dev_url: String,
        /// Name for the generated file.
        name: Option<String>,
    },
    /// Re-generate the directory checksum file.
    Hash(DirFlags),
    /// Verify directory integrity against the checksum file.
    Validate(DirFlags),
    /// Execute pending migration files against the target.
    Apply {
        #[command(flatten)]
        dir: DirFlags,
        #[arg(long)]
        url: String,
        /// Apply at most this many files; all pending when omitted.
        n: Option<usize>,
        /// Schema where the revision table lives.
        #[arg(long = "revisions-schema")]
        revisions_schema: Option<String>,
        #[arg(long = "lock-timeout-ms", default_value_t = 10_000)]
        lock_timeout_ms: u64,
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Print pending and applied versions for the target.
    Status {
        #[command(flatten)]
        dir: DirFlags,
        #[arg(long)]
        url: String,
        #[arg(long = "revisions-schema")]
        revisions_schema: Option<String>,
    },
    /// Record one revision manually without executing anything.
    Set {
        #[command(flatten)]
        dir: DirFlags,
        #[arg(long)]
        url: String,
        version: String,
        #[arg(long = "revisions-schema")]
        revisions_schema: Option<String>,
    },
    /// Create a new empty migration file.
    New {
        #[command(flatten)]
        dir: DirFlags,
        name: Option<String>,
    },
    /// Run the analyzers over the migration files.
    Lint(DirFlags),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = if !cli.vars.is_empty() || cli.env.is_some() {
        // Both flags feed the declarative document engine, which plugs in
        // through the evaluator interface and is not part of this binary.
        Err(anyhow::anyhow!(
            "--var and --env require a configuration document evaluator; \
             database-backed states take no input variables"
        ))
    } else {
        match cli.command {
            Command::Schema { command } => schema_cmd::run(command),
            Command::Migrate { command } => migrate_cmd::run(command),
        }
    };

    if let Err(error) = result {
        let code = exit_code(&error);
        eprintln!("{}", error_presentation::render(&error));
        std::process::exit(code);
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<Error>() {
        Some(Error::LockTimeout { .. }) => EXIT_LOCKED,
        Some(Error::State(StateError::ChecksumMismatch { .. }))
        | Some(Error::State(StateError::HistoryRewrite { .. }))
        | Some(Error::State(StateError::RevisionHash { .. }))
        | Some(Error::State(StateError::UnknownRevision { .. }))
        | Some(Error::State(StateError::VersionOrder { .. })) => EXIT_DIRTY,
        _ => EXIT_USER,
    }
}
