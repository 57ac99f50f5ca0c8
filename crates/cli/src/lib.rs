pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "conclave",
    about = "Conclave operator CLI",
    long_about = "Operate the resolution package engine: migrations, fixtures, package review and execution.",
    after_help = "Examples:\n  conclave migrate\n  conclave show sess-roadmap-001\n  conclave approve sess-roadmap-001 item-1\n  conclave execute sess-roadmap-001\n  conclave doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the deterministic seed dataset and verify it against its contract")]
    Seed,
    #[command(about = "Print a session's resolution package as JSON")]
    Show {
        #[arg(help = "Session id")]
        session: String,
    },
    #[command(about = "Approve one pending package item")]
    Approve {
        #[arg(help = "Session id")]
        session: String,
        #[arg(help = "Item id")]
        item: String,
    },
    #[command(about = "Reject one pending package item")]
    Reject {
        #[arg(help = "Session id")]
        session: String,
        #[arg(help = "Item id")]
        item: String,
    },
    #[command(name = "approve-all", about = "Approve every pending item in a session's package")]
    ApproveAll {
        #[arg(help = "Session id")]
        session: String,
    },
    #[command(about = "Execute every approved item of a session's package, in package order")]
    Execute {
        #[arg(help = "Session id")]
        session: String,
    },
    #[command(about = "Validate configuration and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Show { session } => commands::package::show(&session),
        Command::Approve { session, item } => commands::package::approve(&session, &item),
        Command::Reject { session, item } => commands::package::reject(&session, &item),
        Command::ApproveAll { session } => commands::package::approve_all(&session),
        Command::Execute { session } => commands::package::execute(&session),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Diagnostics go to stderr so stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
