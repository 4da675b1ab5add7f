//! Command-line settings editor for the *arr dashboard
//!
//! Edits instance connections, usenet servers and general settings through
//! the dashboard's REST API, with the same validation, secret handling and
//! connection probing as the web editor.

mod commands;
mod config;
mod terminal;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use arr_settings_api::{AppType, HttpSettingsBackend};
use arr_settings_core::ServiceContext;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Assignment, Commands};
use config::CliConfig;
use terminal::{StdinConfirmer, TerminalNotifier};

#[derive(Parser)]
#[command(name = "arr-settings", version, about)]
struct Cli {
    /// Path to the config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dashboard base URL.
    #[arg(long, global = true, env = "ARR_SETTINGS_URL")]
    url: Option<String>,

    /// Answer yes to every confirmation.
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the instances of an app.
    Show {
        app: AppType,
        /// Test every instance's connection.
        #[arg(long)]
        status: bool,
    },
    /// Print the editor markup of an instance, a usenet server (`nzb_hunt`)
    /// or an app-level page.
    Render {
        app: AppType,
        #[arg(long, conflicts_with = "new")]
        index: Option<usize>,
        /// Render the form for a new instance.
        #[arg(long)]
        new: bool,
    },
    /// Test the connection of one instance.
    Test { app: AppType, index: usize },
    /// Change fields of an instance (`key=value`).
    Set {
        app: AppType,
        index: usize,
        #[arg(required = true)]
        fields: Vec<Assignment>,
    },
    /// Add an instance (`key=value`).
    Add {
        app: AppType,
        #[arg(required = true)]
        fields: Vec<Assignment>,
    },
    /// Delete an instance. Later instances move up by one.
    Delete { app: AppType, index: usize },
    /// NZB Hunt usenet servers.
    #[command(subcommand)]
    Servers(ServerCommand),
    /// Dashboard-wide settings.
    #[command(subcommand)]
    General(GeneralCommand),
}

#[derive(Subcommand)]
enum ServerCommand {
    /// List servers.
    List {
        #[arg(long)]
        status: bool,
    },
    /// Add a server (`key=value`).
    Add {
        #[arg(required = true)]
        fields: Vec<Assignment>,
    },
    /// Test a saved server, reusing its stored password.
    Test { index: usize },
    /// Delete a server.
    Delete { index: usize },
}

#[derive(Subcommand)]
enum GeneralCommand {
    /// Print the general settings.
    Show,
    /// Change general settings (`key=value`).
    Set {
        #[arg(required = true)]
        fields: Vec<Assignment>,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?.with_url(cli.url);
    tracing::debug!("Using dashboard at {}", config.client.base_url);

    let backend = Arc::new(HttpSettingsBackend::new(&config.client)?);
    let ctx = Arc::new(ServiceContext::new(
        backend,
        Arc::new(TerminalNotifier),
        config.editor,
    ));
    let commands = Commands::new(ctx, StdinConfirmer { assume_yes: cli.yes });

    match cli.command {
        Command::Show { app, status } => commands.show(app, status).await,
        Command::Render { app, index, new } => commands.render(app, index, new).await,
        Command::Test { app, index } => commands.test(app, index).await,
        Command::Set { app, index, fields } => commands.set(app, index, &fields).await,
        Command::Add { app, fields } => commands.add(app, &fields).await,
        Command::Delete { app, index } => commands.delete(app, index).await,
        Command::Servers(ServerCommand::List { status }) => commands.servers_list(status).await,
        Command::Servers(ServerCommand::Add { fields }) => commands.servers_add(&fields).await,
        Command::Servers(ServerCommand::Test { index }) => commands.servers_test(index).await,
        Command::Servers(ServerCommand::Delete { index }) => commands.servers_delete(index).await,
        Command::General(GeneralCommand::Show) => commands.general_show().await,
        Command::General(GeneralCommand::Set { fields }) => commands.general_set(&fields).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; command output owns stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {e:?}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
