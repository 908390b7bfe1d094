pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod notify;
pub mod services;
pub mod session;
pub mod state;
pub mod tokens;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands, SettingsCommands};
pub use config::Config;
use notify::Notification;
use state::AppState;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub async fn run(config: Config) -> anyhow::Result<ExitCode> {
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    let cli = Cli::parse();
    let state = AppState::new(config)?;

    match dispatch(&state, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            debug!("Command failed: {err:#}");
            eprintln!("{}", Notification::from_error(&err));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn dispatch(state: &AppState, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init => cli::cmd_init(),

        Commands::Register {
            email,
            username,
            password,
        } => cli::cmd_register(state, &email, username.as_deref(), password).await,

        Commands::Login { email, password } => cli::cmd_login(state, &email, password).await,

        Commands::Logout => cli::cmd_logout(state),

        Commands::Whoami => cli::cmd_whoami(state),

        Commands::New { title } => cli::cmd_new(state, &title).await,

        Commands::List => cli::cmd_list(state).await,

        Commands::Show { id } => cli::cmd_show(state, &id).await,

        Commands::Rename { id, title } => cli::cmd_rename(state, &id, &title).await,

        Commands::Delete { id, yes } => cli::cmd_delete(state, &id, yes).await,

        Commands::Send {
            conversation,
            attach,
            message,
        } => cli::cmd_send(state, conversation.as_deref(), attach.as_deref(), &message).await,

        Commands::Models => cli::cmd_models(state).await,

        Commands::Settings { command } => match command {
            SettingsCommands::Show => cli::cmd_settings_show(state).await,
            SettingsCommands::Set { key, value } => {
                cli::cmd_settings_set(state, &key, &value).await
            }
        },
    }
}
