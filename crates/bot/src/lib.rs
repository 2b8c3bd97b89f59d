//! `capitulo_cero`
//!
//! Telegram front end of the Capítulo Cero reading assistant. Loads settings, opens the record
//! store and routes updates into the flows of `capitulo_core`.
use crate::errors::StartupError;
use crate::handlers::{BotCommand, on_callback, on_command, on_text};
use crate::settings::Settings;
use crate::state::AppState;
use capitulo_core::catalog::client::GoogleBooksClient;
use capitulo_core::database::queries::Db;
use capitulo_core::flow::FlowController;
use std::process::ExitCode;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands as _;
use tracing_subscriber::{EnvFilter, fmt};

/// Error types
pub mod errors;
/// Telegram update endpoints
mod handlers;
/// Environment based configuration
pub mod settings;
/// Shared handler state
mod state;

const DEFAULT_LOG_FILTER: &str = "info";

/// Runs the bot until it receives Ctrl-C.
#[allow(
    clippy::missing_inline_in_public_items,
    reason = "Executed once per run, never across crate boundaries"
)]
#[allow(
    clippy::print_stderr,
    reason = "Tracing might not be available here if run_safe() failed before its initialization"
)]
pub async fn run() -> ExitCode {
    match run_safe().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Failed to start Capítulo Cero! Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> Result<(), StartupError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // also installs the `log` bridge, so records from the core crate and teloxide show up
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| StartupError::Tracing(err.to_string()))
}

/// Encapsulated run function that returns startup errors instead of exiting.
async fn run_safe() -> Result<(), StartupError> {
    init_tracing()?;
    let settings = Settings::from_env()?;
    tracing::info!(?settings, "Starting Capítulo Cero");

    let db = Db::connect(&settings.database_url).await?;
    let catalog = GoogleBooksClient::new(settings.catalog.clone())?;
    let state = Arc::new(AppState::new(FlowController::new(db.clone(), catalog)));

    let bot = Bot::new(&settings.bot_token);
    if let Err(err) = bot.set_my_commands(BotCommand::bot_commands()).await {
        tracing::warn!(%err, "Could not publish the command list");
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<BotCommand>()
                        .endpoint(on_command),
                )
                .branch(dptree::endpoint(on_text)),
        )
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Shutting down");
    db.close().await;
    Ok(())
}
