//! The entry point of the Capítulo Cero Telegram bot
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // a missing .env file is fine, the variables may come from the environment
    dotenvy::dotenv().ok();
    capitulo_cero_lib::run().await
}
