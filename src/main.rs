use std::process::ExitCode;

use crew_mcp_tools::{cli, infra};

#[tokio::main]
async fn main() -> ExitCode {
    // .env first so LOG_LEVEL/LOG_FILE from it apply to logging
    dotenvy::dotenv().ok();
    infra::logging::init();

    cli::run().await
}
