use std::process::ExitCode;

use acs_chat_cli::Cli;
use acs_chat_cli::error::CliError;
use acs_chat_cli::messages::describe;
use acs_chat_cli::run_main;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_main(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Rag(err)) => {
            eprintln!("{}", describe(&err));
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("acs-chat: {err}");
            ExitCode::FAILURE
        }
    }
}
