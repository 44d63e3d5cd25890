use std::io;

use acs_chat_core::RagErr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Rag(#[from] RagErr),

    #[error("cannot load environment file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("{0}")]
    General(String),
}
