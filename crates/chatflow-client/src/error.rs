use thiserror::Error;

use chatflow_store::StoreError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Preference store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Chat session task failed: {0}")]
    Session(#[from] tokio::task::JoinError),
}
