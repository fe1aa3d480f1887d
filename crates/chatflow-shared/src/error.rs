use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed payload for event {event}: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
