use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Pass errors
    #[error("Invalid pass identifier: {0}")]
    InvalidPass(String),

    // Slot errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Slot {slot} out of range (slot count {count})")]
    SlotOutOfRange { slot: usize, count: usize },

    // Document errors
    #[error("Invalid profile document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    // Worker errors
    #[error("Failed to spawn worker thread {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
