use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table}: row {key} already exists")]
    Conflict { table: &'static str, key: String },

    #[error("{table}: row {key} not found")]
    MissingRow { table: &'static str, key: String },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot error: {0}")]
    Snapshot(String),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Snapshot(e.to_string())
    }
}
