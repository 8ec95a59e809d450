use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("cache database could not be opened: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("cache database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("cache database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("cache database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("cache database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("generator '{name}' failed for project '{project}': {message}")]
    Generator {
        name: String,
        project: String,
        message: String,
    },

    #[error("search index build failed: {0}")]
    Index(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("cache directory does not exist and could not be created: {0}")]
    CacheDir(PathBuf),
}
