use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] stakelock_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] stakelock_store_lmdb::LmdbError),

    #[error("protocol error: {0}")]
    Protocol(#[from] stakelock_protocol::ProtocolError),

    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("data directory error: {0}")]
    DataDir(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
