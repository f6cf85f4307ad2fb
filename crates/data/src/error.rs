use thiserror::Error;

/// Failure to obtain a snapshot from the venue. Always transient.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("wallet address is empty")]
    InvalidWallet,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure reading or writing a checkpoint.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("checkpoint row for {wallet} is keyed {row_coin} but holds {data_coin}")]
    CorruptRow {
        wallet: String,
        row_coin: String,
        data_coin: String,
    },
}
