use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("failed to fetch active queries: {0}")]
    Connection(String),
    #[error("failed to decode processlist row {row}: {message}")]
    RowDecode { row: usize, message: String },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<mysql_async::Error> for ProfilerError {
    fn from(err: mysql_async::Error) -> Self {
        Self::Connection(err.to_string())
    }
}
