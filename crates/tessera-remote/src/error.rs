use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cluster config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("error loading ca roots from {}", .0.display())]
    NoRoots(PathBuf),

    #[error("error loading ca roots from {}: {reason}", .path.display())]
    InvalidRoots { path: PathBuf, reason: String },

    #[error("peer presented no certificates")]
    EmptyChain,

    #[error("certificate chain rejected: {0}")]
    ChainRejected(String),

    #[error("expected certificate to match something in server_name_urls, but it did not")]
    UrlMismatch,

    #[error("expected certificate to match something in server_name_dns, but it did not")]
    DnsMismatch,

    #[error("dial failed: {0}")]
    Dial(String),

    #[error("connect to {endpoint} timed out after {attempts} attempts")]
    ConnectTimeout { endpoint: String, attempts: u32 },
}

pub type RemoteResult<T> = Result<T, RemoteError>;
