use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}
