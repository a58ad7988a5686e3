use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use rustls::server::VerifierBuilderError;

/// Errors that stop the server before it accepts any connection.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid listen address {addr:?}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to read {}: {source}", path.display())]
    ReadPem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no usable certificate found in {}", path.display())]
    NoCertificates { path: PathBuf },

    #[error("no private key found in {}", path.display())]
    NoPrivateKey { path: PathBuf },

    #[error("failed to build client certificate verifier: {0}")]
    Verifier(#[from] VerifierBuilderError),

    #[error("failed to build TLS server config: {0}")]
    TlsConfig(#[from] rustls::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Errors that end the accept loop.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("unable to register listener with the runtime: {0}")]
    Register(#[source] io::Error),

    #[error("listener failed: {0}")]
    Accept(#[source] io::Error),
}
