use std::sync::Arc;

use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};

use crate::error::StartupError;
use crate::pki::ServerIdentity;

/// Build the server configuration: present `identity`, and demand a client
/// certificate that chains to `roots`.
///
/// Clients without a certificate, or with one that fails verification, are
/// refused during the handshake. Chain validation is left entirely to
/// webpki.
pub fn server_config(
    roots: Arc<RootCertStore>,
    identity: ServerIdentity,
) -> Result<Arc<ServerConfig>, StartupError> {
    let verifier = WebPkiClientVerifier::builder(roots).build()?;

    let mut server_config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(identity.cert_chain, identity.key)?;
    server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(server_config))
}
