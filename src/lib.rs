//! A small HTTPS server that only talks to clients holding a certificate
//! from a trusted CA, and shows them the Common Name it was issued to.
//!
//! Startup order is fixed: trust anchors, server identity, TLS
//! configuration, routes, listener. Any failure along the way is returned
//! from [`start`] and nothing is bound.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod page;
pub mod pki;
pub mod router;
pub mod server;
pub mod tls;

use crate::config::ServerSettings;
use crate::error::StartupError;
use crate::logging::Logger;
use crate::pki::ServerIdentity;
use crate::router::Router;
use crate::server::Server;

/// Load everything the server needs and bind the listener.
pub fn start(settings: &ServerSettings, log: &Logger) -> Result<Server, StartupError> {
    let roots = pki::load_trust_anchors(
        &settings.pem.ca,
        &log.scoped("mtls_demo_server::pki"),
    )?;
    let identity = ServerIdentity::load(&settings.pem.cert, &settings.pem.key)?;
    let tls = tls::server_config(Arc::new(roots), identity)?;
    let router = Router::new(settings.escaping, log.scoped("mtls_demo_server::router"));

    let server = Server::bind(
        settings.listen,
        tls,
        router,
        settings.timeout,
        log.scoped("mtls_demo_server::server"),
    )?;
    log.info(format_args!(
        "starting server: https://localhost:{}",
        server
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(settings.listen.port())
    ));
    Ok(server)
}
