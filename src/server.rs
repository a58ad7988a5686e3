//! The HTTPS listener: one tokio task per connection, each doing the rustls
//! handshake and then handing the stream to hyper for a single exchange.

use std::convert::Infallible;
use std::error::Error;
use std::future::Future;
use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rustls::pki_types::CertificateDer;
use rustls::ServerConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

use crate::error::{ServeError, StartupError};
use crate::logging::Logger;
use crate::router::{RequestContext, Router};

/// Read buffer hyper may grow to while parsing a request head. A head that
/// does not fit, or that has more than 100 header lines, is answered with
/// `431 Request Header Fields Too Large`.
pub const MAX_HEAD_BYTES: usize = 16 * 1024;

type BoxError = Box<dyn Error + Send + Sync>;

pub struct Server {
    listener: StdTcpListener,
    shared: Arc<Shared>,
}

struct Shared {
    acceptor: TlsAcceptor,
    router: Router,
    timeout: Option<Duration>,
    log: Logger,
}

impl Server {
    /// Bind `addr`. A `timeout` of `None` lets a connection take as long as
    /// it likes.
    ///
    /// Binding happens here, outside any runtime, so that startup failures
    /// surface before [`Server::serve`] is ever awaited.
    pub fn bind(
        addr: SocketAddr,
        tls: Arc<ServerConfig>,
        router: Router,
        timeout: Option<Duration>,
        log: Logger,
    ) -> Result<Self, StartupError> {
        let listener = StdTcpListener::bind(addr)
            .and_then(|listener| listener.set_nonblocking(true).map(|()| listener))
            .map_err(|source| StartupError::Bind { addr, source })?;
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                acceptor: TlsAcceptor::from(tls),
                router,
                timeout,
                log,
            }),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails. Must run inside a tokio
    /// runtime.
    pub async fn serve(self) -> Result<(), ServeError> {
        let listener = TcpListener::from_std(self.listener).map_err(ServeError::Register)?;
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) if is_transient(&e) => {
                    self.shared
                        .log
                        .warn(format_args!("accept failed, continuing: {}", e));
                    continue;
                }
                Err(e) => return Err(ServeError::Accept(e)),
            };

            let shared = self.shared.clone();
            tokio::spawn(async move { shared.handle_connection(stream, peer).await });
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

impl Shared {
    async fn handle_connection(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            self.log
                .warn(format_args!("unable to configure socket for {}: {}", peer, e));
            return;
        }

        // Client certificate verification happens in here; a rejected client
        // surfaces as an error and never reaches the router.
        let tls = match self.bounded(self.acceptor.accept(stream)).await {
            Ok(tls) => tls,
            Err(e) => {
                self.log
                    .info(format_args!("TLS handshake with {} failed: {}", peer, e));
                return;
            }
        };

        let (_, session) = tls.get_ref();
        self.log.debug(format_args!(
            "TLS handshake with {} complete ({:?}, {:?})",
            peer,
            session.protocol_version(),
            session.negotiated_cipher_suite().map(|s| s.suite())
        ));
        let peer_certificates: Option<Arc<[CertificateDer<'static>]>> =
            session.peer_certificates().map(|certs| {
                certs
                    .iter()
                    .map(|cert| {
                        let der: &[u8] = cert.as_ref();
                        CertificateDer::from(der.to_vec())
                    })
                    .collect()
            });

        let shared = self.clone();
        let service = service_fn(move |request: Request<Incoming>| {
            let response = shared.respond(request, peer_certificates.as_deref());
            async move { Ok::<_, Infallible>(response) }
        });
        let connection = http1::Builder::new()
            .keep_alive(false)
            .max_buf_size(MAX_HEAD_BYTES)
            .serve_connection(TokioIo::new(tls), service);

        if let Err(e) = self.bounded(connection).await {
            self.log
                .warn(format_args!("connection with {} failed: {}", peer, e));
        }
    }

    fn respond(
        &self,
        request: Request<Incoming>,
        peer_certificates: Option<&[CertificateDer<'_>]>,
    ) -> Response<Full<Bytes>> {
        // Pages never look at the body; hyper discards it.
        let (parts, _body) = request.into_parts();
        let request = Request::from_parts(parts, ());
        self.router
            .handle(&RequestContext {
                request: &request,
                peer_certificates,
            })
            .map(|body| Full::new(Bytes::from(body)))
    }

    /// Run `work` under the configured timeout.
    async fn bounded<T, E>(&self, work: impl Future<Output = Result<T, E>>) -> Result<T, BoxError>
    where
        E: Into<BoxError>,
    {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result.map_err(Into::into),
                Err(_) => Err(timed_out(limit).into()),
            },
            None => work.await.map_err(Into::into),
        }
    }
}

fn timed_out(limit: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("timed out after {}s", limit.as_secs()),
    )
}
