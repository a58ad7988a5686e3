#![allow(dead_code)]

use std::fs;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{Log, Metadata, Record};
use mtls_demo_server::config::ServerSettings;
use mtls_demo_server::logging::Logger;
use mtls_demo_server::page::HtmlEscaping;
use mtls_demo_server::pki::PemPaths;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use tempfile::TempDir;

/// A test PKI with a CA certificate and a server certificate issued by it.
/// Client certificates are issued on demand.
pub struct TestPki {
    ca_cert: rcgen::Certificate,
    server_cert: rcgen::Certificate,
}

/// A client certificate and key, ready for a rustls client config.
pub struct ClientCert {
    pub chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl TestPki {
    pub fn new(ca_name: &str) -> Self {
        let alg = &rcgen::PKCS_ECDSA_P256_SHA256;
        let mut ca_params = rcgen::CertificateParams::new(Vec::new());
        ca_params
            .distinguished_name
            .push(rcgen::DnType::OrganizationName, "mTLS Demo");
        ca_params
            .distinguished_name
            .push(rcgen::DnType::CommonName, ca_name);
        ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        ca_params.key_usages = vec![
            rcgen::KeyUsagePurpose::KeyCertSign,
            rcgen::KeyUsagePurpose::DigitalSignature,
            rcgen::KeyUsagePurpose::CrlSign,
        ];
        ca_params.alg = alg;
        let ca_cert = rcgen::Certificate::from_params(ca_params).unwrap();

        let mut server_params = rcgen::CertificateParams::new(vec!["localhost".to_string()]);
        server_params.is_ca = rcgen::IsCa::NoCa;
        server_params.extended_key_usages = vec![rcgen::ExtendedKeyUsagePurpose::ServerAuth];
        server_params.alg = alg;
        let server_cert = rcgen::Certificate::from_params(server_params).unwrap();

        Self {
            ca_cert,
            server_cert,
        }
    }

    pub fn client(&self, cn: &str) -> ClientCert {
        let mut params = rcgen::CertificateParams::new(Vec::new());
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, cn);
        params.is_ca = rcgen::IsCa::NoCa;
        params.extended_key_usages = vec![rcgen::ExtendedKeyUsagePurpose::ClientAuth];
        params.alg = &rcgen::PKCS_ECDSA_P256_SHA256;
        let cert = rcgen::Certificate::from_params(params).unwrap();

        ClientCert {
            chain: vec![CertificateDer::from(
                cert.serialize_der_with_signer(&self.ca_cert).unwrap(),
            )],
            key: PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()).into(),
        }
    }

    /// Write rootCA.pem, server.pem and server.key into `dir`.
    pub fn write_server_files(&self, dir: &Path) -> PemPaths {
        let paths = PemPaths {
            ca: dir.join("rootCA.pem"),
            cert: dir.join("server.pem"),
            key: dir.join("server.key"),
        };
        fs::write(&paths.ca, self.ca_cert.serialize_pem().unwrap()).unwrap();
        fs::write(
            &paths.cert,
            self.server_cert
                .serialize_pem_with_signer(&self.ca_cert)
                .unwrap(),
        )
        .unwrap();
        fs::write(&paths.key, self.server_cert.serialize_private_key_pem()).unwrap();
        paths
    }

    fn roots(&self) -> RootCertStore {
        let mut roots = RootCertStore::empty();
        roots
            .add(CertificateDer::from(self.ca_cert.serialize_der().unwrap()))
            .unwrap();
        roots
    }

    /// A client trusting this PKI's CA, authenticating with `client` if given.
    pub fn client_config(&self, client: Option<ClientCert>) -> Arc<ClientConfig> {
        let builder = ClientConfig::builder().with_root_certificates(self.roots());
        let config = match client {
            Some(client) => builder
                .with_client_auth_cert(client.chain, client.key)
                .unwrap(),
            None => builder.with_no_client_auth(),
        };
        Arc::new(config)
    }
}

/// Log sink that keeps every message.
#[derive(Default)]
pub struct Capture {
    messages: Mutex<Vec<String>>,
}

impl Capture {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.messages
            .lock()
            .unwrap()
            .push(record.args().to_string());
    }

    fn flush(&self) {}
}

pub struct RunningServer {
    pub addr: SocketAddr,
    pub log: Arc<Capture>,
    _dir: TempDir,
}

/// Start a server for `pki` on an ephemeral loopback port.
pub fn spawn_server(pki: &TestPki, escaping: HtmlEscaping) -> RunningServer {
    let dir = tempfile::tempdir().unwrap();
    let settings = ServerSettings {
        listen: "127.0.0.1:0".parse().unwrap(),
        pem: pki.write_server_files(dir.path()),
        timeout: Some(Duration::from_secs(5)),
        escaping,
    };
    let capture = Arc::new(Capture::default());
    let log = Logger::new(capture.clone());

    let server = mtls_demo_server::start(&settings, &log).unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
            .block_on(server.serve())
    });

    RunningServer {
        addr,
        log: capture,
        _dir: dir,
    }
}

/// Send one request for `path` and return everything the server sent back.
pub fn request(addr: SocketAddr, config: Arc<ClientConfig>, path: &str) -> io::Result<String> {
    request_raw(
        addr,
        config,
        &format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path),
    )
}

/// Send `head` as-is and read until the server closes the connection.
///
/// A TCP close without close_notify after some response bytes counts as
/// the end of the response; the same thing before any byte is an error.
pub fn request_raw(addr: SocketAddr, config: Arc<ClientConfig>, head: &str) -> io::Result<String> {
    let sock = TcpStream::connect(addr)?;
    sock.set_read_timeout(Some(Duration::from_secs(5)))?;
    let server_name = ServerName::try_from("localhost").unwrap();
    let conn = ClientConnection::new(config, server_name)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let mut tls = StreamOwned::new(conn, sock);

    tls.write_all(head.as_bytes())?;
    tls.flush()?;
    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match tls.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => response.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && !response.is_empty() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(String::from_utf8_lossy(&response).into_owned())
}

/// Poll the captured server log until a message satisfies `pred`.
pub fn wait_for_log(log: &Capture, pred: impl Fn(&str) -> bool) -> Option<String> {
    for _ in 0..100 {
        if let Some(found) = log.messages().into_iter().find(|m| pred(m)) {
            return Some(found);
        }
        thread::sleep(Duration::from_millis(20));
    }
    None
}

pub fn status_line(response: &str) -> &str {
    response.lines().next().unwrap_or_default()
}

pub fn body(response: &str) -> &str {
    response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or_default()
}
