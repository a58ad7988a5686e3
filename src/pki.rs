//! Loading the trust anchors and the server's own identity from PEM files.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::RootCertStore;

use crate::error::StartupError;
use crate::logging::Logger;

/// Build the trust anchor set client certificates are verified against.
///
/// Every certificate in the bundle the store accepts is added. A bundle with
/// no acceptable certificate is an error, just like a missing file.
pub fn load_trust_anchors(path: &Path, log: &Logger) -> Result<RootCertStore, StartupError> {
    let certs = load_certificates(path)?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if ignored > 0 {
        log.warn(format_args!(
            "ignored {} unparsable certificate(s) in {}",
            ignored,
            path.display()
        ));
    }
    if added == 0 {
        return Err(StartupError::NoCertificates {
            path: path.to_owned(),
        });
    }
    log.info(format_args!(
        "loaded {} trusted CA certificate(s) from {}",
        added,
        path.display()
    ));
    Ok(roots)
}

/// Read every `CERTIFICATE` block of a PEM file, in file order.
pub fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, StartupError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| StartupError::ReadPem {
            path: path.to_owned(),
            source,
        })?;
    if certs.is_empty() {
        return Err(StartupError::NoCertificates {
            path: path.to_owned(),
        });
    }
    Ok(certs)
}

/// Read the first private key of a PEM file (PKCS#8, PKCS#1 or SEC1).
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, StartupError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| StartupError::ReadPem {
            path: path.to_owned(),
            source,
        })?
        .ok_or_else(|| StartupError::NoPrivateKey {
            path: path.to_owned(),
        })
}

fn open(path: &Path) -> Result<BufReader<File>, StartupError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| StartupError::ReadPem {
            path: path.to_owned(),
            source,
        })
}

/// The certificate chain and key the server presents to clients.
#[derive(Debug)]
pub struct ServerIdentity {
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl ServerIdentity {
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, StartupError> {
        Ok(Self {
            cert_chain: load_certificates(cert_path)?,
            key: load_private_key(key_path)?,
        })
    }
}

/// Paths of the PEM inputs read at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemPaths {
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}
