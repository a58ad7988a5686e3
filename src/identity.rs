//! What the pages show about the client: the Common Name of its verified
//! certificate.

use rustls::pki_types::CertificateDer;
use x509_parser::error::X509Error;
use x509_parser::nom;
use x509_parser::prelude::{FromDer, X509Certificate, X509Name};

use crate::logging::Logger;

/// Shown in place of a CN when the connection carries no client certificate.
pub const UNKNOWN_CN: &str = "unknown";

/// Subject and issuer Common Names of a client certificate.
///
/// A certificate without a CN attribute, or one x509-parser can't read,
/// yields empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    pub subject_cn: String,
    pub issuer_cn: String,
}

impl ClientIdentity {
    pub fn from_der(der: &CertificateDer<'_>) -> Result<Self, nom::Err<X509Error>> {
        let (_, cert) = X509Certificate::from_der(der.as_ref())?;
        Ok(Self {
            subject_cn: common_name(cert.subject()),
            issuer_cn: common_name(cert.issuer()),
        })
    }
}

fn common_name(name: &X509Name<'_>) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Looks at the peer certificates of a finished handshake.
#[derive(Debug, Clone)]
pub struct CertificateInspector {
    log: Logger,
}

impl CertificateInspector {
    pub fn new(log: Logger) -> Self {
        Self { log }
    }

    /// Identity of the end-entity certificate, if the client sent one.
    ///
    /// Logs the subject and issuer CN, or that there was no certificate.
    pub fn inspect(
        &self,
        peer_certificates: Option<&[CertificateDer<'_>]>,
    ) -> Option<ClientIdentity> {
        let Some(end_entity) = peer_certificates.and_then(|certs| certs.first()) else {
            self.log.info(format_args!("no client certificate found"));
            return None;
        };

        let identity = ClientIdentity::from_der(end_entity).unwrap_or_else(|e| {
            self.log
                .warn(format_args!("unable to parse client certificate: {}", e));
            ClientIdentity::default()
        });
        self.log.info(format_args!(
            "client certificate found - CN: {}, issuer: {}",
            identity.subject_cn, identity.issuer_cn
        ));
        Some(identity)
    }

    /// The CN to display, or [`UNKNOWN_CN`].
    pub fn display_cn(&self, peer_certificates: Option<&[CertificateDer<'_>]>) -> String {
        self.inspect(peer_certificates)
            .map(|identity| identity.subject_cn)
            .unwrap_or_else(|| UNKNOWN_CN.to_string())
    }
}
