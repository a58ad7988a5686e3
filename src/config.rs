use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use docopt::Docopt;
use serde_derive::Deserialize;

use crate::error::StartupError;
use crate::page::HtmlEscaping;
use crate::pki::PemPaths;

pub const USAGE: &str = "
Serves three HTML pages over HTTPS to clients presenting a certificate
issued by a trusted CA. The default PORT is 8443.

Usage:
  mtls-demo-server [options]
  mtls-demo-server  (--version | -v)
  mtls-demo-server  (--help | -h)

Options:
    -p, --port PORT                 Listen on PORT [default: 8443].
    -a, --address ADDR              Listen on ADDR [default: ::].
    --ca-path PATH                  Trust client certificates issued by the CAs in PATH [default: cert_files/rootCA.pem].
    --cert-path PATH                Present the server certificate chain in PATH [default: cert_files/server.pem].
    --key-path PATH                 Read the server private key from PATH [default: cert_files/server.key].
    --timeout SECS                  Limit for the handshake and for the exchange, 0 to disable [default: 30].
    --escape-html                   HTML-escape the client certificate CN in pages.
    --verbose                       Emit debug log output.
    --version, -v                   Show tool version.
    --help, -h                      Show this screen.
";

#[derive(Debug, Deserialize)]
pub struct Args {
    flag_port: u16,
    flag_address: String,
    flag_ca_path: String,
    flag_cert_path: String,
    flag_key_path: String,
    flag_timeout: u64,
    flag_escape_html: bool,
    flag_verbose: bool,
}

impl Args {
    /// Parse `argv` (program name first).
    pub fn parse<I, S>(argv: I) -> Result<Self, docopt::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let version = concat!(
            env!("CARGO_PKG_NAME"),
            ", version: ",
            env!("CARGO_PKG_VERSION")
        )
        .to_string();

        Docopt::new(USAGE)
            .map(|d| d.argv(argv))
            .map(|d| d.help(true))
            .map(|d| d.version(Some(version)))
            .and_then(|d| d.deserialize())
    }

    pub fn verbose(&self) -> bool {
        self.flag_verbose
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    pub pem: PemPaths,
    pub timeout: Option<Duration>,
    pub escaping: HtmlEscaping,
}

impl TryFrom<Args> for ServerSettings {
    type Error = StartupError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let ip: IpAddr = args
            .flag_address
            .parse()
            .map_err(|source| StartupError::InvalidAddress {
                addr: args.flag_address.clone(),
                source,
            })?;

        Ok(Self {
            listen: SocketAddr::new(ip, args.flag_port),
            pem: PemPaths {
                ca: PathBuf::from(args.flag_ca_path),
                cert: PathBuf::from(args.flag_cert_path),
                key: PathBuf::from(args.flag_key_path),
            },
            timeout: match args.flag_timeout {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            escaping: if args.flag_escape_html {
                HtmlEscaping::Escaped
            } else {
                HtmlEscaping::Verbatim
            },
        })
    }
}
