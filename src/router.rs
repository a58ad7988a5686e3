//! Dispatch of a request to one of the pages, or to the not-found fallback.

use chrono::{Local, NaiveDateTime};
use http::header::{HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{Request, Response, StatusCode};
use rustls::pki_types::CertificateDer;

use crate::identity::CertificateInspector;
use crate::logging::Logger;
use crate::page::{self, HtmlEscaping, Page};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A request together with the certificates its connection was
/// authenticated with. Both are borrowed for the duration of one exchange.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub request: &'a Request<()>,
    pub peer_certificates: Option<&'a [CertificateDer<'a>]>,
}

pub struct Router {
    routes: Vec<(&'static str, Page)>,
    inspector: CertificateInspector,
    escaping: HtmlEscaping,
    clock: fn() -> NaiveDateTime,
    log: Logger,
}

impl Router {
    pub fn new(escaping: HtmlEscaping, log: Logger) -> Self {
        Self {
            routes: Page::ALL.iter().map(|page| (page.path(), *page)).collect(),
            inspector: CertificateInspector::new(log.scoped("mtls_demo_server::identity")),
            escaping,
            clock: || Local::now().naive_local(),
            log,
        }
    }

    /// Replace the wall clock used for page timestamps.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// The page registered for exactly `path`.
    pub fn lookup(&self, path: &str) -> Option<Page> {
        self.routes
            .iter()
            .find(|(route, _)| *route == path)
            .map(|(_, page)| *page)
    }

    pub fn handle(&self, ctx: &RequestContext<'_>) -> Response<String> {
        match self.lookup(ctx.request.uri().path()) {
            Some(page) => self.serve_page(page, ctx),
            None => {
                self.log.debug(format_args!(
                    "no route for {} {}",
                    ctx.request.method(),
                    ctx.request.uri().path()
                ));
                not_found()
            }
        }
    }

    fn serve_page(&self, page: Page, ctx: &RequestContext<'_>) -> Response<String> {
        self.log
            .info(format_args!("access path: {}", ctx.request.uri().path()));
        let cn = self.inspector.display_cn(ctx.peer_certificates);
        let body = page::render(page, &cn, (self.clock)(), self.escaping);

        let mut response = Response::new(body);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
        response
    }
}

/// Fallback for every path without a page.
pub fn not_found() -> Response<String> {
    let mut response = Response::new("404 page not found\n".to_string());
    *response.status_mut() = StatusCode::NOT_FOUND;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
