//! HTML for the three pages.

use std::borrow::Cow;
use std::fmt::Write;

use chrono::NaiveDateTime;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Main,
    Page1,
    Page2,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Main, Page::Page1, Page::Page2];

    pub fn path(self) -> &'static str {
        match self {
            Page::Main => "/",
            Page::Page1 => "/page1",
            Page::Page2 => "/page2",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Page::Main => "Main Page",
            Page::Page1 => "Page 1",
            Page::Page2 => "Page 2",
        }
    }

    fn link_label(self) -> &'static str {
        match self {
            Page::Main => "Back to Main Page",
            Page::Page1 => "Go to Page 1",
            Page::Page2 => "Go to Page 2",
        }
    }

    /// The pages this one links to, in display order.
    pub fn links(self) -> [Page; 2] {
        match self {
            Page::Main => [Page::Page1, Page::Page2],
            Page::Page1 => [Page::Main, Page::Page2],
            Page::Page2 => [Page::Main, Page::Page1],
        }
    }
}

/// How the client CN is put into the page.
///
/// `Verbatim` copies it into the HTML unchanged, which lets a CN such as
/// `<script>` inject markup. `Escaped` replaces HTML special characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HtmlEscaping {
    #[default]
    Verbatim,
    Escaped,
}

impl HtmlEscaping {
    pub fn apply(self, text: &str) -> Cow<'_, str> {
        match self {
            HtmlEscaping::Verbatim => Cow::Borrowed(text),
            HtmlEscaping::Escaped => escape_html(text),
        }
    }
}

pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Render `page` for the client `cn`, accessed at `now`.
pub fn render(page: Page, cn: &str, now: NaiveDateTime, escaping: HtmlEscaping) -> String {
    let mut html = String::with_capacity(512);
    // Writing into a String cannot fail.
    let _ = write!(
        html,
        "\n<h1>Client Certificate Test - {}</h1>\n\
         <h2>Authentication succeeded! Client certificate CN: {}</h2>\n\
         <h2>Accessed at: {}</h2>\n",
        page.title(),
        escaping.apply(cn),
        now.format(TIMESTAMP_FORMAT),
    );
    for link in page.links() {
        let _ = writeln!(
            html,
            "<h2><a href=\"{}\">{}</a></h2>",
            link.path(),
            link.link_label()
        );
    }
    html
}
