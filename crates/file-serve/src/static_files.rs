use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::{Error, Handler};

/// Characters escaped when a file name becomes a link in a directory listing
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in a redirect target, existing `%` escapes are kept as they are
const LOCATION: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`');

const INDEX: &str = "index.html";

/// Serve the files under a directory
///
/// Directories are answered with their `index.html` when present and with an HTML listing of
/// their entries otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory being served
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Map a request URL onto the local filesystem
    ///
    /// Returns `None` for URLs that would escape the served directory.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let relative = normalize_url_path(url)?;
        Some(self.root.join(relative))
    }
}

impl Handler for StaticFiles {
    fn handle(&self, request: tiny_http::Request) -> Result<(), Error> {
        let url_path = url_path(request.url()).to_owned();
        let Some(path) = self.resolve(&url_path) else {
            log::debug!("Rejecting {}", request.url());
            return request
                .respond(html_response(400, "400: Bad Request"))
                .map_err(Error::new);
        };

        if path.is_dir() {
            if !url_path.ends_with('/') {
                // relative links in the listing need the trailing slash
                let location = redirect_location(request.url());
                let response = tiny_http::Response::empty(301)
                    .with_header(header("Location", &location)?);
                return request.respond(response).map_err(Error::new);
            }

            let index = path.join(INDEX);
            if index.is_file() {
                return respond_with_file(request, &index);
            }

            let listing = render_listing(&path, &url_path)?;
            let response = tiny_http::Response::from_string(listing)
                .with_header(header("Content-Type", "text/html; charset=utf-8")?);
            request.respond(response).map_err(Error::new)
        } else if path.is_file() {
            respond_with_file(request, &path)
        } else {
            log::debug!("Not found: {}", path.display());
            request
                .respond(html_response(404, "404: Page not found"))
                .map_err(Error::new)
        }
    }
}

fn respond_with_file(request: tiny_http::Request, path: &Path) -> Result<(), Error> {
    let file = std::fs::File::open(path).map_err(Error::new)?;
    let mime = mime_guess::MimeGuess::from_path(path).first_or_octet_stream();
    let response =
        tiny_http::Response::from_file(file).with_header(header("Content-Type", mime.as_ref())?);
    request.respond(response).map_err(Error::new)
}

fn html_response(status: u16, message: &str) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    tiny_http::Response::from_string(format!("<h1> <center> {message} </center> </h1>"))
        .with_status_code(status)
        .with_header(
            tiny_http::Header::from_bytes("Content-Type", "text/html; charset=utf-8")
                .expect("formatted correctly"),
        )
}

fn header(field: &str, value: &str) -> Result<tiny_http::Header, Error> {
    tiny_http::Header::from_bytes(field.as_bytes(), value.as_bytes())
        .map_err(|()| Error::new(format!("invalid `{field}` header value `{value}`")))
}

/// The URL without its query string
fn url_path(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

fn query(url: &str) -> Option<&str> {
    url.split_once('?').map(|(_, query)| query)
}

/// `url` with a trailing slash added to its path, safe to send as a header
fn redirect_location(url: &str) -> String {
    let mut location = format!("{}/", url_path(url));
    if let Some(query) = query(url) {
        location.push('?');
        location.push_str(query);
    }
    utf8_percent_encode(&location, LOCATION).to_string()
}

fn normalize_url_path(url: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(url_path(url)).decode_utf8().ok()?;
    let mut normalized = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(segment) => normalized.push(segment),
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

fn render_listing(dir: &Path, url_path: &str) -> Result<String, Error> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(Error::new)? {
        let entry = entry.map_err(Error::new)?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();

    let title = html_escape::encode_text(url_path);
    let mut body = format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<pre>\n"
    );
    for name in &entries {
        let href = utf8_percent_encode(name, PATH_SEGMENT).to_string();
        let _ = writeln!(
            body,
            "<a href=\"{}\">{}</a>",
            html_escape::encode_double_quoted_attribute(&href),
            html_escape::encode_text(name)
        );
    }
    body.push_str("</pre>\n</body>\n</html>\n");

    Ok(body)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_query_strings() {
        assert_eq!(url_path("/style.css?v=3"), "/style.css");
        assert_eq!(url_path("/"), "/");
        assert_eq!(query("/a/?sort=name"), Some("sort=name"));
        assert_eq!(query("/a/"), None);
    }

    #[test]
    fn redirect_adds_slash_and_keeps_query() {
        assert_eq!(redirect_location("/docs"), "/docs/");
        assert_eq!(redirect_location("/docs?sort=name"), "/docs/?sort=name");
        assert_eq!(redirect_location("/my%20docs"), "/my%20docs/");
    }

    #[test]
    fn redirect_encodes_non_ascii() {
        let location = redirect_location("/d\u{f6}cs pics?q=\u{e9}");
        assert_eq!(location, "/d%C3%B6cs%20pics/?q=%C3%A9");
        assert!(header("Location", &location).is_ok());
    }

    #[test]
    fn resolves_inside_root() {
        let files = StaticFiles::new("/srv/www");
        assert_eq!(files.resolve("/"), Some(PathBuf::from("/srv/www")));
        assert_eq!(
            files.resolve("/docs/read%20me.txt?x=1"),
            Some(PathBuf::from("/srv/www/docs/read me.txt"))
        );
        assert_eq!(
            files.resolve("//./docs/"),
            Some(PathBuf::from("/srv/www/docs"))
        );
    }

    #[test]
    fn rejects_parent_components() {
        let files = StaticFiles::new("/srv/www");
        assert_eq!(files.resolve("/../etc/passwd"), None);
        assert_eq!(files.resolve("/docs/%2e%2e/%2e%2e/etc"), None);
    }

    #[test]
    fn listing_is_sorted_and_escaped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a <1>.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let listing = render_listing(dir.path(), "/").unwrap();
        let a = listing
            .find("<a href=\"a%20%3C1%3E.txt\">a &lt;1&gt;.txt</a>")
            .unwrap();
        let b = listing.find("<a href=\"b.txt\">b.txt</a>").unwrap();
        let sub = listing.find("<a href=\"sub/\">sub/</a>").unwrap();
        assert!(a < b && b < sub, "{listing}");
    }
}
