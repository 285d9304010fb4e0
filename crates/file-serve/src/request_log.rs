use std::io::Write;
use std::sync::Mutex;

use crate::{Error, Handler};

/// The fields recorded for each handled request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub remote_addr: String,
    pub method: String,
    pub uri: String,
    pub user_agent: String,
}

impl LogEntry {
    pub fn from_request(request: &tiny_http::Request) -> Self {
        let remote_addr = request
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        let user_agent = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("User-Agent"))
            .map(|header| header.value.as_str().to_owned())
            .unwrap_or_default();
        Self {
            remote_addr,
            method: request.method().to_string(),
            uri: request.url().to_owned(),
            user_agent,
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} \"{} {}\" \"{}\"",
            self.remote_addr, self.method, self.uri, self.user_agent
        )
    }
}

/// Log every request after the wrapped handler has responded to it
///
/// One line is written per request, prefixed with the local time.  Failing to write the line
/// never fails the request.
pub struct RequestLog<H, W> {
    inner: H,
    sink: Mutex<W>,
}

impl<H: Handler, W: Write + Send> RequestLog<H, W> {
    pub fn new(inner: H, sink: W) -> Self {
        Self {
            inner,
            sink: Mutex::new(sink),
        }
    }

    fn write(&self, entry: &LogEntry) {
        let timestamp = chrono::Local::now().format("%Y/%m/%d %H:%M:%S");
        let mut sink = match self.sink.lock() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(sink, "{timestamp} {entry}");
        let _ = sink.flush();
    }
}

impl<H: Handler, W: Write + Send> Handler for RequestLog<H, W> {
    fn handle(&self, request: tiny_http::Request) -> Result<(), Error> {
        let entry = LogEntry::from_request(&request);
        let result = self.inner.handle(request);
        self.write(&entry);
        result
    }
}
