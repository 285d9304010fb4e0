//! > An HTTP Static File Server
//!
//! `file-serve` exposes a directory over HTTP.  It prioritizes small size and compile times over
//! speed, scalability, or security.
//!
//! # Example
//!
//! ```rust,no_run
//! let path = std::env::current_dir().unwrap();
//! let server = file_serve::Server::new(8080);
//! let files = file_serve::StaticFiles::new(&path);
//!
//! println!("Serving {}", path.display());
//! println!("See http://{}", server.addr());
//! println!("Hit CTRL-C to stop");
//!
//! server.serve(&files).unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

mod request_log;
mod static_files;

pub use request_log::LogEntry;
pub use request_log::RequestLog;
pub use static_files::StaticFiles;

/// The port browsers assume for `http://` URLs
pub const DEFAULT_PORT: u16 = 80;

/// Respond to a single request
///
/// Implementations wrap one another to form a chain, e.g. [`RequestLog`] around
/// [`StaticFiles`].
pub trait Handler: Send + Sync {
    fn handle(&self, request: tiny_http::Request) -> Result<(), Error>;
}

impl<H: Handler + ?Sized> Handler for &H {
    fn handle(&self, request: tiny_http::Request) -> Result<(), Error> {
        (**self).handle(request)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn handle(&self, request: tiny_http::Request) -> Result<(), Error> {
        (**self).handle(request)
    }
}

/// Custom server settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerBuilder {
    hostname: Option<String>,
    port: Option<u16>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            hostname: None,
            port: None,
        }
    }

    /// Override the hostname
    ///
    /// By default, all interfaces are listened on.
    pub fn hostname(&mut self, hostname: impl Into<String>) -> &mut Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Override the port
    ///
    /// By default, [`DEFAULT_PORT`] is used.
    pub fn port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    /// Create a server
    ///
    /// The listener is not bound until [`Server::bind`] or [`Server::serve`].
    pub fn build(&self) -> Server {
        let hostname = self.hostname.as_deref().unwrap_or("0.0.0.0");
        let port = self.port.unwrap_or(DEFAULT_PORT);

        Server {
            addr: format!("{hostname}:{port}"),
            server: RwLock::new(None),
            serving: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Server {
    addr: String,
    server: RwLock<Option<tiny_http::Server>>,
    serving: AtomicBool,
    closed: AtomicBool,
}

impl Server {
    /// Listen on all interfaces at `port`
    pub fn new(port: u16) -> Self {
        ServerBuilder::new().port(port).build()
    }

    /// The address the server binds to
    pub fn addr(&self) -> &str {
        self.addr.as_str()
    }

    /// The address the listener is bound to, once bound
    ///
    /// This differs from [`Server::addr`] when port `0` was requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self.server.read().as_deref() {
            Ok(Some(server)) => server.server_addr().to_ip(),
            _ => None,
        }
    }

    /// Whether the server was running at the instant the call happened
    pub fn is_running(&self) -> bool {
        matches!(self.server.read().as_deref(), Ok(Some(_)))
    }

    /// Bind the listener without accepting requests yet
    pub fn bind(&self) -> Result<SocketAddr, Error> {
        let mut server = self.server.write().map_err(Error::new)?;
        if server.is_some() {
            return Err(Error::new("the server is already bound"));
        }

        let bound = tiny_http::Server::http(self.addr()).map_err(Error::new)?;
        let local = bound
            .server_addr()
            .to_ip()
            .ok_or_else(|| Error::new("listener has no IP address"))?;
        log::debug!("Bound {local}");
        *server = Some(bound);

        Ok(local)
    }

    /// Start the webserver
    ///
    /// Each request is handled on its own thread.  Returns once [`Server::close`] was called and
    /// every in-flight request has been answered.
    pub fn serve(&self, handler: &dyn Handler) -> Result<(), Error> {
        if self.serving.swap(true, Ordering::SeqCst) {
            return Err(Error::new("the server is running"));
        }
        let result = self.accept(handler);
        self.serving.store(false, Ordering::SeqCst);
        result
    }

    fn accept(&self, handler: &dyn Handler) -> Result<(), Error> {
        if !self.is_running() {
            self.bind()?;
        }

        if !self.closed.load(Ordering::SeqCst) {
            let server = self.server.read().map_err(Error::new)?;
            let server = server
                .as_ref()
                .ok_or_else(|| Error::new("the server is not bound"))?;
            std::thread::scope(|scope| {
                for request in server.incoming_requests() {
                    scope.spawn(move || {
                        if let Err(e) = handler.handle(request) {
                            log::error!("{}", e);
                        }
                    });
                }
            });
        }

        // Dropping the listener refuses any further connection
        *self.server.write().map_err(Error::new)? = None;

        Ok(())
    }

    /// Closes the server gracefully
    ///
    /// Requests already being handled are allowed to finish.  Closing before the server is bound
    /// makes [`Server::serve`] return as soon as it binds.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(Some(server)) = self.server.read().as_deref() {
            server.unblock();
        }
    }
}

/// Serve Error
#[derive(Debug)]
pub struct Error {
    message: String,
}

impl Error {
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder_defaults_to_wildcard_http_port() {
        let server = ServerBuilder::new().build();
        assert_eq!(server.addr(), "0.0.0.0:80");
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);
    }

    #[test]
    fn builder_overrides() {
        let server = ServerBuilder::new().hostname("127.0.0.1").port(8080).build();
        assert_eq!(server.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn bind_twice_fails() {
        let server = ServerBuilder::new().hostname("127.0.0.1").port(0).build();
        let addr = server.bind().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));
        assert!(server.bind().is_err());
    }

    #[test]
    fn close_before_serve_returns() {
        let server = ServerBuilder::new().hostname("127.0.0.1").port(0).build();
        server.close();
        server.serve(&StaticFiles::new(".")).unwrap();
        assert!(!server.is_running());
    }
}
