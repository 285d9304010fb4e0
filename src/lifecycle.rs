use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use file_serve::{Error, Handler, RequestLog, Server, ServerBuilder, StaticFiles};

use crate::config::ServerConfig;
use crate::lookup;

/// How serving comes to an end
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Serve until the process is terminated
    Indefinite,
    /// Serve, then shut down gracefully once the duration has elapsed
    Timed(Duration),
}

impl RunMode {
    /// A missing or zero timeout runs indefinitely
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) if !timeout.is_zero() => Self::Timed(timeout),
            _ => Self::Indefinite,
        }
    }

    /// Serve requests with `handler` until this mode says to stop
    pub fn run(
        self,
        server: &Arc<Server>,
        handler: Box<dyn Handler>,
        verbose: bool,
    ) -> Result<(), Error> {
        match self {
            Self::Indefinite => serve_indefinitely(server, &*handler),
            Self::Timed(timeout) => serve_until_timeout(server, handler, timeout, verbose),
        }
    }
}

fn serve_indefinitely(server: &Server, handler: &dyn Handler) -> Result<(), Error> {
    server.serve(handler).inspect_err(|e| {
        log::error!("Server error: {e}");
    })
}

fn serve_until_timeout(
    server: &Arc<Server>,
    handler: Box<dyn Handler>,
    timeout: Duration,
    verbose: bool,
) -> Result<(), Error> {
    let serving = {
        let server = Arc::clone(server);
        thread::Builder::new()
            .name("serve".to_owned())
            .spawn(move || {
                server.serve(&handler).inspect_err(|e| {
                    log::error!("Server error: {e}");
                })
            })
            .map_err(Error::new)?
    };

    // A failed bind still waits out the deadline
    thread::sleep(timeout);
    log::debug!(
        "Timeout of {} reached, shutting down",
        humantime::format_duration(timeout)
    );
    server.close();

    let result = serving
        .join()
        .unwrap_or_else(|_| Err(Error::new("the server thread panicked")));
    if verbose {
        log::info!("Server shutdown at {}", chrono::Local::now());
    }
    result
}

/// Owns the server for the lifetime of the process
pub struct Controller {
    config: ServerConfig,
    server: Arc<Server>,
}

impl Controller {
    pub fn new(config: ServerConfig) -> Self {
        let addr = config.listen_addr();
        let server = ServerBuilder::new()
            .hostname(addr.ip().to_string())
            .port(addr.port())
            .build();
        Self::with_server(config, server)
    }

    /// Serve through an already configured server
    pub fn with_server(config: ServerConfig, server: Server) -> Self {
        Self {
            config,
            server: Arc::new(server),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// Static files, wrapped in a request log on stderr when enabled
    pub fn handler(&self) -> Box<dyn Handler> {
        self.handler_logging_to(std::io::stderr())
    }

    pub fn handler_logging_to<W: Write + Send + 'static>(&self, sink: W) -> Box<dyn Handler> {
        let files = StaticFiles::new(&self.config.served_root);
        log::debug!("Serving files from {}", files.root().display());
        if self.config.log_requests {
            Box::new(RequestLog::new(files, sink))
        } else {
            Box::new(files)
        }
    }

    /// Describe what is about to be served, when verbose
    pub fn report(&self) {
        if !self.config.verbose {
            return;
        }

        log::info!("Using port: {}", self.config.port);
        match self.config.run_mode() {
            RunMode::Indefinite => log::info!("No timeout, server will run until stopped"),
            RunMode::Timed(timeout) => log::info!(
                "Timeout set to: {}",
                humantime::format_duration(timeout)
            ),
        }
        log::info!("Serving path: {}", self.config.served_root.display());
        if self.config.log_requests {
            log::info!("Request logging is enabled.");
        } else {
            log::info!("Request logging is disabled.");
        }
    }

    /// Print where the files can be reached, if a [`lookup::UrlOutput`] was picked
    pub fn announce(&self, out: &mut dyn Write) -> crate::Result<()> {
        lookup::announce(self.config.url_output, &self.config.bind_suffix(), out)
            .context("failed to print the reachable URL")
    }

    pub fn run(&self) -> Result<(), Error> {
        self.run_with(self.handler())
    }

    pub fn run_with(&self, handler: Box<dyn Handler>) -> Result<(), Error> {
        log::debug!("Configuration:\n{}", self.config);
        log::debug!("Starting server on {}", self.server.addr());
        self.config
            .run_mode()
            .run(&self.server, handler, self.config.verbose)
    }
}
