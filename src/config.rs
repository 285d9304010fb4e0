use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::RunMode;
use crate::lookup::UrlOutput;

pub use file_serve::DEFAULT_PORT;

/// Everything needed to serve a directory, fixed at start up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub served_root: PathBuf,
    pub timeout: Option<Duration>,
    pub log_requests: bool,
    pub verbose: bool,
    pub url_output: UrlOutput,
}

impl ServerConfig {
    pub fn new(served_root: impl Into<PathBuf>) -> Self {
        Self {
            port: DEFAULT_PORT,
            served_root: served_root.into(),
            timeout: None,
            log_requests: false,
            verbose: false,
            url_output: UrlOutput::None,
        }
    }

    /// The `:<port>` part of URLs pointing at this server
    ///
    /// Empty for the default HTTP port so URLs read `http://host/`.
    pub fn bind_suffix(&self) -> String {
        bind_suffix(self.port)
    }

    /// The wildcard address to listen on
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn run_mode(&self) -> RunMode {
        RunMode::from_timeout(self.timeout)
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "port: {}", self.port)?;
        writeln!(f, "served_root: {}", self.served_root.display())?;
        match self.timeout {
            Some(timeout) if !timeout.is_zero() => {
                writeln!(f, "timeout: {}", humantime::format_duration(timeout))?;
            }
            _ => writeln!(f, "timeout: none")?,
        }
        writeln!(f, "log_requests: {}", self.log_requests)?;
        writeln!(f, "verbose: {}", self.verbose)?;
        write!(f, "url_output: {}", self.url_output)
    }
}

pub fn bind_suffix(port: u16) -> String {
    if port == DEFAULT_PORT {
        String::new()
    } else {
        format!(":{port}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_port_has_no_suffix() {
        assert_eq!(bind_suffix(80), "");
        assert_eq!(ServerConfig::new(".").bind_suffix(), "");
    }

    #[test]
    fn other_ports_are_suffixed() {
        for port in [0, 1, 443, 8080, u16::MAX] {
            assert_eq!(bind_suffix(port), format!(":{port}"));
        }
    }

    #[test]
    fn listens_on_all_interfaces() {
        let mut config = ServerConfig::new(".");
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:80");
        config.port = 8080;
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn run_mode_follows_timeout() {
        let mut config = ServerConfig::new(".");
        assert_eq!(config.run_mode(), RunMode::Indefinite);
        config.timeout = Some(Duration::ZERO);
        assert_eq!(config.run_mode(), RunMode::Indefinite);
        config.timeout = Some(Duration::from_millis(100));
        assert_eq!(
            config.run_mode(),
            RunMode::Timed(Duration::from_millis(100))
        );
    }
}
