//! Best-effort discovery of an address the served files are reachable at
//!
//! None of these lookups can stop the server from starting: failures are reported through `log`
//! and produce an empty string.

use std::fmt;
use std::io::Write;
use std::net::UdpSocket;
use std::str::FromStr;

/// Where the "what is my IP" answer comes from
pub const PUBLIC_IP_SERVICE: &str = "https://api.ipify.org";

/// Any routable address works, no packet is sent to it
const OUTBOUND_PROBE: &str = "8.8.8.8:80";

/// How to build the reachable URL printed at start up
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UrlOutput {
    #[default]
    None,
    /// The machine's hostname
    Hostname,
    /// The local address used for outbound traffic
    Dns,
    /// The address the internet sees, as reported by [`PUBLIC_IP_SERVICE`]
    Public,
}

impl UrlOutput {
    pub const VARIANTS: [&'static str; 3] = ["hostname", "dns", "public"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Hostname => "hostname",
            Self::Dns => "dns",
            Self::Public => "public",
        }
    }

    /// Resolve the host part of the URL
    ///
    /// `None` for [`UrlOutput::None`].
    pub fn host(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Hostname => Some(hostname()),
            Self::Dns => Some(local_outbound_address()),
            Self::Public => Some(public_address()),
        }
    }
}

impl fmt::Display for UrlOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlOutput {
    type Err = UnknownUrlOutput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::None),
            "hostname" => Ok(Self::Hostname),
            "dns" => Ok(Self::Dns),
            "public" => Ok(Self::Public),
            _ => Err(UnknownUrlOutput {
                method: s.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownUrlOutput {
    method: String,
}

impl fmt::Display for UnknownUrlOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown URL lookup method {}, choose one of the following: [{}]",
            self.method,
            UrlOutput::VARIANTS.join(", ")
        )
    }
}

impl std::error::Error for UnknownUrlOutput {}

/// `http://<host><suffix>/ `
pub fn reachable_url(host: &str, suffix: &str) -> String {
    format!("http://{host}{suffix}/ ")
}

/// Print where the files can be reached, if asked to
pub fn announce(mode: UrlOutput, suffix: &str, out: &mut dyn Write) -> std::io::Result<()> {
    let Some(host) = mode.host() else {
        return Ok(());
    };
    writeln!(out, "Your files are now reachable at:")?;
    writeln!(out, "{}", reachable_url(&host, suffix))?;
    Ok(())
}

#[cfg(unix)]
pub fn hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            log::error!("Unable to determine hostname: {e}");
            String::new()
        }
    }
}

#[cfg(not(unix))]
pub fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_default()
}

/// The local IP the OS would use to reach the internet
///
/// "Connecting" a UDP socket only selects a route, nothing goes over the wire.
pub fn local_outbound_address() -> String {
    match probe_outbound(OUTBOUND_PROBE) {
        Ok(ip) => ip,
        Err(e) => {
            log::error!("Unable to determine IP address: {e}");
            String::new()
        }
    }
}

fn probe_outbound(target: &str) -> std::io::Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(target)?;
    Ok(socket.local_addr()?.ip().to_string())
}

/// The address the rest of the internet sees for this machine
pub fn public_address() -> String {
    public_address_from(PUBLIC_IP_SERVICE)
}

/// Ask `url` for our address, returning the response body verbatim
///
/// A single attempt is made.
pub fn public_address_from(url: &str) -> String {
    let response = match reqwest::blocking::get(url) {
        Ok(response) => response,
        Err(e) => {
            log::error!("Unable to determine IP address, connection error: {e}");
            return String::new();
        }
    };
    match response.text() {
        Ok(body) => body,
        Err(e) => {
            log::error!("Unable to determine IP address, request error: {e}");
            String::new()
        }
    }
}
