#![warn(clippy::print_stderr)]
#![warn(clippy::print_stdout)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod lookup;
pub mod root;

pub use config::ServerConfig;
pub use error::Error;
pub use error::Result;
pub use lifecycle::Controller;
pub use lifecycle::RunMode;
pub use lookup::UrlOutput;
pub use root::resolve_served_root;
