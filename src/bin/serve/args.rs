use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use serve::ServerConfig;
use serve::UrlOutput;

const ABOUT: &str = "\
Serve path and all its files via HTTP.
Provides directory listing when the served path is accessed with browser.

If PATH parameter is omitted, the current directory is served by default.";

#[derive(Clone, Debug, clap::Parser)]
#[command(name = "serve", version, about = ABOUT)]
pub(crate) struct Cli {
    /// Path to serve [default: current directory]
    #[arg(value_name = "PATH")]
    pub(crate) path: Option<PathBuf>,

    #[arg(hide = true)]
    pub(crate) unused: Vec<String>,

    /// Port number to use
    #[arg(short = 'p', long, value_name = "NUM", default_value_t = serve::config::DEFAULT_PORT)]
    pub(crate) port: u16,

    /// Stop serving after this long (for example 2h30m)
    #[arg(short = 't', long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub(crate) timeout: Option<Duration>,

    /// Log requests to the server
    #[arg(short = 'l', long)]
    pub(crate) log_requests: bool,

    /// Output URL using method: [hostname, dns, public]
    #[arg(short = 'o', long = "url", value_name = "METHOD", default_value = "")]
    pub(crate) url_output: String,

    #[command(flatten)]
    pub(crate) color: colorchoice_clap::Color,

    #[command(flatten)]
    pub(crate) verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::WarnLevel>,
}

impl Cli {
    /// Whether `-v` asked for additional output
    pub(crate) fn is_verbose(&self) -> bool {
        self.verbose.log_level_filter() >= log::LevelFilter::Info
    }

    pub(crate) fn to_config(&self) -> ServerConfig {
        let path = self.path.clone().unwrap_or_default();
        let mut config = ServerConfig::new(serve::resolve_served_root(&path));
        config.port = self.port;
        config.timeout = self.timeout;
        config.log_requests = self.log_requests;
        config.verbose = self.is_verbose();
        config.url_output = match self.url_output.parse::<UrlOutput>() {
            Ok(mode) => mode,
            Err(e) => {
                log::error!("{e}");
                UrlOutput::None
            }
        };
        config
    }
}

pub(crate) fn init_logging(
    level: clap_verbosity_flag::Verbosity<clap_verbosity_flag::WarnLevel>,
    colored: bool,
) {
    if let Some(level) = level.log_level() {
        let mut builder = env_logger::Builder::new();
        builder.write_style(if colored {
            env_logger::WriteStyle::Always
        } else {
            env_logger::WriteStyle::Never
        });

        builder.filter(None, level.to_level_filter());

        if level == log::Level::Trace || level == log::Level::Debug {
            builder.format_timestamp_secs();
        } else {
            builder.format(|f, record| {
                let style = level_style(record.level());
                let level = record.level().as_str().to_lowercase();
                writeln!(f, "{style}{level}{style:#}: {}", record.args())
            });
        }

        builder.init();
    }
}

fn level_style(level: log::Level) -> anstyle::Style {
    match level {
        log::Level::Error => anstyle::AnsiColor::Red.on_default().bold(),
        log::Level::Warn => anstyle::AnsiColor::Yellow.on_default(),
        log::Level::Info => anstyle::AnsiColor::Green.on_default(),
        log::Level::Debug => anstyle::AnsiColor::Blue.on_default(),
        log::Level::Trace => anstyle::AnsiColor::Cyan.on_default(),
    }
}

#[cfg(test)]
mod test {
    use clap::Parser as _;

    use super::*;

    #[test]
    fn verify_app() {
        use clap::CommandFactory as _;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["serve"]).unwrap();
        assert_eq!(cli.port, 80);
        assert_eq!(cli.timeout, None);
        assert!(!cli.log_requests);
        assert!(!cli.is_verbose());

        let config = cli.to_config();
        assert_eq!(config.served_root, std::env::current_dir().unwrap());
        assert_eq!(config.url_output, UrlOutput::None);
        assert_eq!(config.bind_suffix(), "");
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from([
            "serve", "-p", "8080", "-t", "2h30m", "-l", "-v", "-o", "dns", "/tmp",
        ])
        .unwrap();
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.timeout, Some(Duration::from_secs(2 * 3600 + 30 * 60)));
        assert!(cli.log_requests);
        assert!(cli.is_verbose());

        let config = cli.to_config();
        assert_eq!(config.url_output, UrlOutput::Dns);
        assert_eq!(config.bind_suffix(), ":8080");
        assert_eq!(config.served_root, PathBuf::from("/tmp"));
    }

    #[test]
    fn sub_second_timeout() {
        let cli = Cli::try_parse_from(["serve", "-t", "100ms"]).unwrap();
        assert_eq!(cli.timeout, Some(Duration::from_millis(100)));
    }

    #[test]
    fn unknown_url_method_is_not_fatal() {
        let cli = Cli::try_parse_from(["serve", "-o", "foo"]).unwrap();
        assert_eq!(cli.to_config().url_output, UrlOutput::None);
    }

    #[test]
    fn extra_paths_are_collected() {
        let cli = Cli::try_parse_from(["serve", "site", "other", "more"]).unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("site")));
        assert_eq!(cli.unused, ["other", "more"]);
    }

    #[test]
    fn rejects_bad_timeout() {
        assert!(Cli::try_parse_from(["serve", "-t", "soon"]).is_err());
    }
}
