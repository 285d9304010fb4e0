#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]

use clap::Parser as _;
use proc_exit::prelude::*;

mod args;

/// The listener could not be bound or stopped serving with an error
const SERVER_FAILURE: proc_exit::Code = proc_exit::Code::new(69);

fn main() {
    human_panic::setup_panic!();
    let result = run();
    proc_exit::exit(result);
}

fn run() -> proc_exit::ExitResult {
    // clap's `get_matches` uses Failure rather than Usage, so bypass it for `get_matches_safe`.
    let cli = match args::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return proc_exit::sysexits::USAGE_ERR.ok();
        }
        Err(e) => {
            let _ = e.print();
            return proc_exit::Code::SUCCESS.ok();
        }
    };

    cli.color.write_global();
    let colored_stderr =
        anstream::AutoStream::choice(&std::io::stderr()) != colorchoice::ColorChoice::Never;
    args::init_logging(cli.verbose.clone(), colored_stderr);

    let config = cli.to_config();
    let controller = serve::Controller::new(config);
    controller.report();
    if controller.config().verbose && !cli.unused.is_empty() {
        log::info!(
            "Additional arguments were given but unused {:?}",
            cli.unused
        );
    }

    controller
        .announce(&mut anstream::stdout().lock())
        .with_code(proc_exit::sysexits::IO_ERR)?;

    if controller.run().is_err() {
        // already reported by the controller
        return SERVER_FAILURE.ok();
    }

    Ok(())
}
