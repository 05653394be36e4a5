use std::process::ExitCode;

use clap::Parser;
use lnk::cli::{self, Command};
use lnk::{commands, logging};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose, args.command.name());
    let log = logging::Logger::new(args.command.name());

    let result = match &args.command {
        Command::Init(opts) => commands::init::run(&args.global, opts, &log),
        Command::Add(opts) => commands::add::run(&args.global, opts, &log),
        Command::Rm(opts) => commands::remove::run(&args.global, opts, &log),
        Command::List(opts) => commands::list::run(&args.global, opts, &log),
        Command::Status(opts) => commands::status::run(&args.global, opts, &log),
        Command::Push(opts) => commands::sync::push(&args.global, opts, &log),
        Command::Pull => commands::sync::pull(&args.global, &log),
        Command::Restore(opts) => commands::restore::run(&args.global, opts, &log),
        Command::Cleanup => commands::restore::cleanup(&args.global, &log),
        Command::Validate(opts) => commands::status::validate(&args.global, opts, &log),
        Command::Bootstrap => commands::bootstrap::run(&args.global, &log),
        Command::Completions(opts) => commands::completions::run(opts.shell),
        Command::Version => commands::version::run(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log.failure(&err);
            ExitCode::FAILURE
        }
    }
}
