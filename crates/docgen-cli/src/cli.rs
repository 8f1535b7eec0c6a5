use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use crate::commands;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};
use crate::formatter::{OutputFormat, emit_result};
use crate::util::Verbosity;

const NAME: &str = "docgen";

pub fn run() -> ExitCode {
    match run_cli(std::env::args()) {
        Ok(code) => code,
        Err(err) => {
            err.print();
            err.exit_code()
        }
    }
}

/// Parses CLI arguments, resolves the client configuration, and runs the chosen
/// command on a current-thread runtime. Returns a `sysexits`-compatible code.
pub fn run_cli<I, S>(args: I) -> Result<ExitCode, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let command = build_cli();
    let matches = command.try_get_matches_from(args)?;

    let verbosity = Verbosity {
        json: matches.get_flag("json"),
        verbose: matches.get_flag("verbose"),
    };
    init_tracing(verbosity.verbose);

    let config_override = matches.get_one::<PathBuf>("config").cloned();
    let base_url_override = matches.get_one::<String>("base-url").cloned();
    let session = CliSession::bootstrap(config_override, base_url_override, verbosity)?;
    if session.verbosity.verbose {
        tracing::info!(
            base_url = %session.config.base_url,
            timeout_secs = session.config.request_timeout_secs,
            download_dir = %session.config.download_dir.display(),
            schemas = session.schemas.len(),
            "resolved client configuration"
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(dispatch(&session, &matches));
    // A pending stdin read from the shell must not hold the process open.
    runtime.shutdown_background();
    emit_result(result?, OutputFormat::from(verbosity))
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    Command::new(NAME)
        .about("Generate contract documents from registered templates")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("YAML client configuration. Defaults to $DOCGEN_CONFIG when set."),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .value_name("URL")
                .help("Backend base URL. Overrides $DOCGEN_BASE_URL and the config file."),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit newline-delimited JSON instead of human-readable text."),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log backend requests and resolved configuration to stderr."),
        )
        .subcommand_required(true)
        .subcommand(commands::templates::command())
        .subcommand(commands::fields::command())
        .subcommand(commands::generate::command())
        .subcommand(commands::upload::command())
        .subcommand(commands::register::command())
        .subcommand(commands::shell::command())
}

async fn dispatch(
    session: &CliSession,
    matches: &ArgMatches,
) -> Result<commands::CommandResult, CliError> {
    match matches.subcommand() {
        Some(("templates", sub)) => commands::templates::run(session, sub).await,
        Some(("fields", sub)) => commands::fields::run(session, sub),
        Some(("generate", sub)) => commands::generate::run(session, sub).await,
        Some(("upload", sub)) => commands::upload::run(session, sub).await,
        Some(("register", sub)) => commands::register::run(session, sub).await,
        Some(("shell", sub)) => commands::shell::run(session, sub).await,
        _ => Err(CliError::new("missing command", ExitStatus::Usage)),
    }
}
