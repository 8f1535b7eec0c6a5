use clap::{Arg, ArgMatches, Command};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("register")
        .about("Register template metadata without uploading a file")
        .arg(
            Arg::new("name")
                .long("name")
                .value_name("NAME")
                .required(true)
                .help("Display name of the new template"),
        )
}

pub async fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let name = matches
        .get_one::<String>("name")
        .map(String::as_str)
        .unwrap_or_default();

    let mut catalog = session.catalog();
    // An empty cache only skips the duplicate checks.
    if let Err(err) = catalog.load().await {
        tracing::warn!(error = %err, "continuing without the template catalog");
    }
    let template = catalog.create(name).await?;
    Ok(CommandResult::TemplateRegistered {
        template,
        uploaded: false,
    })
}
