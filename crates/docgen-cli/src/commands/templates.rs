use clap::{ArgMatches, Command};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("templates").about("List the templates registered with the backend")
}

pub async fn run(session: &CliSession, _matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let mut catalog = session.catalog();
    let templates = catalog.load().await?.to_vec();
    Ok(CommandResult::TemplateList { templates })
}
