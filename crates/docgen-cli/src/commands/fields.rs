use clap::{Arg, ArgMatches, Command};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};

pub fn command() -> Command {
    Command::new("fields")
        .about("Show the form fields for a template name or alias without contacting the backend")
        .arg(
            Arg::new("template")
                .value_name("TEMPLATE")
                .required(true)
                .help("Template name, e.g. 'Договор купли-продажи' or 'sales-contract'"),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let identity = matches
        .get_one::<String>("template")
        .map(String::as_str)
        .unwrap_or_default();
    let schema = session.schemas.resolve(identity).ok_or_else(|| {
        let known: Vec<&str> = session.schemas.names().collect();
        CliError::new(
            format!(
                "no form is registered for template '{}' (known: {})",
                identity.trim(),
                known.join(", ")
            ),
            ExitStatus::Usage,
        )
    })?;

    Ok(CommandResult::FieldList {
        template: schema.template().to_string(),
        fields: schema.fields().to_vec(),
    })
}
