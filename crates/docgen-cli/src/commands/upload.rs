use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command};
use docgen::UploadRequest;

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};

pub fn command() -> Command {
    Command::new("upload")
        .about("Upload a new .docx template and register it")
        .arg(
            Arg::new("name")
                .long("name")
                .value_name("NAME")
                .required(true)
                .help("Display name of the new template"),
        )
        .arg(
            Arg::new("description")
                .long("description")
                .value_name("TEXT")
                .default_value("")
                .help("Optional description"),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .value_name("PATH")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Template file to upload"),
        )
}

pub async fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let name = matches
        .get_one::<String>("name")
        .cloned()
        .unwrap_or_default();
    let description = matches
        .get_one::<String>("description")
        .cloned()
        .unwrap_or_default();
    let file = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .unwrap_or_default();

    let request = UploadRequest::from_path(name, description, &file).map_err(|err| {
        CliError::new(
            format!("failed to read {}: {err}", file.display()),
            ExitStatus::Io,
        )
    })?;

    let mut catalog = session.catalog();
    // An empty cache only skips the duplicate checks.
    if let Err(err) = catalog.load().await {
        tracing::warn!(error = %err, "continuing without the template catalog");
    }
    let template = catalog.register(request).await?;
    Ok(CommandResult::TemplateRegistered {
        template,
        uploaded: true,
    })
}
