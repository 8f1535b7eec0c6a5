use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command};
use docgen::{DocumentFormat, DocumentSession, HttpBackend};

use crate::commands::{CommandResult, SavedArtifact};
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};
use crate::util::{display_path, parse_assignment};

pub fn command() -> Command {
    Command::new("generate")
        .about("Fill a template's form and generate a document")
        .arg(
            Arg::new("template")
                .value_name("TEMPLATE")
                .required(true)
                .help("Template id, name, or schema alias"),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Field value; repeat for every field"),
        )
        .arg(
            Arg::new("download")
                .long("download")
                .value_name("FORMAT")
                .help("Also download the generated document as docx or pdf"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory for downloaded documents. Defaults to download_dir from the config."),
        )
}

pub async fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let identity = matches
        .get_one::<String>("template")
        .map(|raw| session.catalog_identity(raw))
        .unwrap_or_default();
    let assignments = matches
        .get_many::<String>("set")
        .into_iter()
        .flatten()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let format = matches
        .get_one::<String>("download")
        .map(|raw| raw.parse::<DocumentFormat>())
        .transpose()?;
    let out_dir = matches
        .get_one::<PathBuf>("out")
        .cloned()
        .unwrap_or_else(|| session.config.download_dir.clone());

    let mut documents = session.document_session();
    documents.initialize().await?;
    let schema = documents.select_template(&identity)?;
    if schema.is_none() {
        return Err(CliError::new(
            format!("no form is registered for template '{identity}'"),
            ExitStatus::Usage,
        ));
    }
    for (key, value) in assignments {
        documents.set_field(key, value)?;
    }

    let record = documents.generate().await?;
    let download = match format {
        Some(format) => Some(download_into(&mut documents, format, &out_dir).await?),
        None => None,
    };
    let template = documents
        .selected()
        .cloned()
        .ok_or_else(|| CliError::new("template selection was lost", ExitStatus::Software))?;

    Ok(CommandResult::DocumentGenerated {
        template,
        record,
        download,
    })
}

/// Downloads the active document and writes it under `dir`.
pub async fn download_into(
    documents: &mut DocumentSession<HttpBackend>,
    format: DocumentFormat,
    dir: &Path,
) -> Result<SavedArtifact, CliError> {
    let artifact = documents.download(format.as_str()).await?;
    let path = artifact.save_into(dir)?;
    tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "artifact saved");
    Ok(SavedArtifact {
        document_id: artifact.document_id,
        format: artifact.format,
        path: display_path(&path),
        bytes: artifact.bytes.len(),
    })
}
