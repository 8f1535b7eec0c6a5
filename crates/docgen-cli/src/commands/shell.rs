use std::sync::Arc;

use clap::{ArgMatches, Command};
use docgen::{AbortHandle, DocgenError, DocumentFormat, DocumentSession, HttpBackend, Template};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

use crate::commands::CommandResult;
use crate::commands::generate::download_into;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};
use crate::formatter::{self, OutputFormat};
use crate::util::parse_assignment;

const HELP: &str = "\
Actions:
  select <template>       choose a template by id, name, or alias
  set <key>=<value>       fill one form field
  show                    print the selection, form values, and document
  reset                   clear every form field
  generate                generate a document from the form
  edit                    re-render the current document with the form values
  download <docx|pdf>     save the current document into the download directory
  templates               list the template catalog
  quit                    end the session
Ctrl-C aborts the request in flight, or ends the session when idle.";

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Select(String),
    Set(String, String),
    Show,
    Reset,
    Generate,
    Edit,
    Download(String),
    Templates,
    Help,
    Quit,
}

pub fn command() -> Command {
    Command::new("shell")
        .about("Run an interactive document session, reading one action per line from stdin")
}

/// Keeps one [`DocumentSession`] alive across actions read from stdin. A failed
/// action is reported on stderr and the session continues.
pub async fn run(session: &CliSession, _matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let format = OutputFormat::from(session.verbosity);
    let mut documents = session.document_session();
    if let Err(err) = documents.initialize().await {
        CliError::from(err).print();
    }

    let interrupted = Arc::new(Notify::new());
    let watcher = tokio::spawn(watch_interrupts(
        documents.abort_handle(),
        interrupted.clone(),
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut actions = 0;
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = interrupted.notified() => None,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let action = match parse_action(line) {
            Ok(Action::Quit) => break,
            Ok(Action::Help) => {
                println!("{HELP}");
                continue;
            }
            Ok(action) => action,
            Err(err) => {
                err.print();
                continue;
            }
        };
        match perform(session, &mut documents, action).await {
            Ok(result) => {
                formatter::render(&result, format)?;
                actions += 1;
            }
            Err(err) => err.print(),
        }
    }

    watcher.abort();
    Ok(CommandResult::SessionClosed { actions })
}

async fn watch_interrupts(abort: AbortHandle, interrupted: Arc<Notify>) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if abort.abort() {
            tracing::info!("in-flight request aborted");
        } else {
            interrupted.notify_one();
        }
    }
}

fn parse_action(line: &str) -> Result<Action, CliError> {
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let action = match verb.to_ascii_lowercase().as_str() {
        "select" => Action::Select(required(rest, "select <template>")?),
        "set" => {
            let (key, value) = if rest.contains('=') {
                parse_assignment(rest)?
            } else {
                let (key, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                (required(key, "set <key>=<value>")?, value.trim().to_string())
            };
            Action::Set(key, value)
        }
        "show" => Action::Show,
        "reset" => Action::Reset,
        "generate" => Action::Generate,
        "edit" => Action::Edit,
        "download" => Action::Download(required(rest, "download <docx|pdf>")?),
        "templates" => Action::Templates,
        "help" | "?" => Action::Help,
        "quit" | "exit" => Action::Quit,
        other => {
            return Err(CliError::new(
                format!("unknown action '{other}' (try 'help')"),
                ExitStatus::Usage,
            ));
        }
    };
    Ok(action)
}

fn required(value: &str, usage: &str) -> Result<String, CliError> {
    if value.is_empty() {
        Err(CliError::new(format!("usage: {usage}"), ExitStatus::Usage))
    } else {
        Ok(value.to_string())
    }
}

async fn perform(
    session: &CliSession,
    documents: &mut DocumentSession<HttpBackend>,
    action: Action,
) -> Result<CommandResult, CliError> {
    let result = match action {
        Action::Select(raw) => {
            documents.select_template(&session.catalog_identity(&raw))?;
            CommandResult::TemplateSelected {
                template: selected(documents)?,
                fields: documents.fields().to_vec(),
            }
        }
        Action::Set(key, value) => {
            documents.set_field(key.clone(), value.clone())?;
            CommandResult::FieldSet { key, value }
        }
        Action::Show => CommandResult::FormState {
            template: documents.selected().cloned(),
            state: documents.state(),
            values: documents.values(),
            document: documents.document().cloned(),
        },
        Action::Reset => {
            documents.reset_form();
            CommandResult::FormReset {
                fields: documents.fields().len(),
            }
        }
        Action::Generate => {
            let record = documents.generate().await?;
            CommandResult::DocumentGenerated {
                template: selected(documents)?,
                record,
                download: None,
            }
        }
        Action::Edit => {
            let artifact_path = documents.edit().await?;
            let document_id = documents
                .document()
                .map(|record| record.document_id.clone())
                .ok_or_else(|| CliError::new("document was lost", ExitStatus::Software))?;
            CommandResult::DocumentEdited {
                document_id,
                artifact_path,
            }
        }
        Action::Download(raw) => {
            let format: DocumentFormat = raw.parse()?;
            let artifact =
                download_into(documents, format, &session.config.download_dir).await?;
            CommandResult::DocumentDownloaded { artifact }
        }
        Action::Templates => {
            if !documents.catalog().is_loaded() {
                documents.initialize().await?;
            }
            CommandResult::TemplateList {
                templates: documents.catalog().templates().to_vec(),
            }
        }
        Action::Help | Action::Quit => {
            return Err(CliError::new(
                "action is handled by the shell loop",
                ExitStatus::Software,
            ));
        }
    };
    Ok(result)
}

fn selected(documents: &DocumentSession<HttpBackend>) -> Result<Template, CliError> {
    documents
        .selected()
        .cloned()
        .ok_or_else(|| CliError::from(DocgenError::NoTemplateSelected))
}
