use std::process::ExitCode;

use docgen::{DocumentState, FieldDescriptor};
use serde_json::json;

use crate::commands::{CommandResult, SavedArtifact};
use crate::error::CliError;
use crate::util::Verbosity;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<Verbosity> for OutputFormat {
    fn from(verbosity: Verbosity) -> Self {
        if verbosity.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Prints the final result of a command and converts it into the process exit code.
pub fn emit_result(result: CommandResult, format: OutputFormat) -> Result<ExitCode, CliError> {
    render(&result, format)?;
    Ok(ExitCode::SUCCESS)
}

/// Prints one result as text or a single JSON line.
pub fn render(result: &CommandResult, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => print_text(result),
        OutputFormat::Json => print_json(result)?,
    };
    Ok(())
}

fn print_text(result: &CommandResult) {
    match result {
        CommandResult::TemplateList { templates } => {
            println!("Templates ({}):", templates.len());
            for template in templates {
                match &template.description {
                    Some(description) => {
                        println!("  - {}: {} ({description})", template.id, template.name)
                    }
                    None => println!("  - {}: {}", template.id, template.name),
                }
            }
        }
        CommandResult::FieldList { template, fields } => {
            println!("Fields for '{template}' ({}):", fields.len());
            print_fields(fields);
        }
        CommandResult::TemplateSelected { template, fields } => {
            if fields.is_empty() {
                println!(
                    "Selected template '{}' ({}); no form is registered for it",
                    template.name, template.id
                );
            } else {
                println!(
                    "Selected template '{}' ({}) with {} fields:",
                    template.name,
                    template.id,
                    fields.len()
                );
                print_fields(fields);
            }
        }
        CommandResult::FieldSet { key, value } => {
            println!("Set {key} = {value}");
        }
        CommandResult::FormState {
            template,
            state,
            values,
            document,
        } => {
            match template {
                Some(template) => println!("Template: {} ({})", template.name, template.id),
                None => println!("Template: none selected"),
            }
            println!("State: {}", state_label(*state));
            if let Some(document) = document {
                println!(
                    "Document: {} at {}",
                    document.document_id, document.artifact_path
                );
            }
            for (key, value) in values.iter() {
                println!("  {key} = {value}");
            }
        }
        CommandResult::FormReset { fields } => {
            println!("Cleared {fields} fields");
        }
        CommandResult::DocumentGenerated {
            template,
            record,
            download,
        } => {
            println!(
                "Generated document {} from '{}' at {}",
                record.document_id, template.name, record.artifact_path
            );
            if let Some(artifact) = download {
                print_artifact(artifact);
            }
        }
        CommandResult::DocumentEdited {
            document_id,
            artifact_path,
        } => {
            println!("Updated document {document_id} at {artifact_path}");
        }
        CommandResult::DocumentDownloaded { artifact } => print_artifact(artifact),
        CommandResult::TemplateRegistered { template, uploaded } => {
            let verb = if *uploaded { "Uploaded" } else { "Registered" };
            println!("{verb} template '{}' with id {}", template.name, template.id);
        }
        CommandResult::SessionClosed { actions } => {
            println!("Session closed after {actions} actions");
        }
    }
}

fn print_fields(fields: &[FieldDescriptor]) {
    for field in fields {
        println!("  - {} [{}]: {}", field.key, field.input_kind, field.label);
    }
}

fn print_artifact(artifact: &SavedArtifact) {
    println!(
        "Downloaded document {} as {} to {} ({} bytes)",
        artifact.document_id, artifact.format, artifact.path, artifact.bytes
    );
}

fn state_label(state: DocumentState) -> &'static str {
    match state {
        DocumentState::NoDocument => "no document",
        DocumentState::Generating => "generating",
        DocumentState::Generated => "generated",
        DocumentState::Editing => "editing",
        DocumentState::Downloading => "downloading",
    }
}

fn print_json(result: &CommandResult) -> Result<(), CliError> {
    let payload = json!(result);
    println!("{payload}");
    Ok(())
}
