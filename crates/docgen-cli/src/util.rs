use std::path::Path;

use crate::error::{CliError, ExitStatus};

#[derive(Clone, Copy, Debug, Default)]
pub struct Verbosity {
    pub json: bool,
    pub verbose: bool,
}

/// Splits a `key=value` assignment. The value may be empty or contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), CliError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(CliError::new(
            format!("assignment '{raw}' must have the form key=value"),
            ExitStatus::Usage,
        ));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::new(
            format!("assignment '{raw}' is missing a field key"),
            ExitStatus::Usage,
        ));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
