use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Duplicate key '{key}' in section '{section}'")]
    DuplicateKey { key: String, section: String },

    #[error("No resolver registered for tag '{tag}'")]
    NoResolver { tag: String },

    #[error("Cannot parse '{text}' as {tag}")]
    Coercion { tag: String, text: String },

    #[error("'{value}' is not one of {choices:?}")]
    Choice { value: String, choices: Vec<String> },

    #[error("Malformed line {line} in {path}")]
    Parse { path: PathBuf, line: usize },

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Interpolation cycle: {path}")]
    InterpolationCycle { path: String },

    #[error("Failed to access {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("No user file attached; call set_userfile first")]
    NoUserFile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_formats_path_and_line() {
        let err = SettingsError::Parse {
            path: "/etc/myapp/myapp.conf".into(),
            line: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("myapp.conf"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn choice_lists_alternatives() {
        let err = SettingsError::Choice {
            value: "float".into(),
            choices: vec!["str".into(), "int".into(), "bool".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("float"));
        assert!(msg.contains("int"));
    }

    #[test]
    fn no_user_file_names_the_call() {
        assert!(
            SettingsError::NoUserFile
                .to_string()
                .contains("set_userfile")
        );
    }
}
