//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::MuxConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<MuxConfig, ConfigError> {
    let config: MuxConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MuxConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_values() {
        let err = parse_config(
            r#"
            [listener]
            max_connections = 0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::MaxConnections]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            parse_config("[paths\nadmin_root_path = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("protomux-{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }
}
