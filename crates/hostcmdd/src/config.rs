//! Daemon configuration file

use std::path::{Path, PathBuf};

use hostcmd_core::{DefinitionError, Registry};
use hostcmd_protocol::ParserConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Command {name}: {source}")]
    Definition {
        name: String,
        #[source]
        source: DefinitionError,
    },
}

/// One `[[command]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandDef {
    pub name: String,
    /// Parameter list, e.g. `"d d ?s"`
    #[serde(default)]
    pub params: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub parser: ParserConfig,
    #[serde(rename = "command")]
    pub commands: Vec<CommandDef>,
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Compile every command definition into a registry sized for the
    /// configured token buffer
    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        let mut registry = Registry::new(self.parser.effective_capacity());

        for def in &self.commands {
            let count = registry
                .define_with(def.name.as_str(), &def.params)
                .map_err(|source| ConfigError::Definition {
                    name: def.name.clone(),
                    source,
                })?;
            debug!(command = %def.name, params = count, "Loaded command");
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[parser]
buffer_capacity = 32
interactive = true
prompt = "> "

[[command]]
name = "LED"
params = "d b"

[[command]]
name = "PING"
"#;

    #[test]
    fn test_parse_sample() {
        let config = DaemonConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.parser.buffer_capacity, 32);
        assert!(config.parser.interactive);
        assert!(config.parser.escapes);
        assert_eq!(config.commands.len(), 2);
        assert_eq!(config.commands[1].params, "");

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.max_param_len(), 31);
        assert!(registry.find("led").is_some());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = DaemonConfig::from_toml("").unwrap();
        assert_eq!(config, DaemonConfig::default());
        assert!(config.build_registry().unwrap().is_empty());
    }

    #[test]
    fn test_bad_definition_names_command() {
        let config = DaemonConfig::from_toml(
            r#"
[[command]]
name = "BAD"
params = "d x"
"#,
        )
        .unwrap();

        let err = config.build_registry().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Definition { ref name, source: DefinitionError::BadPcode('x') } if name == "BAD"
        ));
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let config = DaemonConfig::from_toml(
            r#"
[[command]]
name = "A"

[[command]]
name = "a"
"#,
        )
        .unwrap();

        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::Definition { source: DefinitionError::DuplicateName(_), .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(config.commands[0].name, "LED");

        let missing = DaemonConfig::load(Path::new("/nonexistent/hostcmd.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
