/// Per-engine configuration handed to generators at construction time.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("config is for engine '{found}', expected '{expected}'")]
    EngineMismatch { expected: String, found: String },
}

/// Macro name → (output column → source field name or literal text).
pub type MacroTable = BTreeMap<String, BTreeMap<String, String>>;

/// Settings common to every engine plus an engine-specific block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub engine: String,
    pub file_extension: String,
    #[serde(default)]
    pub indent_size: usize,
    pub options: EngineOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineOptions {
    Renpy {
        #[serde(default = "default_transition")]
        default_transition: String,
    },
    Naninovel {
        #[serde(default = "default_command_prefix")]
        command_prefix: String,
    },
    Utage {
        #[serde(default = "default_utage_columns")]
        columns: Vec<String>,
        #[serde(default)]
        macros: MacroTable,
    },
}

fn default_transition() -> String {
    "dissolve".to_string()
}

fn default_command_prefix() -> String {
    "@".to_string()
}

fn default_utage_columns() -> Vec<String> {
    [
        "", "Command", "Arg1", "Arg2", "Arg3", "Arg4", "Arg5", "Arg6", "WaitType", "Text",
        "PageCtrl", "Voice", "WindowType",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl EngineConfig {
    pub fn renpy() -> Self {
        Self {
            engine: "renpy".to_string(),
            file_extension: ".rpy".to_string(),
            indent_size: 4,
            options: EngineOptions::Renpy {
                default_transition: default_transition(),
            },
        }
    }

    pub fn naninovel() -> Self {
        Self {
            engine: "naninovel".to_string(),
            file_extension: ".nani".to_string(),
            indent_size: 0,
            options: EngineOptions::Naninovel {
                command_prefix: default_command_prefix(),
            },
        }
    }

    pub fn utage() -> Self {
        Self {
            engine: "utage".to_string(),
            file_extension: ".xlsx".to_string(),
            indent_size: 0,
            options: EngineOptions::Utage {
                columns: default_utage_columns(),
                macros: MacroTable::new(),
            },
        }
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn output_filename(&self, sheet_name: &str) -> String {
        format!("{}{}", sheet_name, self.file_extension)
    }

    /// Fails unless this config was written for `engine`.
    pub fn expect_engine(&self, engine: &str) -> Result<(), ConfigError> {
        if self.engine == engine {
            Ok(())
        } else {
            Err(ConfigError::EngineMismatch {
                expected: engine.to_string(),
                found: self.engine.clone(),
            })
        }
    }

    /// Ren'Py default transition, if this is a Ren'Py config.
    pub fn default_transition(&self) -> Option<&str> {
        match &self.options {
            EngineOptions::Renpy { default_transition } => Some(default_transition),
            _ => None,
        }
    }

    /// Naninovel command prefix, if this is a Naninovel config.
    pub fn command_prefix(&self) -> Option<&str> {
        match &self.options {
            EngineOptions::Naninovel { command_prefix } => Some(command_prefix),
            _ => None,
        }
    }

    /// Utage sheet columns, if this is a Utage config.
    pub fn columns(&self) -> Option<&[String]> {
        match &self.options {
            EngineOptions::Utage { columns, .. } => Some(columns),
            _ => None,
        }
    }

    /// Utage macro table, if this is a Utage config.
    pub fn macros(&self) -> Option<&MacroTable> {
        match &self.options {
            EngineOptions::Utage { macros, .. } => Some(macros),
            _ => None,
        }
    }
}
