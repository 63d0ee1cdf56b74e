use crate::error::{AppError, Result};
use crate::output_formats::get_builtin_ignore_patterns;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".codecontext";
pub const DEFAULT_CONFIG_FILENAME: &str = "codecontext.toml";
pub const DEFAULT_OUTPUT_FILE: &str = "ProjectStructure.md";
pub const DEFAULT_MAX_PREVIEW_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub ignore: IgnoreConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default = "default_true")]
    pub ignore_dot_files: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IgnoreConfig {
    #[serde(default = "default_true")]
    pub builtin: bool,
    #[serde(default)]
    pub skip_dirs: Vec<String>,
    #[serde(default)]
    pub skip_files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PreviewConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_preview_size")]
    pub max_file_size: u64,
    #[serde(default = "default_true")]
    pub redact: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub include_timestamp: bool,
}

fn default_true() -> bool {
    true
}
fn default_output_file() -> String {
    DEFAULT_OUTPUT_FILE.to_string()
}
fn default_max_preview_size() -> u64 {
    DEFAULT_MAX_PREVIEW_SIZE
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            use_gitignore: default_true(),
            ignore_dot_files: default_true(),
        }
    }
}
impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            builtin: default_true(),
            skip_dirs: Vec::new(),
            skip_files: Vec::new(),
        }
    }
}
impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_file_size: default_max_preview_size(),
            redact: default_true(),
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        let resolved = path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize project root '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })?;
        if !resolved.is_dir() {
            return Err(AppError::InvalidArgument(format!(
                "Project root is not a directory: {}",
                resolved.display()
            )));
        }
        Ok(resolved)
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let path_to_check = match cli_config_file {
            Some(p_str) => {
                let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
                if path.is_relative() {
                    path = project_root.join(path);
                }
                if !path.exists() && path.extension().is_none() {
                    path.set_extension("toml");
                }
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Some(path)
            }
            None => {
                let default_path = project_root
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Some(default_path)
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    None
                }
            }
        };
        Ok(path_to_check)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(content)
            .map_err(|e| AppError::TomlParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(AppError::TomlSerialize)
    }

    fn validate(&self) -> Result<()> {
        let output_file = self.general.output_file.trim();
        if output_file.is_empty() {
            return Err(AppError::Config(
                "general.output_file must not be empty".to_string(),
            ));
        }
        for pattern in self.ignore.skip_dirs.iter().chain(&self.ignore.skip_files) {
            if pattern.trim().is_empty() {
                return Err(AppError::Config(
                    "ignore.skip_dirs and ignore.skip_files must not contain empty entries"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Directory names skipped at any depth: built-ins (when enabled) plus configured extras.
    pub fn effective_skip_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = if self.ignore.builtin {
            get_builtin_ignore_patterns().directories.clone()
        } else {
            Vec::new()
        };
        dirs.extend(self.ignore.skip_dirs.iter().map(|d| d.trim().to_string()));
        dirs
    }

    pub fn effective_skip_files(&self) -> Vec<String> {
        let mut files: Vec<String> = if self.ignore.builtin {
            get_builtin_ignore_patterns().files.clone()
        } else {
            Vec::new()
        };
        files.extend(self.ignore.skip_files.iter().map(|f| f.trim().to_string()));
        files
    }

    /// The generated document must never describe itself.
    pub fn output_path(&self, project_root: &Path) -> PathBuf {
        let output = PathBuf::from(shellexpand::tilde(self.general.output_file.trim()).as_ref());
        if output.is_absolute() {
            output
        } else {
            project_root.join(output)
        }
    }
}

/// Splits a comma separated CLI value, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
