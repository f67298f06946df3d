// Settings loading for tweetcap

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;

pub use env::{ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{DeliverySettings, LOG_FORMATS, LOG_LEVELS, LogSettings, Settings};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Builds [`Settings`] from layered sources.
///
/// Later layers win: defaults, settings file, `.env` file, process
/// environment, explicit overrides. The result is validated.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    dotenv: Option<PathBuf>,
    env: EnvLoader,
    process_env: bool,
    overrides: HashMap<String, String>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            dotenv: None,
            env: EnvLoader::default(),
            process_env: true,
            overrides: HashMap::new(),
        }
    }

    /// Settings file; format picked from the extension
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Read prefixed variables from a dotenv file without touching the process environment
    pub fn dotenv(mut self, path: impl AsRef<Path>) -> Self {
        self.dotenv = Some(path.as_ref().to_path_buf());
        self
    }

    /// Prefix for environment variables (default `TWEETCAP`)
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env = EnvLoader::new(prefix);
        self
    }

    /// Skip the process environment
    pub fn without_process_env(mut self) -> Self {
        self.process_env = false;
        self
    }

    /// Explicit override using the prefixed variable name, e.g. `TWEETCAP_LOG_LEVEL`
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Explicit overrides using prefixed variable names
    pub fn overrides<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn load(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(path) = &self.file {
            let loader = ConfigLoader::auto(path)?;
            let value = loader.load_file(path)?;
            match loader.format() {
                FileFormat::Env => {
                    let vars = string_pairs(value);
                    self.apply(&mut settings, self.env.collect(vars))?;
                }
                FileFormat::Json | FileFormat::Toml => {
                    settings = serde_json::from_value(value)
                        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
                }
            }
        }

        if let Some(path) = &self.dotenv {
            let vars = dotenvy::from_path_iter(path)
                .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
            self.apply(&mut settings, self.env.collect(vars))?;
        }

        if self.process_env {
            self.apply(&mut settings, self.env.load())?;
        }

        self.apply(&mut settings, self.env.collect(self.overrides.clone()))?;

        settings.validate()?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut Settings, vars: HashMap<String, String>) -> Result<()> {
        // sorted so a bad value is reported deterministically
        let mut vars: Vec<_> = vars.into_iter().collect();
        vars.sort();
        for (key, value) in vars {
            settings.apply_override(&key, &value)?;
        }
        Ok(())
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn string_pairs(value: serde_json::Value) -> Vec<(String, String)> {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
