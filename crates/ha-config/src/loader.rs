//! YAML loader resolving the configuration tags
//!
//! - `!include path` - the parsed contents of another file, relative to the
//!   including file
//! - `!secret key` - a value from `secrets.yaml`
//! - `!env_var VAR` - an environment variable

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub struct YamlLoader {
    config_dir: PathBuf,
    secrets: Secrets,
    /// Files currently being loaded, outermost first
    include_stack: Vec<PathBuf>,
}

impl YamlLoader {
    /// Loader for a config directory, reading its `secrets.yaml`
    pub fn new(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self::with_secrets(config_dir, secrets))
    }

    pub fn with_secrets(config_dir: impl Into<PathBuf>, secrets: Secrets) -> Self {
        Self {
            config_dir: config_dir.into(),
            secrets,
            include_stack: Vec::new(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load a file, relative paths resolving against the config directory
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = match path.as_ref() {
            p if p.is_absolute() => p.to_path_buf(),
            p => self.config_dir.join(p),
        };
        if self.include_stack.contains(&path) {
            return Err(ConfigError::CircularInclude { path });
        }

        debug!(?path, "Loading YAML file");
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        self.include_stack.push(path.clone());
        let result = self.load_str(&content, &path);
        self.include_stack.pop();
        result
    }

    /// Parse YAML text; `source` names it in errors and anchors includes
    pub fn load_str(&mut self, content: &str, source: &Path) -> ConfigResult<Value> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|err| ConfigError::ParseYaml {
                path: source.to_path_buf(),
                source: err,
            })?;
        self.resolve(value, source)
    }

    fn resolve(&mut self, value: Value, source: &Path) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged, source),
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key, self.resolve(value, source)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|v| self.resolve(v, source))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            other => Ok(other),
        }
    }

    fn resolve_tag(&mut self, tagged: TaggedValue, source: &Path) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!(tag = %tag, "Resolving tag");

        match tag.as_str() {
            "!include" => {
                let target = tag_argument(&tag, tagged.value)?;
                let base = source.parent().unwrap_or(&self.config_dir).to_path_buf();
                self.load_file(base.join(target))
            }
            "!secret" => {
                let key = tag_argument(&tag, tagged.value)?;
                Ok(Value::String(self.secrets.get(&key)?.to_string()))
            }
            "!env_var" => {
                let var = tag_argument(&tag, tagged.value)?;
                std::env::var(&var)
                    .map(Value::String)
                    .map_err(|_| ConfigError::EnvVarNotFound { var })
            }
            _ => {
                // Tags owned by integrations are passed through
                let value = self.resolve(tagged.value, source)?;
                Ok(Value::Tagged(Box::new(TaggedValue {
                    tag: tagged.tag,
                    value,
                })))
            }
        }
    }
}

fn tag_argument(tag: &str, value: Value) -> ConfigResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ConfigError::InvalidValue {
            key: tag.to_string(),
            reason: format!("expected a string argument, got {other:?}"),
        }),
    }
}

/// Load a file from a config directory with all tags resolved
pub fn load_yaml(config_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Value> {
    YamlLoader::new(config_dir)?.load_file(file)
}
