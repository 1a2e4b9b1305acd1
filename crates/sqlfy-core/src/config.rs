//! Configuration schema (sqlfy.toml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the invocation directory
pub const CONFIG_FILE_NAME: &str = "sqlfy.toml";

/// What the pipeline does after a file fails to convert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Keep converting the remaining files, fail the run at the end
    Isolate,

    /// Stop scheduling new files after the first failure (legacy behaviour)
    FailFast,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::Isolate
    }
}

/// A user method exposed to templates under `$`
///
/// Either a bare expression body (no parameters) or a table with
/// explicit parameter names:
///
/// ```toml
/// [methods]
/// sample = "'hello_method'"
/// prefixed = { params = ["name"], body = "'tmp_' + name" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodSpec {
    /// Zero-parameter method
    Body(String),

    /// Method with named parameters
    Full {
        #[serde(default)]
        params: Vec<String>,
        body: String,
    },
}

impl MethodSpec {
    /// Parameter names, in call order
    pub fn params(&self) -> &[String] {
        match self {
            Self::Body(_) => &[],
            Self::Full { params, .. } => params,
        }
    }

    /// Expression source of the method body
    pub fn body(&self) -> &str {
        match self {
            Self::Body(body) => body,
            Self::Full { body, .. } => body,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned for templates
    #[serde(default, alias = "sourceDir")]
    pub source_dir: PathBuf,

    /// Directory that receives the rendered `.sql` files
    #[serde(default, alias = "destDir")]
    pub dest_dir: PathBuf,

    /// Extension (leading dot included) that marks a file as a template
    #[serde(default, alias = "templateExtension")]
    pub template_extension: String,

    /// User variables, bound to `_` in templates
    #[serde(default)]
    pub vars: BTreeMap<String, serde_json::Value>,

    /// User methods, bound to `$` in templates
    #[serde(default)]
    pub methods: BTreeMap<String, MethodSpec>,

    /// Maximum number of files converted concurrently
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Failure handling for per-file errors
    #[serde(default, alias = "failurePolicy")]
    pub failure_policy: FailurePolicy,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            dest_dir: PathBuf::new(),
            template_extension: String::new(),
            vars: BTreeMap::new(),
            methods: BTreeMap::new(),
            jobs: None,
            failure_policy: FailurePolicy::default(),
            project_root: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Relative directories are relative to the config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check the required fields and value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("source_dir"));
        }
        if self.dest_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("dest_dir"));
        }
        if self.template_extension.is_empty() {
            return Err(ConfigError::MissingField("template_extension"));
        }
        if !self.template_extension.starts_with('.') {
            return Err(ConfigError::InvalidField {
                field: "template_extension",
                reason: format!("'{}' must start with '.'", self.template_extension),
            });
        }
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidField {
                field: "jobs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Source directory resolved against the project root
    pub fn source_path(&self) -> PathBuf {
        self.project_root.join(&self.source_dir)
    }

    /// Destination directory resolved against the project root
    pub fn dest_path(&self) -> PathBuf {
        self.project_root.join(&self.dest_dir)
    }

    /// Concurrency bound, falling back to the number of available CPUs
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("config is missing required property '{0}'")]
    MissingField(&'static str),

    #[error("invalid '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("invalid method '${name}': {message}")]
    InvalidMethod { name: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = r#"
source_dir = "./src"
dest_dir = "./dist"
template_extension = ".tpl"
jobs = 4
failure_policy = "fail-fast"

[vars]
sample = "hello_variable"
tables = ["a", "b"]

[methods]
sample = "'hello_method'"
prefixed = { params = ["name"], body = "'tmp_' + name" }
"#;

    #[test]
    fn parse_full_config() {
        let config = Config::from_toml(FULL).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("./src"));
        assert_eq!(config.template_extension, ".tpl");
        assert_eq!(config.jobs, Some(4));
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.vars["sample"], serde_json::json!("hello_variable"));
        assert_eq!(config.vars["tables"], serde_json::json!(["a", "b"]));
        assert_eq!(config.methods["sample"].body(), "'hello_method'");
        assert!(config.methods["sample"].params().is_empty());
        assert_eq!(config.methods["prefixed"].params(), ["name".to_string()]);
        config.validate().unwrap();
    }

    #[test]
    fn camel_case_aliases() {
        let config = Config::from_toml(
            "sourceDir = 'src'\ndestDir = 'dist'\ntemplateExtension = '.sql'\n",
        )
        .unwrap();
        assert_eq!(config.dest_dir, PathBuf::from("dist"));
        assert!(config.vars.is_empty());
        assert!(config.methods.is_empty());
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
    }

    #[test]
    fn missing_required_fields() {
        let config = Config::from_toml("source_dir = 'src'\ntemplate_extension = '.sql'").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField("dest_dir"))
        ));

        assert!(matches!(
            Config::default().validate(),
            Err(ConfigError::MissingField("source_dir"))
        ));
    }

    #[test]
    fn extension_must_start_with_dot() {
        let config = Config::from_toml("source_dir = 's'\ndest_dir = 'd'\ntemplate_extension = 'sql'")
            .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField { field: "template_extension", .. })
        ));
    }

    #[test]
    fn zero_jobs_rejected() {
        let config = Config::from_toml(
            "source_dir = 's'\ndest_dir = 'd'\ntemplate_extension = '.sql'\njobs = 0",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField { field: "jobs", .. })
        ));
    }

    #[test]
    fn paths_resolve_against_project_root() {
        let mut config = Config::from_toml(FULL).unwrap();
        config.project_root = PathBuf::from("/proj");
        assert_eq!(config.source_path(), PathBuf::from("/proj/./src"));

        config.dest_dir = PathBuf::from("/abs/out");
        assert_eq!(config.dest_path(), PathBuf::from("/abs/out"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            Config::from_toml("source_dir = "),
            Err(ConfigError::ParseError(_))
        ));
    }
}
