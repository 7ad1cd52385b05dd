//! Configuration types for sonicdt

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{SonicError, SonicResult};

/// Default artifact file name, resolved against the working directory
pub const DEFAULT_MODEL_FILE: &str = "model.bin";

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Model artifact configuration
    pub model: ModelConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> SonicResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SonicError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> SonicResult<Self> {
        toml::from_str(content)
            .map_err(|e| SonicError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> SonicResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> SonicResult<()> {
        if self.server.port == 0 {
            return Err(SonicError::Config("server.port must be non-zero".to_string()));
        }
        self.model.source.validate()?;
        if self.model.fetch_timeout_secs == 0 {
            return Err(SonicError::Config(
                "model.fetch_timeout_secs must be non-zero".to_string(),
            ));
        }
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(SonicError::Config(format!(
                "logging.format must be 'text' or 'json', got '{}'",
                other
            ))),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub address: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8501,
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Where the artifact comes from
    pub source: ModelSource,
    /// Upper bound on a remote fetch, in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::default(),
            fetch_timeout_secs: 300,
        }
    }
}

/// Location of the model artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelSource {
    /// A file that must already exist on disk
    Local { path: PathBuf },
    /// A downloadable file cached at `destination`
    Remote { url: String, destination: PathBuf },
}

impl Default for ModelSource {
    fn default() -> Self {
        ModelSource::Local {
            path: PathBuf::from(DEFAULT_MODEL_FILE),
        }
    }
}

impl ModelSource {
    /// Path the artifact is (or will be) read from
    pub fn local_path(&self) -> &Path {
        match self {
            ModelSource::Local { path } => path,
            ModelSource::Remote { destination, .. } => destination,
        }
    }

    pub fn validate(&self) -> SonicResult<()> {
        if self.local_path().as_os_str().is_empty() {
            return Err(SonicError::Config(
                "model source path must not be empty".to_string(),
            ));
        }
        if let ModelSource::Remote { url, .. } = self {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SonicError::Config(format!(
                    "model source url must be http(s): {}",
                    url
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::Local { path } => write!(f, "local:{}", path.display()),
            ModelSource::Remote { url, destination } => {
                write!(f, "remote:{} -> {}", url, destination.display())
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive
    pub level: String,
    /// Log format (json or text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.model.source.local_path(), Path::new("model.bin"));
        assert_eq!(config.model.fetch_timeout_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_remote_source_parse() {
        let toml_str = r#"
[server]
port = 9000

[model]
fetch_timeout_secs = 60

[model.source]
kind = "remote"
url = "https://models.example.com/dt/cmodel.bin"
destination = "cache/cmodel.bin"

[logging]
format = "json"
"#;
        let config = ServiceConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(
            config.model.source,
            ModelSource::Remote {
                url: "https://models.example.com/dt/cmodel.bin".to_string(),
                destination: PathBuf::from("cache/cmodel.bin"),
            }
        );
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_source_parse() {
        let toml_str = r#"
[model.source]
kind = "local"
path = "/srv/models/model.bin"
"#;
        let config = ServiceConfig::from_toml(toml_str).unwrap();
        assert_eq!(
            config.model.source.local_path(),
            Path::new("/srv/models/model.bin")
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(config.validate(), Err(SonicError::Config(_))));

        let mut config = ServiceConfig::default();
        config.model.source = ModelSource::Remote {
            url: "ftp://example.com/model.bin".to_string(),
            destination: PathBuf::from("model.bin"),
        };
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.model.source = ModelSource::Local {
            path: PathBuf::new(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let err = ServiceConfig::from_file(Path::new("/nonexistent/sonicdt.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sonicdt.toml");
        std::fs::write(&path, "[server]\nport = 8600\n").unwrap();
        let config = ServiceConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 8600);
        assert_eq!(ServiceConfig::load(None).unwrap(), ServiceConfig::default());
    }

    #[test]
    fn test_source_display() {
        let source = ModelSource::default();
        assert_eq!(source.to_string(), "local:model.bin");
    }
}
