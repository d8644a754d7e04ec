//! Configuration for the replay stub.
//!
//! Built once at startup (YAML file and/or CLI flags) and passed by
//! reference to the fixture compiler, match engine and server.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fixture document: array of `{query?, req, res}`
    #[serde(default = "default_fixtures")]
    pub fixtures: PathBuf,
    /// JSON Schema every fixture request must satisfy
    #[serde(default = "default_request_schema")]
    pub request_schema: PathBuf,
    /// JSON Schema every fixture response must satisfy
    #[serde(default = "default_response_schema")]
    pub response_schema: PathBuf,

    /// Query parameter that turns on per-request debug tracing.
    /// Never part of the fingerprint.
    #[serde(default = "default_debug_parameter")]
    pub debug_parameter: String,
    /// Trace every request as if it carried the debug parameter
    #[serde(default)]
    pub forced_debug: bool,

    /// Port for the Prometheus endpoint; disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9797
}

fn default_fixtures() -> PathBuf {
    PathBuf::from("requestResponseMap.json")
}

fn default_request_schema() -> PathBuf {
    PathBuf::from("requestJsonSchema.json")
}

fn default_response_schema() -> PathBuf {
    PathBuf::from("responseJsonSchema.json")
}

fn default_debug_parameter() -> String {
    "debug".to_string()
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            fixtures: default_fixtures(),
            request_schema: default_request_schema(),
            response_schema: default_response_schema(),
            debug_parameter: default_debug_parameter(),
            forced_debug: false,
            metrics_port: None,
        }
    }
}

impl ReplayConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: ReplayConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.debug_parameter.is_empty() {
            anyhow::bail!("debugParameter must not be empty");
        }
        if self.debug_parameter.contains(['&', '=']) {
            anyhow::bail!(
                "debugParameter '{}' must not contain '&' or '='",
                self.debug_parameter
            );
        }
        if let Some(metrics_port) = self.metrics_port {
            if metrics_port == self.port && self.port != 0 {
                anyhow::bail!(
                    "metricsPort {} collides with the stub port",
                    metrics_port
                );
            }
        }
        Ok(())
    }

    /// Address string for the stub listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ReplayConfig::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:9797");
        assert_eq!(config.debug_parameter, "debug");
        assert!(!config.forced_debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port: 8080\nfixtures: data/map.json\nforcedDebug: true\nmetricsPort: 9090"
        )
        .unwrap();

        let config = ReplayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.fixtures, PathBuf::from("data/map.json"));
        assert_eq!(config.request_schema, PathBuf::from("requestJsonSchema.json"));
        assert!(config.forced_debug);
        assert_eq!(config.metrics_port, Some(9090));
    }

    #[test]
    fn test_invalid_debug_parameter() {
        let config = ReplayConfig {
            debug_parameter: "a=b".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ReplayConfig {
            debug_parameter: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_port_collision() {
        let config = ReplayConfig {
            metrics_port: Some(9797),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
