//! Startup file loading: schemas and fixture document from disk.

use crate::config::ReplayConfig;
use crate::fixture::{FixtureCompiler, LookupTable, SchemaSet};
use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Read and parse a JSON file
pub fn read_json_file(path: &Path) -> Result<Value, anyhow::Error> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Load and compile the request and response schemas
pub fn load_schemas(request: &Path, response: &Path) -> Result<SchemaSet, anyhow::Error> {
    let request = read_json_file(request)?;
    let response = read_json_file(response)?;
    Ok(SchemaSet::new(&request, &response)?)
}

/// Load schemas and fixtures named by the config and build the table.
pub fn load_lookup_table(config: &ReplayConfig) -> Result<LookupTable, anyhow::Error> {
    let schemas = load_schemas(&config.request_schema, &config.response_schema)?;
    let document = std::fs::read_to_string(&config.fixtures)
        .with_context(|| format!("Unable to read {}", config.fixtures.display()))?;

    let table = FixtureCompiler::new(&schemas)
        .compile(&document)
        .with_context(|| format!("Unable to load fixtures from {}", config.fixtures.display()))?;
    info!(
        "Number of fake request/response: {} (from {})",
        table.len(),
        config.fixtures.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_lookup_table() {
        let request = json_file(r#"{"type": "object"}"#);
        let response = json_file(r#"{"type": "object"}"#);
        let fixtures = json_file(r#"[{"req": {"a": 1}, "res": {"ok": true}}]"#);
        let config = ReplayConfig {
            fixtures: fixtures.path().to_path_buf(),
            request_schema: request.path().to_path_buf(),
            response_schema: response.path().to_path_buf(),
            ..Default::default()
        };

        let table = load_lookup_table(&config).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_schema_file() {
        let config = ReplayConfig {
            request_schema: "/nonexistent/request.json".into(),
            ..Default::default()
        };
        let err = load_lookup_table(&config).unwrap_err();
        assert!(err.to_string().contains("Unable to read"));
    }

    #[test]
    fn test_fatal_compile_error_is_reported() {
        let schema = json_file("{}");
        let fixtures = json_file(r#"{"not": "an array"}"#);
        let config = ReplayConfig {
            fixtures: fixtures.path().to_path_buf(),
            request_schema: schema.path().to_path_buf(),
            response_schema: schema.path().to_path_buf(),
            ..Default::default()
        };
        let err = load_lookup_table(&config).unwrap_err();
        assert!(err.to_string().contains("Unable to load fixtures"));
    }
}
