//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::QuarryConfig;
use crate::config::secret_string;
use crate::domain::errors::QuarryError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into QuarryConfig
/// 4. Applies environment variable overrides (QUARRY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`QuarryError::Configuration`] if the file is missing or unreadable,
/// a referenced variable is unset, parsing fails, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use quarry::config::loader::load_config;
///
/// let config = load_config("quarry.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<QuarryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(QuarryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        QuarryError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Parses, overrides and validates configuration text
pub fn load_config_from_str(contents: &str) -> Result<QuarryConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: QuarryConfig = toml::from_str(&contents)
        .map_err(|e| QuarryError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        QuarryError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. Every missing variable is reported at once.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| QuarryError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(QuarryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            QuarryError::Configuration(format!("Environment variable {name} has invalid value '{val}'"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using QUARRY_* prefix
///
/// Environment variables follow the pattern: QUARRY_<SECTION>_<KEY>
/// For example: QUARRY_EXPORT_CHUNK_SIZE, QUARRY_WORKERS_POOL_SIZE
fn apply_env_overrides(config: &mut QuarryConfig) -> Result<()> {
    if let Ok(val) = std::env::var("QUARRY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Export overrides
    if let Some(v) = env_parse("QUARRY_EXPORT_CHUNK_SIZE")? {
        config.export.chunk_size = v;
    }
    if let Some(v) = env_parse("QUARRY_EXPORT_MAX_ROWS_PER_SHEET")? {
        config.export.max_rows_per_sheet = v;
    }
    if let Some(v) = env_parse("QUARRY_EXPORT_SYNC_THRESHOLD")? {
        config.export.sync_threshold = v;
    }
    if let Ok(val) = std::env::var("QUARRY_EXPORT_EXPORT_DIRECTORY") {
        config.export.export_directory = val;
    }
    if let Some(v) = env_parse("QUARRY_EXPORT_MEMORY_ROWS_IN_WINDOW")? {
        config.export.memory_rows_in_window = v;
    }
    if let Some(v) = env_parse("QUARRY_EXPORT_MAX_CELL_LENGTH")? {
        config.export.max_cell_length = v;
    }

    // Worker overrides
    if let Some(v) = env_parse("QUARRY_WORKERS_POOL_SIZE")? {
        config.workers.pool_size = v;
    }
    if let Some(v) = env_parse("QUARRY_WORKERS_QUEUE_CAPACITY")? {
        config.workers.queue_capacity = v;
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Ok(val) = std::env::var("QUARRY_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("QUARRY_POSTGRESQL_TABLE") {
            pg.table = val;
        }
        if let Some(v) = env_parse("QUARRY_POSTGRESQL_MAX_CONNECTIONS")? {
            pg.max_connections = v;
        }
    }

    // Logging overrides
    if let Some(v) = env_parse("QUARRY_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = v;
    }
    if let Ok(val) = std::env::var("QUARRY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("QUARRY_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${QUARRY_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"");
        std::env::remove_var("QUARRY_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("QUARRY_LOADER_MISSING_VAR");
        let input = "password = \"${QUARRY_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("QUARRY_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# uses ${QUARRY_LOADER_UNSET_IN_COMMENT}\nchunk_size = 10";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${QUARRY_LOADER_UNSET_IN_COMMENT}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(QuarryError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[export]
chunk_size = 500
max_rows_per_sheet = 20000
export_directory = "/tmp/quarry-exports"

[workers]
pool_size = 4
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.export.chunk_size, 500);
        assert_eq!(config.export.max_rows_per_sheet, 20_000);
        assert_eq!(config.export.sync_threshold, 100_000);
        assert_eq!(config.workers.pool_size, 4);
        assert_eq!(config.workers.queue_capacity, 10);
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let err = load_config_from_str("[export]\nchunk_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }
}
