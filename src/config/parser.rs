use super::AppConfig;
use crate::errors::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

/// `<config dir>/taskgraph/config.yaml`, when the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskgraph").join("config.yaml"))
}

/// Loads the application configuration.
///
/// The format follows the file extension: `.toml` is parsed as TOML,
/// anything else as YAML. When no path is given, the default location is
/// tried and a missing file yields the built-in defaults. `DATABASE_PATH`
/// overrides `database.path`.
///
/// # Errors
///
/// Returns an error if an explicitly given file cannot be read, if the
/// content cannot be parsed, or if `request_timeout` is not a duration.
pub fn load_app_config(file_path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match file_path {
        Some(path) => parse_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => parse_file(&path)?,
            _ => {
                info!("No configuration file found, using defaults");
                AppConfig::default()
            }
        },
    };

    if let Ok(db_path) = std::env::var("DATABASE_PATH") {
        config.database.path = db_path;
    }
    if config.llm.provider.trim().is_empty() {
        return Err(Error::Config("llm.provider must not be empty".into()));
    }
    config.request_timeout()?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "llm:\n  provider: anthropic\n  model: claude-3-5-sonnet-latest\nengine:\n  max_retries: 4").unwrap();

        let config = load_app_config(Some(file.path())).unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.engine.max_retries, 4);
        assert_eq!(config.api.port, 3000);
        assert!(config.guardrail.enabled);
        assert_eq!(
            config.request_timeout().unwrap(),
            std::time::Duration::from_secs(60)
        );
    }

    #[test]
    fn toml_is_chosen_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "request_timeout = \"2m\"\n[api]\nport = 8080\n[guardrail]\nenabled = false"
        )
        .unwrap();

        let config = load_app_config(Some(file.path())).unwrap();
        assert_eq!(config.api.port, 8080);
        assert!(!config.guardrail.enabled);
        assert_eq!(config.engine.max_retries, 2);
        assert_eq!(
            config.request_timeout().unwrap(),
            std::time::Duration::from_secs(120)
        );
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "request_timeout: soon").unwrap();
        assert!(matches!(
            load_app_config(Some(file.path())),
            Err(Error::Config(_))
        ));
    }
}
