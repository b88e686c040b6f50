use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `ROOMVIEW_PAGINATION__PAGE_SIZE=25`.
pub const ENV_PREFIX: &str = "ROOMVIEW_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load built-in defaults with environment variable overrides
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[pagination]
page_size = 20

[media]
trigger_margin = 100.0
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.pagination.page_size, 20);
        assert_eq!(config.media.trigger_margin, 100.0);
        assert_eq!(config.media.video_visibility_threshold, 0.5);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[pagination]
page_size = "ten"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/roomview.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[pagination]
page_size = 5

[pagination.sentinel]
trigger_margin = 300.0

[view]
skeleton_count = 3
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.pagination.page_size, 5);
        assert_eq!(config.pagination.sentinel.trigger_margin, 300.0);
        assert_eq!(config.pagination.sentinel.visibility_threshold, 0.1);
        assert_eq!(config.view.skeleton_count, 3);
        assert_eq!(config.mock.room_count, 100);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "roomview.toml",
                r#"
[pagination]
page_size = 5
"#,
            )?;
            jail.set_env("ROOMVIEW_PAGINATION__PAGE_SIZE", "25");
            jail.set_env("ROOMVIEW_MOCK__LATENCY_MS", "0");

            let config = load_config(Path::new("roomview.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.pagination.page_size, 25);
            assert_eq!(config.mock.latency_ms, 0);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ROOMVIEW_MOCK__ROOM_COUNT", "25");
            jail.set_env("ROOMVIEW_MOCK__SEED", "42");

            let config = load_config_from_env().map_err(|e| e.to_string())?;
            assert_eq!(config.mock.room_count, 25);
            assert_eq!(config.mock.seed, Some(42));
            assert_eq!(config.pagination.page_size, 10);
            Ok(())
        });
    }
}
