use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use super::error::ConfigError;
use super::image_io::DEFAULT_CHANNEL;

/// Front-end settings loaded from a TOML or JSON file.
///
/// Missing fields fall back to their defaults; command-line flags override
/// whatever the file sets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub channel: usize,
    pub default_rank: usize,
    /// Upper bound on user-selected ranks, on top of `min(rows, cols)`.
    pub max_rank: usize,
    pub output_dir: PathBuf,
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL,
            default_rank: 50,
            max_rank: 200,
            output_dir: PathBuf::from("out"),
            cache_capacity: 16,
        }
    }
}

impl Config {
    /// Load configuration from the given path. `.json` files are parsed as
    /// JSON, anything else as TOML.
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: Config = if path.ends_with(".json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel > 2 {
            return Err(ConfigError::Value(format!(
                "channel must be 0, 1 or 2, got {}",
                self.channel
            )));
        }
        if self.max_rank == 0 {
            return Err(ConfigError::Value("max_rank must be at least 1".into()));
        }
        if self.default_rank == 0 {
            return Err(ConfigError::Value("default_rank must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_slider() {
        let cfg = Config::default();
        assert_eq!(cfg.channel, 2);
        assert_eq!(cfg.default_rank, 50);
        assert_eq!(cfg.max_rank, 200);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: Config = toml::from_str("max_rank = 80\noutput_dir = \"renders\"").unwrap();
        assert_eq!(cfg.max_rank, 80);
        assert_eq!(cfg.output_dir, PathBuf::from("renders"));
        assert_eq!(cfg.default_rank, 50);
    }

    #[test]
    fn loads_json_file() {
        let path = std::env::temp_dir().join(format!("svd_image_cfg_{}.json", std::process::id()));
        fs::write(&path, r#"{"channel": 0, "cache_capacity": 4}"#).unwrap();
        let cfg = Config::from_path(path.to_str().unwrap()).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(cfg.channel, 0);
        assert_eq!(cfg.cache_capacity, 4);
    }

    #[test]
    fn rejects_bad_values() {
        let path = std::env::temp_dir().join(format!("svd_image_cfg_{}.toml", std::process::id()));
        fs::write(&path, "channel = 5").unwrap();
        let err = Config::from_path(path.to_str().unwrap()).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Value(_)));

        assert!(matches!(
            Config::from_path("/nonexistent/svd-image.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
