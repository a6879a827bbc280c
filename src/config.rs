use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{WifiOptError, WifiOptResult};
use crate::source::{
    FallbackSource, JsonFileSource, NetworkSource, ProfilerSource, DEFAULT_PROFILER_ARGS,
    DEFAULT_PROFILER_COMMAND,
};

pub const DEFAULT_CONFIG_PATH: &str = "wifiopt.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiOptConfig {
    pub source: SourceConfig,
    pub watch: WatchConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl WifiOptConfig {
    pub async fn load(path: Option<&Path>) -> WifiOptResult<Self> {
        let config_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        if config_path.exists() {
            let content = tokio::fs::read_to_string(config_path).await?;
            let config: WifiOptConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            info!("No configuration file found, using defaults");
            Ok(WifiOptConfig::default())
        }
    }

    pub async fn save(&self, path: Option<&Path>) -> WifiOptResult<()> {
        let config_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(config_path, content).await?;

        Ok(())
    }

    pub fn validate(&self) -> WifiOptResult<()> {
        if self.watch.interval_seconds == 0 {
            return Err(WifiOptError::Configuration(
                "watch.interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.source.kind == SourceKind::Json && self.source.snapshot_path.is_none() {
            return Err(WifiOptError::Configuration(
                "source.kind = \"json\" requires source.snapshot_path".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WifiOptConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            watch: WatchConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Json,
    Profiler,
    /// system_profiler first, snapshot file when it yields nothing.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub snapshot_path: Option<PathBuf>,
    pub profiler_command: PathBuf,
    pub profiler_args: Vec<String>,
}

impl SourceConfig {
    pub fn build(&self) -> WifiOptResult<Box<dyn NetworkSource + Send + Sync>> {
        let profiler = || {
            Box::new(ProfilerSource::command(
                self.profiler_command.clone(),
                self.profiler_args.clone(),
            ))
        };

        match (self.kind, &self.snapshot_path) {
            (SourceKind::Json, Some(path)) => Ok(Box::new(JsonFileSource::new(path.clone()))),
            (SourceKind::Json, None) => Err(WifiOptError::Configuration(
                "json source needs a snapshot_path".to_string(),
            )),
            (SourceKind::Profiler, _) | (SourceKind::Auto, None) => Ok(profiler()),
            (SourceKind::Auto, Some(path)) => Ok(Box::new(FallbackSource::new(
                profiler(),
                Box::new(JsonFileSource::new(path.clone())),
            ))),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Profiler,
            snapshot_path: None,
            profiler_command: PathBuf::from(DEFAULT_PROFILER_COMMAND),
            profiler_args: DEFAULT_PROFILER_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_seconds: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_seconds: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wifiopt-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = WifiOptConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.watch.interval_seconds, 3);
        assert_eq!(config.source.kind, SourceKind::Profiler);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = WifiOptConfig::default();
        config.watch.interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = WifiOptConfig::default();
        config.source.kind = SourceKind::Json;
        assert!(config.validate().is_err());
        assert!(config.source.build().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: WifiOptConfig = toml::from_str(
            "[source]\nkind = \"auto\"\nsnapshot_path = \"scan.json\"\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();
        assert_eq!(config.source.kind, SourceKind::Auto);
        assert_eq!(config.source.profiler_command, PathBuf::from(DEFAULT_PROFILER_COMMAND));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.source.build().unwrap().name(), "fallback");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let path = temp_path("config.toml");
        let mut config = WifiOptConfig::default();
        config.watch.interval_seconds = 10;
        config.source.snapshot_path = Some(PathBuf::from("/tmp/scan.json"));

        config.save(Some(path.as_path())).await.unwrap();
        let loaded = WifiOptConfig::load(Some(path.as_path())).await.unwrap();
        assert_eq!(loaded, config);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let loaded = WifiOptConfig::load(Some(temp_path("absent.toml").as_path())).await.unwrap();
        assert_eq!(loaded, WifiOptConfig::default());
    }
}
