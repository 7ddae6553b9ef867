use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use kdl::KdlDocument;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
pub const CONFIG_FILE_NAME: &str = "revu.kdl";

const ENV_BASE_URL: &str = "REVU_BASE_URL";
const ENV_REFRESH_INTERVAL: &str = "REVU_REFRESH_INTERVAL";
const ENV_TIMEZONE: &str = "REVU_TIMEZONE";
const ENV_CONFIG_HOME: &str = "REVU_CONFIG_HOME";

/// Which clock review timestamps are shown in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayZone {
    #[default]
    Local,
    Utc,
}

impl FromStr for DisplayZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            other => Err(format!("expected `local` or `utc`, got `{other}`")),
        }
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Utc => f.write_str("utc"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerConfig {
    pub base_url: String,
    pub refresh_interval: Duration,
    pub timezone: DisplayZone,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            timezone: DisplayZone::default(),
        }
    }
}

impl ViewerConfig {
    /// Layers the config file, then the environment, then `overrides` on top
    /// of the defaults. Broken layers are logged and skipped.
    pub fn load(config_file: Option<&Path>, overrides: PartialViewerConfig) -> Self {
        let mut partial = PartialViewerConfig::default();

        match config_file.map(Path::to_path_buf).or_else(default_config_file) {
            Some(path) => {
                if let Err(e) = partial.set_from_config_file(&path) {
                    tracing::warn!("failed to read config from file: {e}");
                }
            }
            None => tracing::warn!("no config directory could be determined"),
        }

        if let Err(e) = partial.set_from_env() {
            tracing::warn!("failed to read config from env: {e}");
        }

        partial.merge(overrides);

        let config = partial.build();
        tracing::debug!("resolved config: {:?}", config);

        config
    }
}

/// One configuration layer; unset fields fall through to the layer below.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialViewerConfig {
    pub base_url: Option<String>,
    pub refresh_interval: Option<u64>,
    pub timezone: Option<DisplayZone>,
}

impl PartialViewerConfig {
    pub fn merge(&mut self, upper: PartialViewerConfig) {
        if let Some(base_url) = upper.base_url {
            self.base_url = Some(base_url);
        }
        if let Some(refresh_interval) = upper.refresh_interval {
            self.refresh_interval = Some(refresh_interval);
        }
        if let Some(timezone) = upper.timezone {
            self.timezone = Some(timezone);
        }
    }

    pub fn build(self) -> ViewerConfig {
        let defaults = ViewerConfig::default();

        ViewerConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            refresh_interval: self
                .refresh_interval
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            timezone: self.timezone.unwrap_or(defaults.timezone),
        }
    }
}

pub fn parse_refresh_interval(raw: &str) -> Result<u64, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err("refresh interval must be at least 1 second".into()),
        Ok(secs) => Ok(secs),
        Err(e) => Err(format!("expected a number of seconds: {e}")),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EnvError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub trait Env {
    fn set_from_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), EnvError>;

    fn set_from_env(&mut self) -> Result<(), EnvError> {
        self.set_from_vars(|key| std::env::var(key).ok())
    }
}

impl Env for PartialViewerConfig {
    fn set_from_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), EnvError> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = Some(base_url);
        }

        if let Some(value) = lookup(ENV_REFRESH_INTERVAL) {
            let secs = parse_refresh_interval(&value).map_err(|reason| EnvError::Invalid {
                key: ENV_REFRESH_INTERVAL,
                value: value.clone(),
                reason,
            })?;
            self.refresh_interval = Some(secs);
        }

        if let Some(value) = lookup(ENV_TIMEZONE) {
            let zone = value.parse().map_err(|reason| EnvError::Invalid {
                key: ENV_TIMEZONE,
                value: value.clone(),
                reason,
            })?;
            self.timezone = Some(zone);
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse kdl config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: kdl::KdlError,
    },

    #[error("invalid `{key}` in {path}: {reason}")]
    Invalid {
        path: PathBuf,
        key: &'static str,
        reason: String,
    },
}

pub trait ConfigFile {
    fn set_from_config_str(&mut self, content: &str, origin: &Path) -> Result<(), ConfigFileError>;

    fn set_from_config_file(&mut self, config_file: &Path) -> Result<(), ConfigFileError> {
        tracing::trace!("looking for kdl config at: {}", config_file.display());

        let content =
            std::fs::read_to_string(config_file).map_err(|source| ConfigFileError::Read {
                path: config_file.to_path_buf(),
                source,
            })?;

        self.set_from_config_str(&content, config_file)
    }
}

impl ConfigFile for PartialViewerConfig {
    fn set_from_config_str(&mut self, content: &str, origin: &Path) -> Result<(), ConfigFileError> {
        let doc: KdlDocument = content.parse().map_err(|source| ConfigFileError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        let Some(config) = doc.get("config").and_then(|c| c.children()) else {
            tracing::debug!("no config block in {}", origin.display());
            return Ok(());
        };

        let invalid = |key: &'static str, reason: String| ConfigFileError::Invalid {
            path: origin.to_path_buf(),
            key,
            reason,
        };

        let value = |key: &str| {
            config
                .get(key)
                .and_then(|node| node.entries().first())
                .map(|entry| entry.value())
        };

        if let Some(item) = value("base_url") {
            let base_url = item
                .as_string()
                .ok_or_else(|| invalid("base_url", format!("expected a string, got {item}")))?;
            self.base_url = Some(base_url.to_string());
        }

        if let Some(item) = value("refresh_interval") {
            let secs = match item.as_i64() {
                Some(secs) if secs > 0 => secs as u64,
                _ => {
                    return Err(invalid(
                        "refresh_interval",
                        format!("expected a positive number of seconds, got {item}"),
                    ))
                }
            };
            self.refresh_interval = Some(secs);
        }

        if let Some(item) = value("timezone") {
            let zone = item
                .as_string()
                .ok_or_else(|| format!("expected a string, got {item}"))
                .and_then(str::parse)
                .map_err(|reason| invalid("timezone", reason))?;
            self.timezone = Some(zone);
        }

        Ok(())
    }
}

pub fn config_home() -> Option<PathBuf> {
    std::env::var(ENV_CONFIG_HOME)
        .map(PathBuf::from)
        .ok()
        .or_else(|| {
            directories::ProjectDirs::from("io", "revu", "revu")
                .map(|project| project.config_dir().to_path_buf())
        })
}

pub fn default_config_file() -> Option<PathBuf> {
    config_home().map(|home| home.join(CONFIG_FILE_NAME))
}

/// The document `revu init` writes.
pub fn default_document() -> String {
    let defaults = ViewerConfig::default();

    format!(
        "config {{\n    base_url \"{}\"\n    refresh_interval {}\n    timezone \"{}\"\n}}\n",
        defaults.base_url,
        defaults.refresh_interval.as_secs(),
        defaults.timezone,
    )
}

#[cfg(test)]
mod test {
    use std::{collections::HashMap, path::Path, time::Duration};

    use super::*;

    #[test]
    fn test_defaults() {
        let config = PartialViewerConfig::default().build();

        assert_eq!("http://localhost:8000", config.base_url);
        assert_eq!(Duration::from_secs(10), config.refresh_interval);
        assert_eq!(DisplayZone::Local, config.timezone);
    }

    #[test]
    fn test_reads_kdl_config_block() -> anyhow::Result<()> {
        let mut partial = PartialViewerConfig::default();

        partial.set_from_config_str(
            r#"
            config {
                base_url "http://reviews.internal:9000"
                refresh_interval 30
                timezone "utc"
            }
            "#,
            Path::new("revu.kdl"),
        )?;

        assert_eq!(
            PartialViewerConfig {
                base_url: Some("http://reviews.internal:9000".into()),
                refresh_interval: Some(30),
                timezone: Some(DisplayZone::Utc),
            },
            partial
        );

        Ok(())
    }

    #[test]
    fn test_default_document_round_trips() -> anyhow::Result<()> {
        let mut partial = PartialViewerConfig::default();
        partial.set_from_config_str(&default_document(), Path::new("revu.kdl"))?;

        assert_eq!(ViewerConfig::default(), partial.build());

        Ok(())
    }

    #[test]
    fn test_rejects_zero_refresh_interval_in_file() {
        let mut partial = PartialViewerConfig::default();

        let err = partial
            .set_from_config_str("config { refresh_interval 0; }", Path::new("revu.kdl"))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigFileError::Invalid {
                key: "refresh_interval",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let mut partial = PartialViewerConfig::default();

        let err = partial
            .set_from_config_file(Path::new("/nonexistent/revu/revu.kdl"))
            .unwrap_err();

        assert!(matches!(err, ConfigFileError::Read { .. }));
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() -> anyhow::Result<()> {
        let mut partial = PartialViewerConfig::default();
        partial.set_from_config_str(
            r#"config { base_url "http://file:1"; timezone "local"; }"#,
            Path::new("revu.kdl"),
        )?;

        let vars = HashMap::from([
            ("REVU_BASE_URL", "http://env:2"),
            ("REVU_TIMEZONE", "UTC"),
        ]);
        partial.set_from_vars(|key| vars.get(key).map(|v| v.to_string()))?;

        partial.merge(PartialViewerConfig {
            base_url: Some("http://cli:3".into()),
            ..Default::default()
        });

        let config = partial.build();
        assert_eq!("http://cli:3", config.base_url);
        assert_eq!(DisplayZone::Utc, config.timezone);

        Ok(())
    }

    #[test]
    fn test_invalid_env_interval() {
        let mut partial = PartialViewerConfig::default();

        let err = partial
            .set_from_vars(|key| (key == "REVU_REFRESH_INTERVAL").then(|| "soon".to_string()))
            .unwrap_err();

        assert!(err.to_string().contains("REVU_REFRESH_INTERVAL"));
        assert_eq!(None, partial.refresh_interval);
    }
}
