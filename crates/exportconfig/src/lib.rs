use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    #[default]
    Canonical,
    Composition,
}

impl NamingMode {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "canonical" | "fixed" => Ok(Self::Canonical),
            "composition" | "comp" | "name" => Ok(Self::Composition),
            other => Err(format!(
                "unknown naming mode '{other}'; expected canonical or composition"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub frames: FramesSection,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            output: OutputSection::default(),
            frames: FramesSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSection {
    #[serde(default)]
    pub naming: NamingMode,
    #[serde(default = "default_true")]
    pub usage_examples: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            naming: NamingMode::default(),
            usage_examples: true,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FramesSection {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub cleanup: bool,
    #[serde(default = "default_true")]
    pub parallel_decode: bool,
}

impl Default for FramesSection {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            cleanup: false,
            parallel_decode: true,
        }
    }
}

/// Describes a composition rendered elsewhere. Width and height may be left
/// out, in which case callers fall back to the rendered frame size.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompositionFile {
    pub name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(alias = "fps")]
    pub frame_rate: f64,
    #[serde(deserialize_with = "deserialize_duration", serialize_with = "serialize_seconds")]
    pub duration: Duration,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec!["png".to_string()]
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            parse_duration(v).map_err(E::custom)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_seconds<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(value.as_secs_f64())
}

/// Accepts plain seconds (`2`, `2.5`) or a humantime string (`2s 500ms`).
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".to_string());
    }
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds.is_sign_negative() {
            return Err(format!("invalid duration '{trimmed}': must be non-negative"));
        }
        return Duration::try_from_secs_f64(seconds)
            .map_err(|err| format!("invalid duration '{trimmed}': {err}"));
    }
    humantime::parse_duration(trimmed).map_err(|err| format!("invalid duration '{trimmed}': {err}"))
}

impl ExportConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path)?)
    }

    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {} (expected {CONFIG_VERSION})",
                self.version
            )));
        }
        if self.frames.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "frames.extensions must list at least one extension".to_string(),
            ));
        }
        if let Some(ext) = self
            .frames
            .extensions
            .iter()
            .find(|ext| ext.trim_start_matches('.').trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "frames.extensions contains an empty entry '{ext}'"
            )));
        }
        Ok(())
    }
}

impl CompositionFile {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: Self = toml::from_str(raw)?;
        file.validate()?;
        Ok(file)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("composition name must not be empty".to_string()));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "composition '{}' has invalid frame_rate {}",
                self.name, self.frame_rate
            )));
        }
        if matches!(self.width, Some(0)) || matches!(self.height, Some(0)) {
            return Err(ConfigError::Invalid(format!(
                "composition '{}' has zero width or height",
                self.name
            )));
        }
        Ok(())
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ExportConfig::from_toml_str("").unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.output.naming, NamingMode::Canonical);
        assert!(config.output.usage_examples);
        assert_eq!(config.frames.extensions, vec!["png"]);
        assert!(!config.frames.cleanup);
        assert!(config.frames.parallel_decode);
    }

    #[test]
    fn parses_full_config() {
        let raw = r#"
version = 1

[output]
naming = "composition"
usage_examples = false
directory = "exports"

[frames]
extensions = ["png", ".PNG"]
cleanup = true
parallel_decode = false
"#;
        let config = ExportConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.output.naming, NamingMode::Composition);
        assert!(!config.output.usage_examples);
        assert_eq!(config.output.directory, Some(PathBuf::from("exports")));
        assert_eq!(config.frames.extensions.len(), 2);
        assert!(config.frames.cleanup);
        assert!(!config.frames.parallel_decode);
    }

    #[test]
    fn rejects_unknown_version_and_empty_extensions() {
        assert!(matches!(
            ExportConfig::from_toml_str("version = 2"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ExportConfig::from_toml_str("[frames]\nextensions = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ExportConfig::from_toml_str("[output]\nnaming = \"sideways\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn composition_durations_accept_numbers_and_humantime() {
        let numeric = CompositionFile::from_toml_str(
            "name = \"Hero\"\nwidth = 64\nheight = 64\nframe_rate = 24\nduration = 2",
        )
        .unwrap();
        assert_eq!(numeric.duration, Duration::from_secs(2));
        assert_eq!(numeric.frame_rate, 24.0);

        let fractional =
            CompositionFile::from_toml_str("name = \"Hero\"\nfps = 30.0\nduration = 1.5").unwrap();
        assert_eq!(fractional.duration, Duration::from_millis(1500));
        assert_eq!(fractional.width, None);

        let human =
            CompositionFile::from_toml_str("name = \"Hero\"\nfps = 12\nduration = \"2s 500ms\"")
                .unwrap();
        assert_eq!(human.duration, Duration::from_millis(2500));

        assert!(CompositionFile::from_toml_str("name = \"Hero\"\nfps = 12\nduration = -1").is_err());
    }

    #[test]
    fn composition_validation() {
        assert!(matches!(
            CompositionFile::from_toml_str("name = \"Hero\"\nfps = 0\nduration = 1"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CompositionFile::from_toml_str("name = \"\"\nfps = 24\nduration = 1"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CompositionFile::from_toml_str("name = \"A\"\nwidth = 0\nfps = 24\nduration = 1"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn parses_cli_style_durations() {
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("0.25").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1m 5s").unwrap(), Duration::from_secs(65));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-3").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn oversized_durations_are_errors() {
        let err = parse_duration("1e30").unwrap_err();
        assert!(err.contains("invalid duration '1e30'"), "{err}");

        let err = CompositionFile::from_toml_str("name = \"Huge\"\nfps = 24\nduration = 1e30")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
    }

    #[test]
    fn naming_mode_parsing() {
        assert_eq!(NamingMode::parse("Composition").unwrap(), NamingMode::Composition);
        assert_eq!(NamingMode::parse(" canonical ").unwrap(), NamingMode::Canonical);
        assert!(NamingMode::parse("other").is_err());
    }

    #[test]
    fn load_or_default_handles_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        let config = ExportConfig::load_or_default(&path).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);

        fs::write(&path, "[frames]\ncleanup = true\n").unwrap();
        assert!(ExportConfig::load_or_default(&path).unwrap().frames.cleanup);
    }
}
