use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct FormatSettings {
    /// Slime format revision to write (1, 2 or 3).
    pub version: u8,
    /// Whether the entity block is written at all (on versions that carry
    /// one).
    pub entities: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CompressionSettings {
    /// Zlib level, 0-9.
    pub level: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub format: FormatSettings,
    pub compression: CompressionSettings,
}

impl Settings {
    pub fn config_builder() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(
            include_str!("settings_default.toml"),
            FileFormat::Toml,
        ))
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Settings> {
        Ok(Settings {
            format: config.get("format")?,
            compression: config.get("compression")?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            format: FormatSettings {
                version: 3,
                entities: true,
            },
            compression: CompressionSettings { level: 6 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config = Settings::config_builder().build().unwrap();
        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.format.version, Settings::default().format.version);
        assert_eq!(settings.format.entities, true);
        assert!(settings.compression.level <= 9);
    }
}
