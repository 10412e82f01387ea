use crate::{muted_error, weak_error};
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Config file location relative to the home directory.
pub const DEFAULT_PATH: &str = ".config/pstalker/config.toml";

#[derive(
    Copy, Clone, PartialEq, Debug, Default, EnumString, Display, IntoStaticStr, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "inspired_github")]
    #[serde(rename = "inspired_github")]
    InspiredGitHub,
    #[default]
    #[strum(serialize = "solarized_dark")]
    SolarizedDark,
    #[strum(serialize = "solarized_light")]
    SolarizedLight,
    #[strum(serialize = "base16_eighties_dark")]
    #[serde(rename = "base16_eighties_dark")]
    Base16EightiesDark,
    #[strum(serialize = "base16_mocha_dark")]
    #[serde(rename = "base16_mocha_dark")]
    Base16MochaDark,
    #[strum(serialize = "base16_ocean_dark")]
    #[serde(rename = "base16_ocean_dark")]
    Base16OceanDark,
    #[strum(serialize = "base16_ocean_light")]
    #[serde(rename = "base16_ocean_light")]
    Base16OceanLight,
}

impl Theme {
    pub fn to_syntect_name(self) -> Option<&'static str> {
        match self {
            Theme::None => None,
            Theme::InspiredGitHub => Some("InspiredGitHub"),
            Theme::SolarizedDark => Some("Solarized (dark)"),
            Theme::SolarizedLight => Some("Solarized (light)"),
            Theme::Base16EightiesDark => Some("base16-eighties.dark"),
            Theme::Base16MochaDark => Some("base16-mocha.dark"),
            Theme::Base16OceanDark => Some("base16-ocean.dark"),
            Theme::Base16OceanLight => Some("base16-ocean.light"),
        }
    }
}

/// Application user interface config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Theme for source code highlighting.
    pub theme: Theme,
    /// Use colors in the terminal output.
    pub colored: bool,
    /// Save command history in a regular file.
    pub save_history: bool,
    /// State lists longer than this are rendered in compact form.
    pub compact_threshold: usize,
    /// Show prompt when a state hits an execution error.
    pub stop_on_error: bool,
    /// Number of lines around the current one in source listings.
    pub source_bounds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            colored: true,
            save_history: false,
            compact_threshold: 3,
            stop_on_error: false,
            source_bounds: 4,
        }
    }
}

impl Config {
    /// Read config from `path`, or from the default location if `path` is `None`.
    ///
    /// A missing or malformed file gives the default configuration.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => home::home_dir().map(|home| home.join(DEFAULT_PATH)),
        };
        path.and_then(|path| Self::read(&path)).unwrap_or_default()
    }

    fn read(path: &PathBuf) -> Option<Self> {
        let data = muted_error!(read_to_string(path))?;
        weak_error!(toml::de::from_str::<Config>(&data))
    }
}

/// Read-only ui configuration (set only once, at debugger start).
static CONFIG: OnceLock<Config> = OnceLock::new();

static DEFAULT: OnceLock<Config> = OnceLock::new();

/// Set initial configuration, return `false` if configuration is already set.
pub fn set(config: Config) -> bool {
    CONFIG.set(config).is_ok()
}

/// Return application ui config, the default one if it was never set.
pub fn current() -> &'static Config {
    CONFIG
        .get()
        .unwrap_or_else(|| DEFAULT.get_or_init(Config::default))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_deserialize_partial_config() {
        let config: Config = toml::de::from_str(
            r#"
            theme = "base16_ocean_dark"
            colored = false
            compact_threshold = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.theme, Theme::Base16OceanDark);
        assert!(!config.colored);
        assert_eq!(config.compact_threshold, 5);
        assert_eq!(config.source_bounds, 4);
        assert!(!config.save_history);
    }

    #[test]
    fn test_theme_names() {
        assert_eq!(Theme::from_str("solarized_light").unwrap(), Theme::SolarizedLight);
        assert_eq!(Theme::InspiredGitHub.to_string(), "inspired_github");
        assert!(Theme::None.to_syntect_name().is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load(Some(Path::new("/nonexistent/pstalker.toml")));
        assert_eq!(config.compact_threshold, 3);
    }
}
