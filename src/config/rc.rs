use crate::document_model::{DEFAULT_PREFIX_LEN, Locator, SpanMode};
use crossterm::style::Color;
use log::{debug, warn};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const RC_FILE_NAME: &str = ".anchorrc";
const MAX_PREFIX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct RcConfig {
    pub prefix_len: usize,
    pub span_mode: SpanMode,
    pub default_category: String,
    pub emphasis: bool,
    pub flash_color: Color,
    pub pin_color: Color,
    pub emphasis_color: Color,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_PREFIX_LEN,
            span_mode: SpanMode::Corrected,
            default_category: "highlight".to_string(),
            emphasis: true,
            flash_color: Color::Yellow,
            pin_color: Color::Cyan,
            emphasis_color: Color::Magenta,
        }
    }
}

impl RcConfig {
    pub fn locator(&self) -> Locator {
        Locator::new()
            .with_prefix_len(self.prefix_len)
            .with_span_mode(self.span_mode)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct RcLoader;

impl RcLoader {
    /// Get the path to the RC file
    /// Looks for .anchorrc in:
    /// 1. Current directory
    /// 2. Home directory (~/.anchorrc)
    pub fn get_rc_path() -> Option<PathBuf> {
        let current_rc = Path::new(RC_FILE_NAME);
        if current_rc.exists() {
            return Some(current_rc.to_path_buf());
        }

        if let Ok(home) = env::var("HOME") {
            let home_rc = Path::new(&home).join(RC_FILE_NAME);
            if home_rc.exists() {
                return Some(home_rc);
            }
        }

        None
    }

    /// Load the RC file from the default locations, falling back to defaults
    pub fn load_config() -> RcConfig {
        let Some(rc_path) = Self::get_rc_path() else {
            return RcConfig::default();
        };

        match Self::load_from_path(&rc_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e}; using default settings");
                RcConfig::default()
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<RcConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loading settings from {}", path.display());

        let mut config = RcConfig::default();
        Self::parse_config_content(&content, &mut config);
        Ok(config)
    }

    fn parse_config_content(content: &str, config: &mut RcConfig) {
        for line in content.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with('"') {
                continue;
            }

            Self::parse_config_line(line, config);
        }
    }

    fn parse_config_line(line: &str, config: &mut RcConfig) {
        // Remove inline comments
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();
        let line = line.strip_prefix("set ").unwrap_or(line).trim();

        let Some((key, value)) = line.split_once('=') else {
            // Bare flags, vim style
            match line {
                "emphasis" => config.emphasis = true,
                "noemphasis" => config.emphasis = false,
                _ => debug!("ignoring setting {line:?}"),
            }
            return;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "prefix_len" | "prefixlen" => {
                if let Ok(prefix_len) = value.parse::<usize>() {
                    if (1..=MAX_PREFIX_LEN).contains(&prefix_len) {
                        config.prefix_len = prefix_len;
                    }
                }
            }
            "span" | "span_mode" => {
                if let Some(mode) = SpanMode::parse(value) {
                    config.span_mode = mode;
                }
            }
            "category" | "default_category" => {
                if !value.is_empty() {
                    config.default_category = value.to_string();
                }
            }
            "emphasis" => config.emphasis = value == "true" || value == "1" || value == "yes",
            "flash_color" => Self::parse_color(value, &mut config.flash_color),
            "pin_color" => Self::parse_color(value, &mut config.pin_color),
            "emphasis_color" => Self::parse_color(value, &mut config.emphasis_color),
            _ => debug!("ignoring unknown setting {key:?}"),
        }
    }

    fn parse_color(value: &str, slot: &mut Color) {
        if let Ok(color) = Color::try_from(value) {
            *slot = color;
        }
    }

    /// Generate a sample RC file content
    pub fn generate_sample_rc() -> String {
        r#"# quote-anchor configuration file (.anchorrc)
# Lines starting with # or " are comments

# Matching
set prefix_len=50      # characters kept when a quote's tail has drifted
set span=corrected     # corrected or legacy raw span derivation

# Highlights
set category=highlight # category used when a request names none
set emphasis           # emphasise revealed highlights (or set noemphasis)

# Colours (crossterm colour names)
flash_color=yellow
pin_color=cyan
emphasis_color=magenta
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_vim_style_config() {
        let mut config = RcConfig::default();
        let content = r#"
            set prefix_len=40
            set span=legacy
            set category=evidence
            set noemphasis
        "#;

        RcLoader::parse_config_content(content, &mut config);

        assert_eq!(config.prefix_len, 40);
        assert_eq!(config.span_mode, SpanMode::Legacy);
        assert_eq!(config.default_category, "evidence");
        assert!(!config.emphasis);
    }

    #[test]
    fn test_parse_key_value_config_with_comments() {
        let mut config = RcConfig::default();
        let content = r#"
            # This is a comment
            " This is also a comment
            prefix_len=64          # longer prefix
            emphasis=no
            flash_color=green
            pin_color=dark_blue
        "#;

        RcLoader::parse_config_content(content, &mut config);

        assert_eq!(config.prefix_len, 64);
        assert!(!config.emphasis);
        assert_eq!(config.flash_color, Color::Green);
        assert_eq!(config.pin_color, Color::DarkBlue);
        assert_eq!(config.emphasis_color, Color::Magenta);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let mut config = RcConfig::default();
        let content = r#"
            set prefix_len=0
            prefix_len=100000
            prefix_len=many
            span=fuzzy
            category=
            flash_color=not-a-colour
            unknown_setting=value
        "#;

        RcLoader::parse_config_content(content, &mut config);

        assert_eq!(config, RcConfig::default());
    }

    #[test]
    fn test_sample_rc_parses() {
        let mut config = RcConfig::default();
        RcLoader::parse_config_content(&RcLoader::generate_sample_rc(), &mut config);
        assert_eq!(config, RcConfig::default());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "set span=legacy").unwrap();
        writeln!(file, "prefix_len=12").unwrap();

        let config = RcLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.span_mode, SpanMode::Legacy);
        assert_eq!(config.prefix_len, 12);

        let locator = config.locator();
        assert_eq!(locator.prefix_len, 12);
        assert_eq!(locator.span_mode, SpanMode::Legacy);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.anchorrc");
        assert!(matches!(
            RcLoader::load_from_path(&missing),
            Err(ConfigError::Read { .. })
        ));
    }
}
