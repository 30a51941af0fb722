use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use recap_common::ThemeStyle;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub csrf_token: Option<String>,
    pub session_cookie: Option<String>,
    pub reduced_motion: bool,
    /// JSON file holding the gradient theme table, used when the backend ships none.
    pub themes_path: Option<PathBuf>,
    pub download_dir: PathBuf,
    pub log_path: Option<PathBuf>,
    pub slides: SlideRules,
    pub timing: TimingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            csrf_token: None,
            session_cookie: None,
            reduced_motion: false,
            themes_path: None,
            download_dir: PathBuf::from("."),
            log_path: None,
            slides: SlideRules::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// How slide types map onto engine behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SlideRules {
    pub quiz_prefix: String,
    pub celebration_types: Vec<String>,
    pub final_type: String,
}

impl Default for SlideRules {
    fn default() -> Self {
        Self {
            quiz_prefix: "quiz_".to_string(),
            celebration_types: vec!["platinums".to_string(), "summary".to_string()],
            final_type: "summary".to_string(),
        }
    }
}

impl SlideRules {
    pub fn is_quiz(&self, slide_type: &str) -> bool {
        slide_type.starts_with(&self.quiz_prefix)
    }

    pub fn is_celebration(&self, slide_type: &str) -> bool {
        self.celebration_types.iter().any(|t| t == slide_type)
    }

    pub fn is_final(&self, slide_type: &str) -> bool {
        self.final_type == slide_type
    }
}

/// Fixed delays used to choreograph transitions. Single- and multi-select
/// auto-advance delays are independent settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    pub exit_clear_ms: u64,
    pub animation_delay_ms: u64,
    pub count_up_ms: u64,
    pub single_select_advance_ms: u64,
    pub multi_select_advance_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            exit_clear_ms: 500,
            animation_delay_ms: 100,
            count_up_ms: 1500,
            single_select_advance_ms: 2000,
            multi_select_advance_ms: 2500,
        }
    }
}

impl TimingConfig {
    pub fn exit_clear(&self) -> Duration {
        Duration::from_millis(self.exit_clear_ms)
    }

    pub fn animation_delay(&self) -> Duration {
        Duration::from_millis(self.animation_delay_ms)
    }

    pub fn single_select_advance(&self) -> Duration {
        Duration::from_millis(self.single_select_advance_ms)
    }

    pub fn multi_select_advance(&self) -> Duration {
        Duration::from_millis(self.multi_select_advance_ms)
    }
}

impl Config {
    /// Defaults with `RECAP_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Reads `path` as TOML when given, then applies `RECAP_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::from_env());
        };
        let mut config = Self::from_toml(&std::fs::read_to_string(path)?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("RECAP_BASE_URL") {
            self.base_url = url;
        }

        if let Ok(token) = std::env::var("RECAP_CSRF_TOKEN") {
            self.csrf_token = Some(token);
        }

        if let Ok(cookie) = std::env::var("RECAP_SESSION_COOKIE") {
            self.session_cookie = Some(cookie);
        }

        if let Ok(flag) = std::env::var("RECAP_REDUCED_MOTION") {
            self.reduced_motion = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        if let Ok(path) = std::env::var("RECAP_THEMES_PATH") {
            self.themes_path = Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("RECAP_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }

        if let Ok(path) = std::env::var("RECAP_LOG_PATH") {
            self.log_path = Some(PathBuf::from(path));
        }
    }

    /// Theme table from `themes_path`. A missing setting yields an empty map.
    pub fn load_themes(&self) -> Result<BTreeMap<String, ThemeStyle>> {
        match &self.themes_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Ok(BTreeMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            base_url = "https://platpursuit.test"
            reduced_motion = true

            [timing]
            single_select_advance_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://platpursuit.test");
        assert!(config.reduced_motion);
        assert_eq!(config.timing.single_select_advance_ms, 1000);
        assert_eq!(config.timing.multi_select_advance_ms, 2500);
        assert_eq!(config.slides.final_type, "summary");
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.timing.single_select_advance_ms, 2000);
        assert_eq!(config.timing.multi_select_advance_ms, 2500);
        assert_eq!(config.slides.final_type, "summary");
    }

    #[test]
    fn load_reads_the_given_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[timing]\nmulti_select_advance_ms = 900\n").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.timing.multi_select_advance_ms, 900);
        assert_eq!(config.timing.single_select_advance_ms, 2000);
    }

    #[test]
    fn slide_rules_classify_types() {
        let rules = SlideRules::default();
        assert!(rules.is_quiz("quiz_total_trophies"));
        assert!(!rules.is_quiz("total_trophies"));
        assert!(rules.is_celebration("platinums"));
        assert!(rules.is_final("summary"));
    }

    #[test]
    fn loads_theme_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"ocean":{{"name":"Ocean","background":"linear-gradient(#000,#00f)","accentColor":"#0ff"}}}}"##
        )
        .unwrap();
        let config = Config { themes_path: Some(file.path().to_path_buf()), ..Config::default() };
        let themes = config.load_themes().unwrap();
        assert_eq!(themes["ocean"].accent_color.as_deref(), Some("#0ff"));
    }
}
