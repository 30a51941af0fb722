use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::quiz::QuizSpec;
use crate::theme::ThemeStyle;

/// Year/month pair identifying a recap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecapPeriod {
    pub year: i32,
    pub month: u32,
}

impl RecapPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("month must be between 1 and 12, got {month}");
        }
        Ok(Self { year, month })
    }

    /// `2026-09` style identifier used for analytics object ids.
    pub fn object_id(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for RecapPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(rename = "type")]
    pub slide_type: String,
}

impl Slide {
    pub fn new(slide_type: impl Into<String>) -> Self {
        Self { slide_type: slide_type.into() }
    }
}

/// Rendered content for one slide as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideFragment {
    pub html: String,
    #[serde(default)]
    pub quiz: Option<QuizSpec>,
}

pub const FALLBACK_SLIDE_HTML: &str = "<div class=\"recap-slide-error\">Error loading slide</div>";

impl SlideFragment {
    pub fn fallback() -> Self {
        Self { html: FALLBACK_SLIDE_HTML.to_string(), quiz: None }
    }

    pub fn is_fallback(&self) -> bool {
        self.html == FALLBACK_SLIDE_HTML
    }
}

/// Slide list plus the optional theme table the page ships with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecapManifest {
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub themes: BTreeMap<String, ThemeStyle>,
}

/// Body of an HTML-fragment response (`{"html": "..."}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlResponse {
    pub html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteEvent {
    pub event_type: String,
    pub object_id: String,
}

impl SiteEvent {
    pub fn page_view(period: &RecapPeriod) -> Self {
        Self { event_type: "recap_page_view".to_string(), object_id: period.object_id() }
    }

    pub fn image_download(period: &RecapPeriod) -> Self {
        Self { event_type: "recap_image_download".to_string(), object_id: period.object_id() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rejects_bad_month() {
        assert!(RecapPeriod::new(2026, 0).is_err());
        assert!(RecapPeriod::new(2026, 13).is_err());
        let p = RecapPeriod::new(2026, 9).unwrap();
        assert_eq!(p.to_string(), "2026-09");
    }

    #[test]
    fn manifest_parses_slide_types() {
        let json = r#"{"slides":[{"type":"intro"},{"type":"quiz_total_trophies"}]}"#;
        let manifest: RecapManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.slides[1].slide_type, "quiz_total_trophies");
        assert!(manifest.themes.is_empty());
    }
}
