use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;

use recap_api::{ApiError, ApiResult, RecapHttpClient};
use recap_common::quiz::{QuizMode, QuizOption, QuizSpec};
use recap_common::{RecapManifest, RecapPeriod, SiteEvent, Slide, SlideFragment, ThemeStyle};

use crate::config::Config;

/// Backend calls the engine depends on. Every call returns the same `ApiResult`.
#[async_trait]
pub trait RecapApi: Send + Sync {
    async fn fetch_manifest(&self, period: &RecapPeriod) -> ApiResult<RecapManifest>;
    async fn fetch_slide(&self, period: &RecapPeriod, slide_type: &str) -> ApiResult<SlideFragment>;
    async fn fetch_html(&self, path: &str) -> ApiResult<String>;
    async fn fetch_png(&self, path: &str, theme: &str) -> ApiResult<Vec<u8>>;
    async fn track(&self, event: &SiteEvent) -> ApiResult<()>;
}

/// Adapter to wrap RecapHttpClient into RecapApi
pub struct HttpAdapter {
    inner: RecapHttpClient,
}

impl HttpAdapter {
    pub fn new(inner: RecapHttpClient) -> Self {
        Self { inner }
    }

    pub fn from_config(config: &Config) -> Self {
        let inner = RecapHttpClient::new(config.base_url.clone())
            .with_csrf_token(config.csrf_token.clone())
            .with_session_cookie(config.session_cookie.clone());
        Self { inner }
    }
}

#[async_trait]
impl RecapApi for HttpAdapter {
    async fn fetch_manifest(&self, period: &RecapPeriod) -> ApiResult<RecapManifest> {
        self.inner.fetch_manifest(period).await
    }

    async fn fetch_slide(&self, period: &RecapPeriod, slide_type: &str) -> ApiResult<SlideFragment> {
        self.inner.fetch_slide(period, slide_type).await
    }

    async fn fetch_html(&self, path: &str) -> ApiResult<String> {
        self.inner.fetch_html(path).await
    }

    async fn fetch_png(&self, path: &str, theme: &str) -> ApiResult<Vec<u8>> {
        self.inner.fetch_png(path, theme).await
    }

    async fn track(&self, event: &SiteEvent) -> ApiResult<()> {
        self.inner.track(event).await
    }
}

/// Offline client serving a canned deck. Used by `--offline` and in tests.
pub struct StubClient;

pub const STUB_SLIDES: &[&str] = &[
    "intro",
    "total_trophies",
    "quiz_total_trophies",
    "platinums",
    "quiz_rarest_trophy",
    "activity_calendar",
    "summary",
];

/// 1x1 transparent PNG.
pub const STUB_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

impl StubClient {
    fn themes() -> BTreeMap<String, ThemeStyle> {
        let mut themes = BTreeMap::new();
        themes.insert("default".to_string(), ThemeStyle::fallback());
        themes.insert(
            "sunset".to_string(),
            ThemeStyle {
                name: "Sunset".to_string(),
                background: "linear-gradient(135deg, #ff7e5f 0%, #feb47b 100%)".to_string(),
                banner_background: Some("#ff7e5f".to_string()),
                accent_color: Some("#fff3e0".to_string()),
            },
        );
        themes.insert(
            "emerald".to_string(),
            ThemeStyle {
                name: "Emerald".to_string(),
                background: "linear-gradient(135deg, #134e5e 0%, #71b280 100%)".to_string(),
                banner_background: None,
                accent_color: Some("#d4fc79".to_string()),
            },
        );
        themes
    }

    fn fragment(period: &RecapPeriod, slide_type: &str) -> Option<SlideFragment> {
        let html = |body: String| format!("<section class=\"recap-slide recap-{slide_type}\">{body}</section>");
        let fragment = match slide_type {
            "intro" => SlideFragment {
                html: html(format!("<h1>Your {period} Recap</h1><p>Let's look back at your month.</p>")),
                quiz: None,
            },
            "total_trophies" => SlideFragment {
                html: html("<h2>Trophies earned</h2><p class=\"big\" data-count-up>+1,234</p>".to_string()),
                quiz: None,
            },
            "quiz_total_trophies" => SlideFragment {
                html: html("<h2>How many platinums did you earn?</h2>".to_string()),
                quiz: Some(QuizSpec {
                    mode: QuizMode::Single,
                    options: [1, 2, 3]
                        .iter()
                        .map(|n| QuizOption { value: json!(n.to_string()), label: n.to_string() })
                        .collect(),
                    correct: vec![json!(2)],
                }),
            },
            "platinums" => SlideFragment {
                html: html("<h2>Platinums</h2><p data-count-up>2 platinums</p>".to_string()),
                quiz: None,
            },
            "quiz_rarest_trophy" => SlideFragment {
                html: html("<h2>Which of these games did you play?</h2>".to_string()),
                quiz: Some(QuizSpec {
                    mode: QuizMode::Multi,
                    options: ["Astro Bot", "Elden Ring", "Hades", "Tetris"]
                        .iter()
                        .map(|g| QuizOption { value: json!(g), label: g.to_string() })
                        .collect(),
                    correct: vec![json!("Astro Bot"), json!("Hades")],
                }),
            },
            "activity_calendar" => SlideFragment {
                html: html("<h2>Most active day</h2><p data-count-up>57 trophies</p>".to_string()),
                quiz: None,
            },
            "summary" => SlideFragment {
                html: html("<h2>That's a wrap!</h2><p>Share your recap.</p>".to_string()),
                quiz: None,
            },
            _ => return None,
        };
        Some(fragment)
    }
}

#[async_trait]
impl RecapApi for StubClient {
    async fn fetch_manifest(&self, _period: &RecapPeriod) -> ApiResult<RecapManifest> {
        Ok(RecapManifest {
            slides: STUB_SLIDES.iter().map(|t| Slide::new(*t)).collect(),
            themes: Self::themes(),
        })
    }

    async fn fetch_slide(&self, period: &RecapPeriod, slide_type: &str) -> ApiResult<SlideFragment> {
        Self::fragment(period, slide_type).ok_or_else(|| ApiError::Status {
            status: 404,
            body: format!("unknown slide type {slide_type}"),
        })
    }

    async fn fetch_html(&self, path: &str) -> ApiResult<String> {
        Ok(format!("<div class=\"share-card\" data-source=\"{path}\"><h1>Monthly Recap</h1></div>"))
    }

    async fn fetch_png(&self, _path: &str, _theme: &str) -> ApiResult<Vec<u8>> {
        Ok(STUB_PNG.to_vec())
    }

    async fn track(&self, _event: &SiteEvent) -> ApiResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_serves_every_manifest_slide() {
        let period = RecapPeriod::new(2026, 9).unwrap();
        let manifest = StubClient.fetch_manifest(&period).await.unwrap();
        assert_eq!(manifest.slides.len(), STUB_SLIDES.len());
        for slide in &manifest.slides {
            assert!(StubClient.fetch_slide(&period, &slide.slide_type).await.is_ok());
        }
        assert!(StubClient.fetch_slide(&period, "nope").await.is_err());
    }

    #[tokio::test]
    async fn stub_png_has_signature() {
        let bytes = StubClient.fetch_png("/x", "default").await.unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }
}
