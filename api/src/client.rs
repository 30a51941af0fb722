use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use serde::de::DeserializeOwned;

use recap_common::{HtmlResponse, RecapManifest, RecapPeriod, SiteEvent, SlideFragment};

use crate::error::{ApiError, ApiResult};

pub const CSRF_HEADER: &str = "X-CSRFToken";

/// HTTP client for the recap backend.
#[derive(Clone)]
pub struct RecapHttpClient {
    http: reqwest::Client,
    base_url: String,
    csrf_token: Option<String>,
    session_cookie: Option<String>,
}

impl RecapHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            csrf_token: None,
            session_cookie: None,
        }
    }

    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_session_cookie(mut self, cookie: Option<String>) -> Self {
        self.session_cookie = cookie.filter(|c| !c.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.csrf_token {
            if let Ok(v) = HeaderValue::from_str(token) {
                headers.insert(CSRF_HEADER, v);
            }
        }
        if let Some(cookie) = &self.session_cookie {
            if let Ok(v) = HeaderValue::from_str(&format!("sessionid={cookie}")) {
                headers.insert(COOKIE, v);
            }
        }
        headers
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        tracing::debug!("GET {url}");
        let resp = self
            .http
            .get(&url)
            .headers(self.headers())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn fetch_manifest(&self, period: &RecapPeriod) -> ApiResult<RecapManifest> {
        self.get_json(&paths::recap(period)).await
    }

    pub async fn fetch_slide(&self, period: &RecapPeriod, slide_type: &str) -> ApiResult<SlideFragment> {
        self.get_json(&paths::slide(period, slide_type)).await
    }

    pub async fn fetch_html(&self, path: &str) -> ApiResult<String> {
        let body: HtmlResponse = self.get_json(path).await?;
        Ok(body.html)
    }

    /// Fetches a server-rendered PNG. The request carries the CSRF header.
    pub async fn fetch_png(&self, path: &str, theme: &str) -> ApiResult<Vec<u8>> {
        let url = self.url(path);
        tracing::debug!("GET {url} theme={theme}");
        let resp = self
            .http
            .get(&url)
            .headers(self.headers())
            .query(&[("theme", theme)])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyBody);
        }
        Ok(bytes.to_vec())
    }

    pub async fn track(&self, event: &SiteEvent) -> ApiResult<()> {
        let url = self.url(paths::TRACK_EVENT);
        let resp = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(event)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        Ok(())
    }
}

/// Backend paths, relative to the base url.
pub mod paths {
    use recap_common::RecapPeriod;

    pub const TRACK_EVENT: &str = "/api/v1/tracking/site-event/";

    pub fn recap(period: &RecapPeriod) -> String {
        format!("/api/v1/recap/{}/{}/", period.year, period.month)
    }

    pub fn slide(period: &RecapPeriod, slide_type: &str) -> String {
        format!("/api/v1/recap/{}/{}/slide/{}/", period.year, period.month, slide_type)
    }

    pub fn recap_card_html(period: &RecapPeriod) -> String {
        format!("/api/v1/recap/{}/{}/html/", period.year, period.month)
    }

    pub fn recap_card_png(period: &RecapPeriod) -> String {
        format!("/api/v1/recap/{}/{}/image/", period.year, period.month)
    }

    pub fn notification_card_html(id: u64) -> String {
        format!("/api/v1/notifications/{id}/share-html/")
    }

    pub fn notification_card_png(id: u64) -> String {
        format!("/api/v1/notifications/{id}/share-image/png/")
    }

    pub fn challenge_card_html(id: u64) -> String {
        format!("/api/v1/challenges/{id}/share-html/")
    }

    pub fn challenge_card_png(id: u64) -> String {
        format!("/api/v1/challenges/{id}/share-image/png/")
    }
}
