use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use recap_api::{paths, ApiResult};
use recap_common::{RecapPeriod, SiteEvent};
use recap_protocol::{Event, ToastLevel};

use crate::analytics;
use crate::client::RecapApi;
use crate::error::Result;
use crate::services::{EventSender, Services};

pub const DOWNLOAD_LABEL: &str = "Download Image";
pub const BUSY_LABEL: &str = "Generating...";

/// Where a share card comes from. One orchestrator serves every kind of card.
#[async_trait]
pub trait CardDataSource: Send + Sync {
    fn html_endpoint(&self) -> String;

    fn png_endpoint(&self) -> String;

    fn filename(&self) -> String;

    /// Analytics event sent after a successful download.
    fn download_event(&self) -> Option<SiteEvent> {
        None
    }

    async fn fetch_card_html(&self, api: &dyn RecapApi) -> ApiResult<String> {
        api.fetch_html(&self.html_endpoint()).await
    }
}

pub struct RecapCard {
    pub period: RecapPeriod,
}

#[async_trait]
impl CardDataSource for RecapCard {
    fn html_endpoint(&self) -> String {
        paths::recap_card_html(&self.period)
    }

    fn png_endpoint(&self) -> String {
        paths::recap_card_png(&self.period)
    }

    fn filename(&self) -> String {
        format!("monthly-recap-{}.png", self.period)
    }

    fn download_event(&self) -> Option<SiteEvent> {
        Some(SiteEvent::image_download(&self.period))
    }
}

pub struct NotificationCard {
    pub notification_id: u64,
}

#[async_trait]
impl CardDataSource for NotificationCard {
    fn html_endpoint(&self) -> String {
        paths::notification_card_html(self.notification_id)
    }

    fn png_endpoint(&self) -> String {
        paths::notification_card_png(self.notification_id)
    }

    fn filename(&self) -> String {
        format!("platinum-{}.png", self.notification_id)
    }
}

pub struct ChallengeCard {
    pub challenge_id: u64,
}

#[async_trait]
impl CardDataSource for ChallengeCard {
    fn html_endpoint(&self) -> String {
        paths::challenge_card_html(self.challenge_id)
    }

    fn png_endpoint(&self) -> String {
        paths::challenge_card_png(self.challenge_id)
    }

    fn filename(&self) -> String {
        format!("challenge-{}.png", self.challenge_id)
    }
}

/// Disables the download control while alive and restores it on drop,
/// whichever way the download ends.
struct BusyGuard {
    sink: Option<EventSender>,
}

impl BusyGuard {
    fn engage(sink: Option<EventSender>) -> Self {
        if let Some(tx) = &sink {
            let _ = tx.send(Event::DownloadControl { busy: true, label: BUSY_LABEL.to_string() });
        }
        Self { sink }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if let Some(tx) = &self.sink {
            let _ = tx.send(Event::DownloadControl { busy: false, label: DOWNLOAD_LABEL.to_string() });
        }
    }
}

/// Fetches share-card previews and downloads rendered PNGs.
pub struct ShareOrchestrator {
    services: Services,
    source: Arc<dyn CardDataSource>,
    download_dir: PathBuf,
}

impl ShareOrchestrator {
    pub fn new(services: Services, source: Arc<dyn CardDataSource>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            services,
            source,
            download_dir: download_dir.into(),
        }
    }

    pub async fn load_preview(&self) -> ApiResult<String> {
        self.source.fetch_card_html(self.services.api.as_ref()).await
    }

    /// Downloads the card for `theme`. Failures are reported through the toaster;
    /// the control is re-enabled on every path.
    pub async fn download(&self, theme: &str, sink: Option<EventSender>) -> Option<PathBuf> {
        let _busy = BusyGuard::engage(sink.clone());

        match self.save_png(theme).await {
            Ok(path) => {
                tracing::info!("saved share image to {}", path.display());
                self.services.toaster.show(ToastLevel::Success, "Image downloaded!");
                if let Some(tx) = &sink {
                    let _ = tx.send(Event::DownloadSaved { path: path.clone() });
                }
                if let Some(event) = self.source.download_event() {
                    analytics::ping(Arc::clone(&self.services.api), event);
                }
                Some(path)
            }
            Err(e) => {
                tracing::warn!("share image download failed: {e}");
                self.services
                    .toaster
                    .show(ToastLevel::Error, "Failed to generate image. Please try again.");
                None
            }
        }
    }

    async fn save_png(&self, theme: &str) -> Result<PathBuf> {
        let bytes = self
            .services
            .api
            .fetch_png(&self.source.png_endpoint(), theme)
            .await?;
        write_transient(&self.download_dir, &self.source.filename(), &bytes).await
    }
}

/// Writes into a `.part` file first and renames it into place.
async fn write_transient(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(filename);
    let part = dir.join(format!("{filename}.part"));
    tokio::fs::write(&part, bytes).await?;
    if let Err(e) = tokio::fs::rename(&part, &target).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e.into());
    }
    Ok(target)
}
