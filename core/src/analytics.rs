use std::sync::Arc;
use tokio::task::JoinHandle;

use recap_common::SiteEvent;

use crate::client::RecapApi;

/// Fire-and-forget event ping. Failures are logged and never retried.
pub fn ping(api: Arc<dyn RecapApi>, event: SiteEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        match api.track(&event).await {
            Ok(()) => tracing::debug!("tracked {} for {}", event.event_type, event.object_id),
            Err(e) => tracing::debug!("analytics ping {} failed: {e}", event.event_type),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recap_api::{ApiError, ApiResult};
    use recap_common::{RecapManifest, RecapPeriod, SlideFragment};

    struct DownTracker;

    #[async_trait]
    impl RecapApi for DownTracker {
        async fn fetch_manifest(&self, _: &RecapPeriod) -> ApiResult<RecapManifest> {
            Err(ApiError::Other("down".into()))
        }
        async fn fetch_slide(&self, _: &RecapPeriod, _: &str) -> ApiResult<SlideFragment> {
            Err(ApiError::Other("down".into()))
        }
        async fn fetch_html(&self, _: &str) -> ApiResult<String> {
            Err(ApiError::Other("down".into()))
        }
        async fn fetch_png(&self, _: &str, _: &str) -> ApiResult<Vec<u8>> {
            Err(ApiError::Other("down".into()))
        }
        async fn track(&self, _: &SiteEvent) -> ApiResult<()> {
            Err(ApiError::Status { status: 503, body: String::new() })
        }
    }

    #[tokio::test]
    async fn failed_ping_is_swallowed() {
        let period = RecapPeriod::new(2026, 9).unwrap();
        let handle = ping(Arc::new(DownTracker), SiteEvent::page_view(&period));
        assert!(handle.await.is_ok());
    }
}
