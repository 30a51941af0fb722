use futures::future::join_all;
use std::collections::HashMap;

use recap_common::{RecapPeriod, Slide, SlideFragment};

use crate::client::RecapApi;

/// Cache key for a slide. Slides of the same type at different positions are cached separately.
pub fn cache_key(slide_type: &str, index: usize) -> String {
    format!("{slide_type}_{index}")
}

/// Per-session store of pre-fetched slide fragments. Entries are never invalidated.
#[derive(Debug, Clone)]
pub struct SlideCache {
    entries: HashMap<String, SlideFragment>,
    fallback: SlideFragment,
}

impl Default for SlideCache {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            fallback: SlideFragment::fallback(),
        }
    }
}

impl SlideCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches every slide in parallel. A failed fetch is logged and replaced by
    /// the fallback fragment inside its own future, so the join always completes.
    pub async fn prefetch(api: &dyn RecapApi, period: &RecapPeriod, slides: &[Slide]) -> Self {
        let fetches = slides.iter().enumerate().map(|(index, slide)| async move {
            let fragment = match api.fetch_slide(period, &slide.slide_type).await {
                Ok(fragment) => fragment,
                Err(e) => {
                    tracing::warn!(status = ?e.status(), "slide {index} ({}) failed to load: {e}", slide.slide_type);
                    SlideFragment::fallback()
                }
            };
            (cache_key(&slide.slide_type, index), fragment)
        });

        let mut cache = Self::new();
        cache.entries.extend(join_all(fetches).await);
        tracing::info!("prefetched {} slides for {period}", cache.entries.len());
        cache
    }

    pub fn insert(&mut self, slide_type: &str, index: usize, fragment: SlideFragment) {
        self.entries.insert(cache_key(slide_type, index), fragment);
    }

    /// Cached fragment, or the fallback when the slide was never fetched.
    pub fn get(&self, slide_type: &str, index: usize) -> &SlideFragment {
        self.entries.get(&cache_key(slide_type, index)).unwrap_or(&self.fallback)
    }

    pub fn is_fallback(&self, slide_type: &str, index: usize) -> bool {
        self.get(slide_type, index).is_fallback()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
