use std::sync::Arc;
use tokio::sync::mpsc;

use recap_protocol::{Event, ToastLevel};

use crate::client::RecapApi;

pub type EventSender = mpsc::UnboundedSender<Event>;

/// User-visible notification chrome.
pub trait Toaster: Send + Sync {
    fn show(&self, level: ToastLevel, message: &str);
}

/// Forwards toasts to the session's event stream.
pub struct EventToaster {
    tx: EventSender,
}

impl EventToaster {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }
}

impl Toaster for EventToaster {
    fn show(&self, level: ToastLevel, message: &str) {
        let _ = self.tx.send(Event::Toast { level, message: message.to_string() });
    }
}

pub struct LogToaster;

impl Toaster for LogToaster {
    fn show(&self, level: ToastLevel, message: &str) {
        match level {
            ToastLevel::Error => tracing::error!("{message}"),
            ToastLevel::Info | ToastLevel::Success => tracing::info!("{message}"),
        }
    }
}

/// Collaborators handed to every component at construction.
#[derive(Clone)]
pub struct Services {
    pub api: Arc<dyn RecapApi>,
    pub toaster: Arc<dyn Toaster>,
}

impl Services {
    pub fn new(api: Arc<dyn RecapApi>, toaster: Arc<dyn Toaster>) -> Self {
        Self { api, toaster }
    }

    pub fn with_toaster(&self, toaster: Arc<dyn Toaster>) -> Self {
        Self { api: Arc::clone(&self.api), toaster }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_toaster_emits_toast_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        EventToaster::new(tx).show(ToastLevel::Error, "boom");
        assert_eq!(
            rx.try_recv().unwrap(),
            Event::Toast { level: ToastLevel::Error, message: "boom".to_string() }
        );
    }
}
