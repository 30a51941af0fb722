use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep_until, Instant};

use recap_common::{RecapManifest, RecapPeriod, SiteEvent};
use recap_protocol::{Event, Op, Submission};

use crate::analytics;
use crate::cache::SlideCache;
use crate::config::Config;
use crate::error::{RecapError, Result};
use crate::presentation::{Deferred, Presentation, Task};
use crate::services::{EventSender, EventToaster, Services};
use crate::share::{RecapCard, ShareOrchestrator};
use crate::theme::ThemeTable;

/// Handle to a running recap. Ops go in through `submit`, events come out of `next_event`.
#[derive(Clone)]
pub struct RecapSession {
    inner: Arc<Inner>,
}

struct Inner {
    tx_submit: mpsc::Sender<Submission>,
    rx_event: Mutex<mpsc::UnboundedReceiver<Event>>,
}

enum TaskDone {
    Preview(std::result::Result<String, String>),
    Download,
}

impl RecapSession {
    /// Starts the session task. Slides are pre-fetched inside the task; the first
    /// event is `SessionStarted` once every fetch has settled. Toasts raised while
    /// the session runs arrive as `Event::Toast` instead of going to `services.toaster`.
    pub async fn spawn(
        config: &Config,
        services: Services,
        period: RecapPeriod,
        manifest: RecapManifest,
        themes: ThemeTable,
    ) -> Result<Self> {
        if manifest.slides.is_empty() {
            return Err(RecapError::NoSlides);
        }

        let (tx_submit, rx_submit) = mpsc::channel::<Submission>(64);
        let (tx_event, rx_event) = mpsc::unbounded_channel::<Event>();
        let services = services.with_toaster(Arc::new(EventToaster::new(tx_event.clone())));

        let orchestrator = Arc::new(ShareOrchestrator::new(
            services.clone(),
            Arc::new(RecapCard { period }),
            config.download_dir.clone(),
        ));
        let config = config.clone();

        tokio::spawn(async move {
            let cache = SlideCache::prefetch(services.api.as_ref(), &period, &manifest.slides).await;
            let total = manifest.slides.len();
            let presentation = match Presentation::new(manifest.slides, cache, themes, &config) {
                Ok(p) => p,
                Err(e) => {
                    let _ = tx_event.send(Event::Error { message: e.to_string() });
                    return;
                }
            };
            analytics::ping(Arc::clone(&services.api), SiteEvent::page_view(&period));
            tracing::info!("recap {period} started with {total} slides");
            let _ = tx_event.send(Event::SessionStarted { total });

            run_loop(presentation, rx_submit, tx_event, orchestrator).await;
        });

        Ok(Self {
            inner: Arc::new(Inner {
                tx_submit,
                rx_event: Mutex::new(rx_event),
            }),
        })
    }

    pub async fn submit(&self, op: Op) -> Result<String> {
        let submission = Submission::new(op);
        let id = submission.id.clone();
        self.inner
            .tx_submit
            .send(submission)
            .await
            .map_err(|_| RecapError::ChannelSend)?;
        Ok(id)
    }

    pub async fn next_event(&self) -> Option<Event> {
        let mut rx = self.inner.rx_event.lock().await;
        rx.recv().await
    }

    /// Non-blocking poll, for hosts that redraw on a tick.
    pub fn try_next_event(&self) -> Option<Event> {
        let mut rx = self.inner.rx_event.try_lock().ok()?;
        rx.try_recv().ok()
    }
}

async fn run_loop(
    mut presentation: Presentation,
    mut rx_submit: mpsc::Receiver<Submission>,
    tx_event: EventSender,
    orchestrator: Arc<ShareOrchestrator>,
) {
    let (tx_done, mut rx_done) = mpsc::unbounded_channel::<TaskDone>();
    let mut timers: Vec<(Instant, Deferred)> = Vec::new();

    presentation.start();

    loop {
        flush(&mut presentation, &tx_event, &mut timers, &tx_done, &orchestrator);

        let deadline = timers.iter().map(|(at, _)| *at).min();
        tokio::select! {
            submission = rx_submit.recv() => {
                let Some(submission) = submission else {
                    break;
                };
                if submission.op == Op::Shutdown {
                    let _ = tx_event.send(Event::ShutdownComplete);
                    break;
                }
                tracing::debug!("op {}: {:?}", submission.id, submission.op);
                presentation.apply(submission.op);
            }
            Some(done) = rx_done.recv() => match done {
                TaskDone::Preview(result) => presentation.preview_loaded(result),
                TaskDone::Download => presentation.download_finished(),
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let now = Instant::now();
                let mut due: Vec<(Instant, Deferred)> = Vec::new();
                timers.retain(|(at, action)| {
                    if *at <= now {
                        due.push((*at, action.clone()));
                        false
                    } else {
                        true
                    }
                });
                due.sort_by_key(|(at, _)| *at);
                for (_, action) in due {
                    presentation.on_timer(action);
                }
            }
        }
    }
    tracing::info!("recap session ended");
}

fn flush(
    presentation: &mut Presentation,
    tx_event: &EventSender,
    timers: &mut Vec<(Instant, Deferred)>,
    tx_done: &mpsc::UnboundedSender<TaskDone>,
    orchestrator: &Arc<ShareOrchestrator>,
) {
    for event in presentation.take_events() {
        let _ = tx_event.send(event);
    }

    let now = Instant::now();
    timers.extend(presentation.take_timers().into_iter().map(|t| (now + t.delay, t.action)));

    for task in presentation.take_tasks() {
        let orchestrator = Arc::clone(orchestrator);
        let tx_done = tx_done.clone();
        match task {
            Task::LoadPreview => {
                tokio::spawn(async move {
                    let result = orchestrator.load_preview().await.map_err(|e| e.to_string());
                    let _ = tx_done.send(TaskDone::Preview(result));
                });
            }
            Task::Download { theme } => {
                let sink = tx_event.clone();
                tokio::spawn(async move {
                    orchestrator.download(&theme, Some(sink)).await;
                    let _ = tx_done.send(TaskDone::Download);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RecapApi, StubClient};
    use crate::services::LogToaster;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn stub_session(dir: &TempDir) -> RecapSession {
        let period = RecapPeriod::new(2026, 9).unwrap();
        let api: Arc<dyn RecapApi> = Arc::new(StubClient);
        let manifest = api.fetch_manifest(&period).await.unwrap();
        let themes = ThemeTable::from_map(manifest.themes.clone());
        let config = Config { download_dir: dir.path().to_path_buf(), ..Config::default() };
        let services = Services::new(api, Arc::new(LogToaster));
        RecapSession::spawn(&config, services, period, manifest, themes).await.unwrap()
    }

    async fn wait_for<F: Fn(&Event) -> bool>(session: &RecapSession, pred: F) -> Event {
        loop {
            match tokio::time::timeout(Duration::from_secs(10), session.next_event()).await {
                Ok(Some(ev)) if pred(&ev) => return ev,
                Ok(Some(_)) => continue,
                other => panic!("event stream ended early: {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn session_starts_on_first_slide_and_animates() {
        let dir = TempDir::new().unwrap();
        let session = stub_session(&dir).await;

        assert_eq!(
            wait_for(&session, |e| matches!(e, Event::SessionStarted { .. })).await,
            Event::SessionStarted { total: 7 }
        );
        let changed = wait_for(&session, |e| matches!(e, Event::SlideChanged { .. })).await;
        assert!(matches!(changed, Event::SlideChanged { to: 0, .. }));
        let started = wait_for(&session, |e| matches!(e, Event::AnimationStarted { .. })).await;
        assert!(matches!(started, Event::AnimationStarted { plan } if plan.slide_index == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn quiz_answer_auto_advances_through_the_timer_queue() {
        let dir = TempDir::new().unwrap();
        let session = stub_session(&dir).await;
        wait_for(&session, |e| matches!(e, Event::SessionStarted { .. })).await;

        session.submit(Op::JumpTo { index: 2 }).await.unwrap();
        wait_for(&session, |e| matches!(e, Event::SlideChanged { to: 2, .. })).await;

        session.submit(Op::Next).await.unwrap();
        wait_for(&session, |e| matches!(e, Event::NavigationBlocked { index: 2 })).await;

        session.submit(Op::ChooseOption { option: 1 }).await.unwrap();
        let answered = wait_for(&session, |e| matches!(e, Event::QuizAnswered { .. })).await;
        assert!(matches!(answered, Event::QuizAnswered { ref result, .. } if result.correct));

        let advanced = wait_for(&session, |e| matches!(e, Event::SlideChanged { .. })).await;
        assert!(matches!(advanced, Event::SlideChanged { from: Some(2), to: 3, .. }));
    }

    #[tokio::test]
    async fn summary_preview_and_download() {
        let dir = TempDir::new().unwrap();
        let session = stub_session(&dir).await;
        wait_for(&session, |e| matches!(e, Event::SessionStarted { .. })).await;

        session.submit(Op::JumpTo { index: 6 }).await.unwrap();
        wait_for(&session, |e| *e == Event::SharePanelRevealed).await;
        wait_for(&session, |e| matches!(e, Event::PreviewLoaded { .. })).await;

        session.submit(Op::SelectTheme { key: "sunset".into() }).await.unwrap();
        let styled = wait_for(&session, |e| matches!(e, Event::PreviewStyled { .. })).await;
        assert!(matches!(styled, Event::PreviewStyled { ref key, .. } if key == "sunset"));

        session.submit(Op::Download).await.unwrap();
        let toast = wait_for(&session, |e| matches!(e, Event::Toast { .. })).await;
        assert!(matches!(toast, Event::Toast { level: recap_protocol::ToastLevel::Success, .. }));
        let saved = wait_for(&session, |e| matches!(e, Event::DownloadSaved { .. })).await;
        let Event::DownloadSaved { path } = saved else {
            unreachable!()
        };
        assert!(path.exists());
        wait_for(&session, |e| matches!(e, Event::DownloadControl { busy: false, .. })).await;

        session.submit(Op::Shutdown).await.unwrap();
        wait_for(&session, |e| *e == Event::ShutdownComplete).await;
    }

    #[tokio::test]
    async fn empty_manifest_is_refused() {
        let services = Services::new(Arc::new(StubClient), Arc::new(LogToaster));
        let result = RecapSession::spawn(
            &Config::default(),
            services,
            RecapPeriod::new(2026, 9).unwrap(),
            RecapManifest::default(),
            ThemeTable::default(),
        )
        .await;
        assert!(matches!(result, Err(RecapError::NoSlides)));
    }
}
