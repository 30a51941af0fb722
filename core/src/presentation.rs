//! Slide sequencer for a monthly recap.
//!
//! `Presentation` is a synchronous state machine. Every operation appends
//! host notifications to an outbox, and may request delayed callbacks
//! (`Timer`) or async work (`Task`). The session driver drains all three; tests
//! drive timers by hand through `on_timer`.

use std::collections::HashSet;
use std::mem;
use std::time::Duration;

use recap_common::{QuizMode, Slide, SlideFragment};
use recap_protocol::{Event, Op};

use crate::animation::AnimationTrigger;
use crate::cache::SlideCache;
use crate::config::{Config, SlideRules, TimingConfig};
use crate::error::{RecapError, Result};
use crate::quiz::{Answered, QuizAction, QuizEngine};
use crate::theme::{PreviewCoordinator, ThemeTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    ClearExiting { index: usize },
    Animate { index: usize },
    /// Fires only if slide `from` is still showing from the same visit.
    AutoAdvance { from: usize, visit: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub delay: Duration,
    pub action: Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    LoadPreview,
    Download { theme: String },
}

pub struct Presentation {
    slides: Vec<Slide>,
    cache: SlideCache,
    rules: SlideRules,
    timing: TimingConfig,
    current: usize,
    visit: u64,
    started: bool,
    animated: HashSet<usize>,
    animator: AnimationTrigger,
    quiz: QuizEngine,
    preview: PreviewCoordinator,
    share_loaded: bool,
    download_busy: bool,
    outbox: Vec<Event>,
    timers: Vec<Timer>,
    tasks: Vec<Task>,
}

impl Presentation {
    /// Reduced motion is read from `config` once and never changes afterwards.
    pub fn new(slides: Vec<Slide>, cache: SlideCache, themes: ThemeTable, config: &Config) -> Result<Self> {
        if slides.is_empty() {
            return Err(RecapError::NoSlides);
        }
        Ok(Self {
            slides,
            cache,
            rules: config.slides.clone(),
            timing: config.timing,
            current: 0,
            visit: 0,
            started: false,
            animated: HashSet::new(),
            animator: AnimationTrigger::new(config.reduced_motion, config.timing.count_up_ms),
            quiz: QuizEngine::new(),
            preview: PreviewCoordinator::new(themes),
            share_loaded: false,
            download_busy: false,
            outbox: Vec::new(),
            timers: Vec::new(),
            tasks: Vec::new(),
        })
    }

    /// Shows the first slide. Later calls do nothing.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.activate(0, None);
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn current_type(&self) -> &str {
        &self.slides[self.current].slide_type
    }

    pub fn current_fragment(&self) -> &SlideFragment {
        self.cache.get(self.current_type(), self.current)
    }

    pub fn quiz(&self) -> &QuizEngine {
        &self.quiz
    }

    pub fn preview(&self) -> &PreviewCoordinator {
        &self.preview
    }

    pub fn has_animated(&self, index: usize) -> bool {
        self.animated.contains(&index)
    }

    pub fn share_loaded(&self) -> bool {
        self.share_loaded
    }

    pub fn download_busy(&self) -> bool {
        self.download_busy
    }

    pub fn reduced_motion(&self) -> bool {
        self.animator.reduced_motion()
    }

    pub fn can_navigate(&self) -> bool {
        self.quiz.can_navigate()
    }

    fn on_final_slide(&self) -> bool {
        self.rules.is_final(self.current_type())
    }

    pub fn apply(&mut self, op: Op) -> bool {
        match op {
            Op::Next => self.next(),
            Op::Prev => self.prev(),
            Op::JumpTo { index } => self.jump_to(index),
            Op::ChooseOption { option } => self.choose_option(option),
            Op::SubmitQuiz => self.submit_quiz(),
            Op::SelectTheme { key } => self.select_theme(&key),
            Op::Resize { width, height } => {
                self.resize(width, height);
                true
            }
            Op::Download => self.request_download(),
            Op::Shutdown => false,
        }
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current + 1)
    }

    pub fn prev(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => false,
        }
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        self.go_to(index)
    }

    fn go_to(&mut self, index: usize) -> bool {
        if index >= self.slides.len() || index == self.current {
            return false;
        }
        if !self.quiz.can_navigate() {
            tracing::debug!("navigation from quiz slide {} blocked until answered", self.current);
            self.outbox.push(Event::NavigationBlocked { index: self.current });
            return false;
        }
        let from = self.current;
        self.activate(index, Some(from));
        true
    }

    fn activate(&mut self, index: usize, from: Option<usize>) {
        if let Some(prev) = from {
            self.outbox.push(Event::SlideExiting { index: prev });
            self.schedule(self.timing.exit_clear(), Deferred::ClearExiting { index: prev });
            if self.on_final_slide() {
                self.outbox.push(Event::SharePanelHidden);
            }
        }

        self.current = index;
        self.visit += 1;
        let slide_type = self.slides[index].slide_type.clone();
        let fragment = self.cache.get(&slide_type, index).clone();

        match (&fragment.quiz, self.rules.is_quiz(&slide_type)) {
            (Some(spec), true) => self.quiz.enter(&slide_type, spec.clone()),
            _ => self.quiz.leave(),
        }

        self.outbox.push(Event::SlideChanged {
            from,
            to: index,
            slide_type: slide_type.clone(),
            fragment,
        });
        self.outbox.push(Event::ProgressUpdated { active: index, total: self.slides.len() });

        if let Some(answered) = self.quiz.replay() {
            self.outbox.push(Event::QuizAnswered {
                slide_type: answered.slide_type,
                result: answered.result,
                options: answered.options,
            });
        }

        if self.animated.insert(index) {
            self.schedule(self.timing.animation_delay(), Deferred::Animate { index });
        }
        self.sync_navigation();

        if self.rules.is_celebration(&slide_type) && !self.animator.reduced_motion() {
            self.outbox.push(Event::Confetti { index });
        }

        if self.rules.is_final(&slide_type) {
            self.outbox.push(Event::SharePanelRevealed);
            if !self.share_loaded {
                self.share_loaded = true;
                self.outbox.push(self.preview.styled());
                self.tasks.push(Task::LoadPreview);
            }
        }
    }

    fn sync_navigation(&mut self) {
        let unlocked = self.quiz.can_navigate();
        self.outbox.push(Event::NavigationState {
            can_prev: unlocked && self.current > 0,
            can_next: unlocked && self.current + 1 < self.slides.len(),
        });
    }

    pub fn choose_option(&mut self, option: usize) -> bool {
        match self.quiz.choose(option) {
            Some(QuizAction::Toggled { value, selected }) => {
                let slide_type = self.current_type().to_string();
                self.outbox.push(Event::QuizOptionToggled { slide_type, value, selected });
                true
            }
            Some(QuizAction::Answered(answered)) => {
                self.answered(answered);
                true
            }
            None => false,
        }
    }

    pub fn submit_quiz(&mut self) -> bool {
        match self.quiz.submit() {
            Some(answered) => {
                self.answered(answered);
                true
            }
            None => false,
        }
    }

    fn answered(&mut self, answered: Answered) {
        tracing::info!(
            "quiz {} answered ({})",
            answered.slide_type,
            if answered.result.correct { "correct" } else { "incorrect" }
        );
        let delay = match answered.mode {
            QuizMode::Single => self.timing.single_select_advance(),
            QuizMode::Multi => self.timing.multi_select_advance(),
        };
        self.outbox.push(Event::QuizAnswered {
            slide_type: answered.slide_type,
            result: answered.result,
            options: answered.options,
        });
        self.outbox.push(Event::QuizScore { score: self.quiz.score() });
        self.sync_navigation();
        self.schedule(delay, Deferred::AutoAdvance { from: self.current, visit: self.visit });
    }

    pub fn on_timer(&mut self, action: Deferred) {
        match action {
            Deferred::ClearExiting { index } => self.outbox.push(Event::ExitCleared { index }),
            Deferred::Animate { index } => {
                let Some(slide) = self.slides.get(index) else {
                    return;
                };
                let html = &self.cache.get(&slide.slide_type, index).html;
                if let Some(plan) = self.animator.trigger(index, &slide.slide_type, html) {
                    self.outbox.push(Event::AnimationStarted { plan });
                }
            }
            Deferred::AutoAdvance { from, visit } => {
                if self.current == from && self.visit == visit {
                    self.next();
                }
            }
        }
    }

    pub fn select_theme(&mut self, key: &str) -> bool {
        if !self.on_final_slide() {
            return false;
        }
        let event = self.preview.select(key);
        self.outbox.push(event);
        true
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        let event = self.preview.resize(width, height);
        self.outbox.push(event);
    }

    pub fn request_download(&mut self) -> bool {
        if !self.on_final_slide() || self.download_busy {
            return false;
        }
        self.download_busy = true;
        self.tasks.push(Task::Download { theme: self.preview.current_key().to_string() });
        true
    }

    pub fn download_finished(&mut self) {
        self.download_busy = false;
    }

    pub fn preview_loaded(&mut self, result: std::result::Result<String, String>) {
        match result {
            Ok(html) => self.outbox.push(Event::PreviewLoaded { html }),
            Err(e) => {
                tracing::warn!("share preview failed to load: {e}");
                self.outbox.push(Event::PreviewUnavailable {
                    message: "Preview unavailable. You can still download the image.".to_string(),
                });
            }
        }
    }

    fn schedule(&mut self, delay: Duration, action: Deferred) {
        self.timers.push(Timer { delay, action });
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        mem::take(&mut self.outbox)
    }

    pub fn take_timers(&mut self) -> Vec<Timer> {
        mem::take(&mut self.timers)
    }

    pub fn take_tasks(&mut self) -> Vec<Task> {
        mem::take(&mut self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_common::quiz::QuizDetails;
    use recap_common::{QuizOption, QuizSpec};
    use serde_json::{json, Value};

    fn quiz_fragment(mode: QuizMode, options: &[Value], correct: &[Value]) -> SlideFragment {
        SlideFragment {
            html: "<h2>Quiz</h2>".to_string(),
            quiz: Some(QuizSpec {
                mode,
                options: options
                    .iter()
                    .map(|v| QuizOption { value: v.clone(), label: String::new() })
                    .collect(),
                correct: correct.to_vec(),
            }),
        }
    }

    /// intro, total_trophies, quiz_x (single), quiz_m (multi), summary
    fn deck(config: &Config) -> Presentation {
        let types = ["intro", "total_trophies", "quiz_x", "quiz_m", "summary"];
        let slides: Vec<Slide> = types.iter().map(|t| Slide::new(*t)).collect();
        let mut cache = SlideCache::new();
        cache.insert("intro", 0, SlideFragment { html: "<h1>Hi</h1>".into(), quiz: None });
        cache.insert(
            "total_trophies",
            1,
            SlideFragment { html: "<p data-count-up>+1,234</p>".into(), quiz: None },
        );
        cache.insert("quiz_x", 2, quiz_fragment(QuizMode::Single, &[json!("A"), json!("B")], &[json!("A")]));
        cache.insert(
            "quiz_m",
            3,
            quiz_fragment(QuizMode::Multi, &[json!("A"), json!("B"), json!("C")], &[json!("A"), json!("C")]),
        );
        cache.insert("summary", 4, SlideFragment { html: "<p>Bye</p>".into(), quiz: None });
        let mut presentation = Presentation::new(slides, cache, ThemeTable::default(), config).unwrap();
        presentation.start();
        presentation
    }

    fn fire_all(p: &mut Presentation) {
        for timer in p.take_timers() {
            p.on_timer(timer.action);
        }
    }

    #[test]
    fn refuses_empty_deck() {
        let result = Presentation::new(Vec::new(), SlideCache::new(), ThemeTable::default(), &Config::default());
        assert!(matches!(result, Err(RecapError::NoSlides)));
    }

    #[test]
    fn start_activates_first_slide() {
        let mut p = deck(&Config::default());
        let events = p.take_events();
        assert!(matches!(&events[0], Event::SlideChanged { from: None, to: 0, .. }));
        assert!(events.contains(&Event::NavigationState { can_prev: false, can_next: true }));
        assert!(p.has_animated(0));
        assert_eq!(
            p.take_timers(),
            vec![Timer { delay: Duration::from_millis(100), action: Deferred::Animate { index: 0 } }]
        );
    }

    #[test]
    fn index_stays_in_range() {
        let mut p = deck(&Config::default());
        assert!(!p.prev());
        assert!(!p.jump_to(99));
        assert_eq!(p.current(), 0);
        assert!(p.next());
        assert!(p.next());
        assert_eq!(p.current(), 2);
        assert!(!p.next());
        assert!(p.current() < p.len());
    }

    #[test]
    fn unanswered_quiz_blocks_every_direction() {
        let mut p = deck(&Config::default());
        p.jump_to(2);
        p.take_events();

        assert!(!p.next());
        assert!(!p.prev());
        assert!(!p.jump_to(4));
        assert_eq!(p.current(), 2);
        assert!(!p.quiz().has_answered());

        let events = p.take_events();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| *e == Event::NavigationBlocked { index: 2 }));
    }

    #[test]
    fn revisiting_does_not_reanimate() {
        let mut p = deck(&Config::default());
        p.next();
        fire_all(&mut p);
        p.prev();
        p.take_events();
        let timers = p.take_timers();
        assert!(timers.iter().all(|t| !matches!(t.action, Deferred::Animate { .. })));
        p.next();
        let timers = p.take_timers();
        assert!(timers.iter().all(|t| !matches!(t.action, Deferred::Animate { .. })));
        assert!(p.has_animated(1));
    }

    #[test]
    fn animation_plan_carries_count_ups() {
        let mut p = deck(&Config::default());
        p.next();
        p.take_events();
        fire_all(&mut p);
        let events = p.take_events();
        let plan = events
            .iter()
            .find_map(|e| match e {
                Event::AnimationStarted { plan } if plan.slide_index == 1 => Some(plan.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(plan.count_ups[0].frame(1.0), "+1,234");
        assert!(events.contains(&Event::ExitCleared { index: 0 }));
    }

    #[test]
    fn reduced_motion_skips_animations_and_confetti() {
        let config = Config { reduced_motion: true, ..Config::default() };
        let mut p = deck(&config);
        fire_all(&mut p);
        p.next();
        fire_all(&mut p);
        let events = p.take_events();
        assert!(!events.iter().any(|e| matches!(e, Event::AnimationStarted { .. })));
        assert!(p.has_animated(1));
    }

    #[test]
    fn single_select_answer_unlocks_and_auto_advances() {
        let mut p = deck(&Config::default());
        p.jump_to(2);
        p.take_events();
        p.take_timers();

        assert!(p.choose_option(0));
        let result = p.quiz().result("quiz_x").unwrap();
        assert!(result.correct);
        assert!(matches!(result.details, QuizDetails::Single { .. }));
        assert!(p.can_navigate());

        let events = p.take_events();
        assert!(events.contains(&Event::NavigationState { can_prev: true, can_next: true }));

        let timers = p.take_timers();
        assert_eq!(
            timers,
            vec![Timer { delay: Duration::from_millis(2000), action: Deferred::AutoAdvance { from: 2, visit: 2 } }]
        );
        p.on_timer(timers[0].action.clone());
        assert_eq!(p.current(), 3);
    }

    #[test]
    fn auto_advance_is_dropped_after_manual_navigation() {
        let mut p = deck(&Config::default());
        p.jump_to(2);
        p.choose_option(1);
        let timers = p.take_timers();
        p.prev();
        for timer in timers {
            p.on_timer(timer.action);
        }
        assert_eq!(p.current(), 1);
    }

    #[test]
    fn auto_advance_is_dropped_after_returning_to_the_quiz() {
        let mut p = deck(&Config::default());
        p.jump_to(2);
        p.take_timers();
        p.choose_option(1);
        let stale = p.take_timers();
        assert!(p.prev());
        assert!(p.next());
        p.take_timers();
        for timer in stale {
            p.on_timer(timer.action);
        }
        assert_eq!(p.current(), 2);
    }

    #[test]
    fn multi_select_uses_its_own_delay() {
        let mut p = deck(&Config::default());
        p.jump_to(2);
        p.choose_option(0);
        fire_all(&mut p);
        assert_eq!(p.current(), 3);
        p.take_timers();
        p.take_events();

        assert!(!p.submit_quiz());
        p.choose_option(0);
        p.choose_option(1);
        assert!(!p.next());
        assert!(p.submit_quiz());
        assert!(!p.quiz().result("quiz_m").unwrap().correct);

        let timers = p.take_timers();
        assert_eq!(timers[0].delay, Duration::from_millis(2500));
        assert!(p.next());
    }

    #[test]
    fn answered_quiz_stays_open_on_revisit() {
        let mut p = deck(&Config::default());
        p.jump_to(2);
        p.choose_option(1);
        p.prev();
        p.take_events();
        p.next();
        assert!(p.quiz().has_answered());
        assert!(!p.choose_option(0));

        let events = p.take_events();
        let changed = events.iter().position(|e| matches!(e, Event::SlideChanged { to: 2, .. })).unwrap();
        let replayed = events
            .iter()
            .position(|e| matches!(e, Event::QuizAnswered { slide_type, result, .. } if slide_type == "quiz_x" && !result.correct))
            .unwrap();
        assert!(changed < replayed);
        assert!(p.take_timers().iter().all(|t| !matches!(t.action, Deferred::AutoAdvance { .. })));
        assert!(p.next());
    }

    #[test]
    fn summary_loads_share_panel_once() {
        let mut p = deck(&Config::default());
        p.jump_to(4);
        let events = p.take_events();
        assert!(events.contains(&Event::SharePanelRevealed));
        assert!(events.iter().any(|e| matches!(e, Event::Confetti { index: 4 })));
        assert_eq!(p.take_tasks(), vec![Task::LoadPreview]);

        assert!(p.jump_to(1));
        assert!(p.take_events().contains(&Event::SharePanelHidden));
        assert!(p.jump_to(4));
        assert!(p.take_tasks().is_empty());
        assert!(p.share_loaded());
    }

    #[test]
    fn download_only_from_summary_and_one_at_a_time() {
        let mut p = deck(&Config::default());
        assert!(!p.request_download());
        p.jump_to(4);
        p.take_tasks();
        assert!(p.select_theme("missing"));
        assert_eq!(p.preview().current_key(), "default");
        assert!(p.request_download());
        assert!(!p.request_download());
        assert_eq!(p.take_tasks(), vec![Task::Download { theme: "default".to_string() }]);
        p.download_finished();
        assert!(p.request_download());
    }

    #[test]
    fn preview_failure_is_reported_inline() {
        let mut p = deck(&Config::default());
        p.take_events();
        p.preview_loaded(Err("502".to_string()));
        assert!(matches!(p.take_events()[0], Event::PreviewUnavailable { .. }));
    }

    #[test]
    fn degraded_quiz_slide_does_not_lock() {
        let slides = vec![Slide::new("quiz_broken"), Slide::new("summary")];
        let mut p = Presentation::new(slides, SlideCache::new(), ThemeTable::default(), &Config::default()).unwrap();
        p.start();
        assert!(p.current_fragment().is_fallback());
        assert!(p.next());
    }
}
