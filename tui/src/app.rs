use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
};
use recap_common::{normalize_answer, AnimationPlan, MarkedOption, OptionMark, QuizScore, QuizSpec};
use recap_protocol::{Event, ToastLevel};

use crate::preview::{apply_count_ups, centered, html_to_lines};

const TOAST_TTL: Duration = Duration::from_secs(3);
const SHAKE: Duration = Duration::from_millis(400);
const CONFETTI: Duration = Duration::from_millis(1500);
/// Rows taken by the progress gauge, borders included.
const GAUGE_ROWS: u16 = 3;

#[derive(Debug, Default)]
struct SharePanel {
    visible: bool,
    preview: Vec<String>,
    unavailable: Option<String>,
    theme_key: String,
    theme_name: String,
    accent: Option<Color>,
    scale: f64,
    download_label: String,
    busy: bool,
    saved: Option<PathBuf>,
}

/// Everything the terminal shows, folded from session events.
pub struct Viewer {
    pub running: bool,
    theme_keys: Vec<String>,
    total: usize,
    active: usize,
    slide_type: String,
    lines: Vec<String>,
    quiz: Option<QuizSpec>,
    toggled: BTreeSet<String>,
    marks: Vec<MarkedOption>,
    verdict: Option<bool>,
    score: Option<QuizScore>,
    can_prev: bool,
    can_next: bool,
    count_up: Option<(AnimationPlan, Instant)>,
    blocked_until: Option<Instant>,
    confetti_until: Option<Instant>,
    share: Option<SharePanel>,
    toasts: VecDeque<(ToastLevel, String, Instant)>,
}

impl Viewer {
    pub fn new(theme_keys: Vec<String>) -> Self {
        Self {
            running: true,
            theme_keys,
            total: 0,
            active: 0,
            slide_type: String::new(),
            lines: vec!["Loading your recap...".to_string()],
            quiz: None,
            toggled: BTreeSet::new(),
            marks: Vec::new(),
            verdict: None,
            score: None,
            can_prev: false,
            can_next: false,
            count_up: None,
            blocked_until: None,
            confetti_until: None,
            share: None,
            toasts: VecDeque::new(),
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn share_visible(&self) -> bool {
        self.visible_share().is_some()
    }

    fn visible_share(&self) -> Option<&SharePanel> {
        self.share.as_ref().filter(|s| s.visible)
    }

    /// Slide under a click on the progress gauge of a `width`-column terminal.
    pub fn jump_target(&self, column: u16, row: u16, width: u16) -> Option<usize> {
        if row >= GAUGE_ROWS || self.total == 0 || width < 3 {
            return None;
        }
        let inner = usize::from(width - 2);
        let column = usize::from(column.saturating_sub(1)).min(inner - 1);
        Some((column * self.total / inner).min(self.total - 1))
    }

    /// Theme after the current one, wrapping around.
    pub fn next_theme(&self) -> Option<String> {
        let current = self.share.as_ref().map(|s| s.theme_key.as_str()).unwrap_or("");
        let pos = self.theme_keys.iter().position(|k| k == current);
        let next = pos.map_or(0, |p| (p + 1) % self.theme_keys.len().max(1));
        self.theme_keys.get(next).cloned()
    }

    pub fn apply(&mut self, event: Event, now: Instant) {
        match event {
            Event::SessionStarted { total } => self.total = total,
            Event::SlideChanged { to, slide_type, fragment, .. } => {
                self.active = to;
                self.slide_type = slide_type;
                self.lines = html_to_lines(&fragment.html);
                self.quiz = fragment.quiz;
                self.toggled.clear();
                self.marks.clear();
                self.verdict = None;
                self.count_up = None;
            }
            Event::ProgressUpdated { active, total } => {
                self.active = active;
                self.total = total;
            }
            Event::NavigationState { can_prev, can_next } => {
                self.can_prev = can_prev;
                self.can_next = can_next;
            }
            Event::NavigationBlocked { .. } => self.blocked_until = Some(now + SHAKE),
            Event::AnimationStarted { plan } => {
                if plan.slide_index == self.active {
                    self.count_up = Some((plan, now));
                }
            }
            Event::Confetti { .. } => self.confetti_until = Some(now + CONFETTI),
            Event::QuizOptionToggled { value, selected, .. } => {
                if selected {
                    self.toggled.insert(value);
                } else {
                    self.toggled.remove(&value);
                }
            }
            Event::QuizAnswered { result, options, .. } => {
                self.verdict = Some(result.correct);
                self.marks = options;
            }
            Event::QuizScore { score } => self.score = Some(score),
            Event::SharePanelRevealed => {
                let share = self.share.get_or_insert_with(|| SharePanel {
                    download_label: "Download Image".to_string(),
                    scale: 1.0,
                    ..SharePanel::default()
                });
                share.visible = true;
            }
            Event::SharePanelHidden => {
                if let Some(share) = self.share.as_mut() {
                    share.visible = false;
                }
            }
            Event::PreviewLoaded { html } => {
                if let Some(share) = self.share.as_mut() {
                    share.preview = html_to_lines(&html);
                    share.unavailable = None;
                }
            }
            Event::PreviewUnavailable { message } => {
                if let Some(share) = self.share.as_mut() {
                    share.unavailable = Some(message);
                }
            }
            Event::PreviewStyled { key, style, scale } => {
                if let Some(share) = self.share.as_mut() {
                    share.theme_key = key;
                    share.theme_name = style.name;
                    share.accent = style.accent_color.as_deref().and_then(parse_hex);
                    share.scale = scale;
                }
            }
            Event::PreviewScaled { scale } => {
                if let Some(share) = self.share.as_mut() {
                    share.scale = scale;
                }
            }
            Event::DownloadControl { busy, label } => {
                if let Some(share) = self.share.as_mut() {
                    share.busy = busy;
                    share.download_label = label;
                }
            }
            Event::DownloadSaved { path } => {
                if let Some(share) = self.share.as_mut() {
                    share.saved = Some(path);
                }
            }
            Event::Toast { level, message } => self.push_toast(level, message, now),
            Event::Error { message } => self.push_toast(ToastLevel::Error, message, now),
            Event::ShutdownComplete => self.running = false,
            Event::SlideExiting { .. } | Event::ExitCleared { .. } => {}
        }
    }

    fn push_toast(&mut self, level: ToastLevel, message: String, now: Instant) {
        self.toasts.push_back((level, message, now + TOAST_TTL));
        while self.toasts.len() > 3 {
            self.toasts.pop_front();
        }
    }

    /// Drops expired toasts and finished flashes.
    pub fn tick(&mut self, now: Instant) {
        self.toasts.retain(|(_, _, until)| *until > now);
        if self.blocked_until.is_some_and(|t| t <= now) {
            self.blocked_until = None;
        }
        if self.confetti_until.is_some_and(|t| t <= now) {
            self.confetti_until = None;
        }
    }

    /// Slide text with count-ups advanced to `now`.
    pub fn slide_lines(&self, now: Instant) -> Vec<String> {
        match &self.count_up {
            Some((plan, started)) if !plan.count_ups.is_empty() => {
                let elapsed = now.saturating_duration_since(*started).as_millis() as f64;
                let progress = if plan.count_up_ms == 0 { 1.0 } else { elapsed / plan.count_up_ms as f64 };
                apply_count_ups(&self.lines, &plan.count_ups, progress)
            }
            _ => self.lines.clone(),
        }
    }

    fn option_items(&self) -> Vec<ListItem<'static>> {
        let Some(quiz) = &self.quiz else {
            return Vec::new();
        };
        quiz.options
            .iter()
            .enumerate()
            .map(|(i, option)| {
                let key = normalize_answer(&option.value);
                let label = if option.label.is_empty() { key.clone() } else { option.label.clone() };
                let mark = self.marks.iter().find(|m| m.value == key).map(|m| m.mark);
                let (tick, style) = match mark {
                    Some(OptionMark::Correct) => ("✓", Style::default().fg(Color::Green)),
                    Some(OptionMark::Incorrect) => ("✗", Style::default().fg(Color::Red)),
                    Some(OptionMark::Missed) => ("!", Style::default().fg(Color::Yellow)),
                    Some(OptionMark::Neutral) => (" ", Style::default().fg(Color::DarkGray)),
                    None if self.toggled.contains(&key) => ("x", Style::default().add_modifier(Modifier::BOLD)),
                    None => (" ", Style::default()),
                };
                ListItem::new(format!("{}. [{tick}] {label}", i + 1)).style(style)
            })
            .collect()
    }

    pub fn draw(&self, f: &mut Frame, now: Instant) {
        let share_height = if self.share_visible() { 10 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(GAUGE_ROWS),
                Constraint::Min(5),
                Constraint::Length(share_height),
                Constraint::Length(3),
            ])
            .split(f.area());

        self.draw_progress(f, chunks[0]);
        self.draw_slide(f, chunks[1], now);
        if let Some(share) = self.visible_share() {
            draw_share(f, chunks[2], share);
        }
        self.draw_footer(f, chunks[3]);
    }

    fn draw_progress(&self, f: &mut Frame, area: Rect) {
        let ratio = if self.total == 0 { 0.0 } else { (self.active + 1) as f64 / self.total as f64 };
        let mut label = format!("Slide {}/{}", self.active + 1, self.total.max(1));
        if let Some(score) = &self.score {
            label.push_str(&format!("  Quiz {}/{} ({:.0}%)", score.correct, score.total, score.percentage));
        }
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Monthly Recap"))
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(label);
        f.render_widget(gauge, area);
    }

    fn draw_slide(&self, f: &mut Frame, area: Rect, now: Instant) {
        let mut title = self.slide_type.clone();
        if self.confetti_until.is_some() {
            title.push_str("  * * * congratulations * * *");
        }
        let border = if self.blocked_until.is_some() { Color::Red } else { Color::White };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let options = self.option_items();
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(options.len() as u16 + 1)])
            .split(inner);

        let text: Vec<Line> = self
            .slide_lines(now)
            .iter()
            .map(|l| Line::from(centered(l, parts[0].width)))
            .collect();
        f.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), parts[0]);

        if !options.is_empty() {
            let hint = match (self.verdict, self.quiz.as_ref().map(|q| q.mode)) {
                (Some(true), _) => "Correct!",
                (Some(false), _) => "Not quite.",
                (None, Some(recap_common::QuizMode::Multi)) => "Toggle with 1-9, Enter to submit",
                (None, _) => "Pick an answer with 1-9",
            };
            f.render_widget(List::new(options).block(Block::default().title(hint)), parts[1]);
        }
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let text = match self.toasts.back() {
            Some((level, message, _)) => {
                let color = match level {
                    ToastLevel::Info => Color::Cyan,
                    ToastLevel::Success => Color::Green,
                    ToastLevel::Error => Color::Red,
                };
                Line::styled(message.clone(), Style::default().fg(color))
            }
            None => {
                let prev = if self.can_prev { "←" } else { " " };
                let next = if self.can_next { "→" } else { " " };
                Line::from(format!("{prev} {next}  navigate   t theme   d download   q quit"))
            }
        };
        f.render_widget(Paragraph::new(text).block(Block::default().borders(Borders::ALL)), area);
    }
}

fn draw_share(f: &mut Frame, area: Rect, share: &SharePanel) {
    let accent = share.accent.unwrap_or(Color::Cyan);
    let title = format!(
        "Share card: {} ({:.0}%)  [{}]",
        share.theme_name,
        share.scale * 100.0,
        share.download_label
    );
    let mut lines: Vec<Line> = match &share.unavailable {
        Some(message) => vec![Line::styled(message.clone(), Style::default().fg(Color::Yellow))],
        None => share.preview.iter().map(|l| Line::from(l.clone())).collect(),
    };
    if let Some(path) = &share.saved {
        lines.push(Line::styled(format!("Saved to {}", path.display()), Style::default().fg(Color::Green)));
    }
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if share.busy { Color::DarkGray } else { accent }));
    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

/// `#rrggbb` to a terminal color.
fn parse_hex(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}
