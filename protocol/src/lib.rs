use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use recap_common::quiz::{MarkedOption, QuizScore};
use recap_common::{AnimationPlan, QuizResult, SlideFragment, ThemeStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

/// Notifications from a recap session to its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// All slides are fetched (real or fallback content).
    SessionStarted { total: usize },
    SlideChanged { from: Option<usize>, to: usize, slide_type: String, fragment: SlideFragment },
    /// Previous slide plays its exit transition.
    SlideExiting { index: usize },
    ExitCleared { index: usize },
    ProgressUpdated { active: usize, total: usize },
    NavigationState { can_prev: bool, can_next: bool },
    /// A transition was refused because the active quiz is unanswered.
    NavigationBlocked { index: usize },
    AnimationStarted { plan: AnimationPlan },
    Confetti { index: usize },
    QuizOptionToggled { slide_type: String, value: String, selected: bool },
    QuizAnswered { slide_type: String, result: QuizResult, options: Vec<MarkedOption> },
    QuizScore { score: QuizScore },
    SharePanelRevealed,
    /// The deck moved off the summary slide.
    SharePanelHidden,
    PreviewLoaded { html: String },
    PreviewUnavailable { message: String },
    PreviewStyled { key: String, style: ThemeStyle, scale: f64 },
    PreviewScaled { scale: f64 },
    DownloadControl { busy: bool, label: String },
    DownloadSaved { path: PathBuf },
    Toast { level: ToastLevel, message: String },
    Error { message: String },
    ShutdownComplete,
}

/// Commands a host submits to a recap session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    Next,
    Prev,
    JumpTo { index: usize },
    /// Select (single-select) or toggle (multi-select) an option by its position.
    ChooseOption { option: usize },
    SubmitQuiz,
    SelectTheme { key: String },
    Resize { width: f64, height: f64 },
    Download,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub op: Op,
}

impl Submission {
    pub fn new(op: Op) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            op,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submissions_get_unique_ids() {
        let a = Submission::new(Op::Next);
        let b = Submission::new(Op::Next);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn ops_serialize_by_name() {
        let json = serde_json::to_string(&Op::JumpTo { index: 3 }).unwrap();
        assert_eq!(json, r#"{"JumpTo":{"index":3}}"#);
        let back: Op = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Op::JumpTo { index: 3 });
    }
}
