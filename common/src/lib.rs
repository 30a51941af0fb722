//! Data model shared by the recap engine, its wire protocol and its hosts.

pub mod animation;
pub mod quiz;
pub mod theme;
pub mod types;

pub use animation::{AnimationPlan, CountUp, Effect};
pub use quiz::{
    normalize_answer, MarkedOption, MultiScore, OptionMark, QuizDetails, QuizMode, QuizOption, QuizResult, QuizScore,
    QuizSpec,
};
pub use theme::{ThemeStyle, DEFAULT_THEME_KEY};
pub use types::*;
