use chrono::Utc;
use std::collections::{HashMap, HashSet};

use recap_common::quiz::{MarkedOption, MultiScore, OptionMark, QuizDetails};
use recap_common::{QuizMode, QuizResult, QuizScore, QuizSpec};

/// Outcome of choosing an option on the active quiz.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizAction {
    Toggled { value: String, selected: bool },
    Answered(Answered),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answered {
    pub slide_type: String,
    pub mode: QuizMode,
    pub result: QuizResult,
    pub options: Vec<MarkedOption>,
}

#[derive(Debug, Clone)]
struct ActiveQuiz {
    slide_type: String,
    spec: QuizSpec,
    selected: Vec<String>,
}

/// Answer state for interactive slides. Results survive the whole session;
/// the answered flag resets every time a quiz slide becomes active.
#[derive(Debug, Default)]
pub struct QuizEngine {
    results: HashMap<String, QuizResult>,
    marks: HashMap<String, Vec<MarkedOption>>,
    has_answered: bool,
    active: Option<ActiveQuiz>,
}

impl QuizEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates a quiz slide. A quiz already answered earlier in the session
    /// stays answered, so revisiting it never locks navigation.
    pub fn enter(&mut self, slide_type: &str, spec: QuizSpec) {
        self.has_answered = self.results.contains_key(slide_type);
        self.active = Some(ActiveQuiz {
            slide_type: slide_type.to_string(),
            spec,
            selected: Vec::new(),
        });
    }

    /// The active slide is not a quiz.
    pub fn leave(&mut self) {
        self.active = None;
        self.has_answered = false;
    }

    pub fn can_navigate(&self) -> bool {
        self.active.is_none() || self.has_answered
    }

    pub fn has_answered(&self) -> bool {
        self.has_answered
    }

    pub fn selected(&self) -> &[String] {
        self.active.as_ref().map(|q| q.selected.as_slice()).unwrap_or(&[])
    }

    pub fn result(&self, slide_type: &str) -> Option<&QuizResult> {
        self.results.get(slide_type)
    }

    /// The recorded answer for the active quiz, for redrawing it on a revisit.
    pub fn replay(&self) -> Option<Answered> {
        let quiz = self.active.as_ref()?;
        let result = self.results.get(&quiz.slide_type)?;
        Some(Answered {
            slide_type: quiz.slide_type.clone(),
            mode: quiz.spec.mode,
            result: result.clone(),
            options: self.marks.get(&quiz.slide_type).cloned().unwrap_or_default(),
        })
    }

    /// Single-select: the first choice locks the answer. Multi-select: toggles the option.
    pub fn choose(&mut self, option: usize) -> Option<QuizAction> {
        if self.has_answered {
            return None;
        }
        let quiz = self.active.as_mut()?;
        let value = quiz.spec.options.get(option).map(|o| recap_common::normalize_answer(&o.value))?;

        match quiz.spec.mode {
            QuizMode::Single => {
                let correct_keys = quiz.spec.correct_keys();
                let correct = correct_keys.contains(&value);
                let options = quiz
                    .spec
                    .option_keys()
                    .into_iter()
                    .map(|key| {
                        let mark = if correct_keys.contains(&key) {
                            OptionMark::Correct
                        } else if key == value {
                            OptionMark::Incorrect
                        } else {
                            OptionMark::Neutral
                        };
                        MarkedOption { value: key, mark }
                    })
                    .collect();
                let details = QuizDetails::Single {
                    selected: value,
                    answer: correct_keys.join(","),
                };
                let slide_type = quiz.slide_type.clone();
                Some(QuizAction::Answered(self.finish(slide_type, QuizMode::Single, correct, details, options)))
            }
            QuizMode::Multi => {
                let selected = if let Some(pos) = quiz.selected.iter().position(|v| *v == value) {
                    quiz.selected.remove(pos);
                    false
                } else {
                    quiz.selected.push(value.clone());
                    true
                };
                Some(QuizAction::Toggled { value, selected })
            }
        }
    }

    /// Scores a multi-select quiz. Ignored when nothing is selected.
    pub fn submit(&mut self) -> Option<Answered> {
        if self.has_answered {
            return None;
        }
        let quiz = self.active.as_ref()?;
        if quiz.spec.mode != QuizMode::Multi || quiz.selected.is_empty() {
            return None;
        }

        let correct_keys = quiz.spec.correct_keys();
        let score = score_multi(&correct_keys, &quiz.selected);
        let options = quiz
            .spec
            .option_keys()
            .into_iter()
            .map(|key| {
                let is_correct = correct_keys.contains(&key);
                let is_selected = quiz.selected.contains(&key);
                let mark = match (is_selected, is_correct) {
                    (true, true) => OptionMark::Correct,
                    (true, false) => OptionMark::Incorrect,
                    (false, true) => OptionMark::Missed,
                    (false, false) => OptionMark::Neutral,
                };
                MarkedOption { value: key, mark }
            })
            .collect();
        let details = QuizDetails::Multi { selected: quiz.selected.clone(), score };
        let slide_type = quiz.slide_type.clone();
        Some(self.finish(slide_type, QuizMode::Multi, score.is_fully_correct(), details, options))
    }

    fn finish(
        &mut self,
        slide_type: String,
        mode: QuizMode,
        correct: bool,
        details: QuizDetails,
        options: Vec<MarkedOption>,
    ) -> Answered {
        self.has_answered = true;
        let result = QuizResult { correct, details, timestamp: Utc::now() };
        if self.record_result(&slide_type, result.clone()) {
            self.marks.insert(slide_type.clone(), options.clone());
        }
        Answered { slide_type, mode, result, options }
    }

    /// Records the first result for `slide_type`; later ones are ignored.
    pub fn record_result(&mut self, slide_type: &str, result: QuizResult) -> bool {
        if self.results.contains_key(slide_type) {
            return false;
        }
        self.results.insert(slide_type.to_string(), result);
        true
    }

    pub fn score(&self) -> QuizScore {
        let total = self.results.len();
        let correct = self.results.values().filter(|r| r.correct).count();
        let percentage = if total == 0 { 0.0 } else { correct as f64 * 100.0 / total as f64 };
        QuizScore { correct, total, percentage }
    }
}

/// Counts correct picks, wrong picks and correct options left unpicked.
pub fn score_multi(correct: &[String], selected: &[String]) -> MultiScore {
    let correct: HashSet<&str> = correct.iter().map(String::as_str).collect();
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
    MultiScore {
        correct: selected.intersection(&correct).count(),
        incorrect: selected.difference(&correct).count(),
        missed: correct.difference(&selected).count(),
    }
}
