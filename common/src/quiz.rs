use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    pub value: Value,
    #[serde(default)]
    pub label: String,
}

/// Quiz description shipped alongside a quiz slide's HTML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSpec {
    pub mode: QuizMode,
    pub options: Vec<QuizOption>,
    #[serde(deserialize_with = "one_or_many")]
    pub correct: Vec<Value>,
}

/// Backends send a bare value for single-select quizzes and an array for multi-select ones.
fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Value>, D::Error> {
    match Value::deserialize(d)? {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

impl QuizSpec {
    pub fn correct_keys(&self) -> Vec<String> {
        self.correct.iter().map(normalize_answer).collect()
    }

    pub fn option_keys(&self) -> Vec<String> {
        self.options.iter().map(|o| normalize_answer(&o.value)).collect()
    }
}

/// String form of an answer value. `2`, `2.0` and `"2"` all normalize to `"2"`.
pub fn normalize_answer(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiScore {
    pub correct: usize,
    pub incorrect: usize,
    pub missed: usize,
}

impl MultiScore {
    pub fn is_fully_correct(&self) -> bool {
        self.incorrect == 0 && self.missed == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuizDetails {
    Single { selected: String, answer: String },
    Multi { selected: Vec<String>, score: MultiScore },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub correct: bool,
    pub details: QuizDetails,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
}

/// Styling applied to one option once a quiz is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionMark {
    Correct,
    Incorrect,
    Missed,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedOption {
    pub value: String,
    pub mark: OptionMark,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_numbers_and_strings_alike() {
        assert_eq!(normalize_answer(&json!(2)), "2");
        assert_eq!(normalize_answer(&json!("2")), "2");
        assert_eq!(normalize_answer(&json!(2.0)), "2");
        assert_eq!(normalize_answer(&json!(" A ")), "A");
        assert_eq!(normalize_answer(&json!(1.5)), "1.5");
    }

    #[test]
    fn correct_accepts_scalar_or_array() {
        let single: QuizSpec = serde_json::from_str(
            r#"{"mode":"single","correct":2,"options":[{"value":"1"},{"value":"2"}]}"#,
        )
        .unwrap();
        assert_eq!(single.correct_keys(), vec!["2"]);

        let multi: QuizSpec = serde_json::from_str(
            r#"{"mode":"multi","correct":["A","C"],"options":[{"value":"A","label":"Alpha"}]}"#,
        )
        .unwrap();
        assert_eq!(multi.mode, QuizMode::Multi);
        assert_eq!(multi.correct_keys(), vec!["A", "C"]);
        assert_eq!(multi.options[0].label, "Alpha");
    }
}
