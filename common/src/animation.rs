use serde::{Deserialize, Serialize};

/// A number that animates from zero up to its final value, keeping the
/// surrounding text (`+`, `%`, ` trophies`, ...) intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUp {
    pub prefix: String,
    /// Final value scaled by `10^decimals`, so `4.5` is stored as `45`.
    pub target: u64,
    pub suffix: String,
    /// Source text used thousands separators.
    pub grouped: bool,
    /// Digits after the decimal point in the source text.
    #[serde(default)]
    pub decimals: u32,
}

impl CountUp {
    /// Parses the first number in `text`, including a decimal fraction.
    /// Returns `None` when there is no number.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let start = text.find(|c: char| c.is_ascii_digit())?;
        let bytes = text.as_bytes();
        let is_digit_at = |i: usize| bytes.get(i).is_some_and(|n| n.is_ascii_digit());
        let mut end = start;
        let mut grouped = false;
        while end < bytes.len() {
            let b = bytes[end];
            if b.is_ascii_digit() {
                end += 1;
            } else if b == b',' && is_digit_at(end + 1) {
                grouped = true;
                end += 1;
            } else {
                break;
            }
        }
        let mut digits: String = text[start..end].chars().filter(|c| c.is_ascii_digit()).collect();

        let mut decimals = 0;
        if bytes.get(end) == Some(&b'.') && is_digit_at(end + 1) {
            end += 1;
            while is_digit_at(end) && decimals < 9 {
                digits.push(char::from(bytes[end]));
                decimals += 1;
                end += 1;
            }
        }

        let target = digits.parse::<u64>().ok()?;
        Some(Self {
            prefix: text[..start].to_string(),
            target,
            suffix: text[end..].to_string(),
            grouped,
            decimals,
        })
    }

    /// Text at `progress` in `[0, 1]` along an ease-out cubic curve.
    pub fn frame(&self, progress: f64) -> String {
        let t = progress.clamp(0.0, 1.0);
        let value = if t >= 1.0 {
            self.target
        } else {
            (self.target as f64 * ease_out_cubic(t)).round() as u64
        };
        self.render(value)
    }

    /// Renders a scaled `value` with the source text's separators and precision.
    pub fn render(&self, value: u64) -> String {
        let scale = 10u64.pow(self.decimals);
        let whole = value / scale;
        let mut number = if self.grouped { group_thousands(whole) } else { whole.to_string() };
        if self.decimals > 0 {
            let width = self.decimals as usize;
            number.push_str(&format!(".{:0width$}", value % scale));
        }
        format!("{}{}{}", self.prefix, number, self.suffix)
    }
}

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

pub fn group_thousands(value: u64) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideDirection {
    Left,
    Right,
    Up,
}

/// Cosmetic entrance effect; hosts may render any equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    FadeIn,
    StaggerFadeIn { step_ms: u64 },
    SlideIn { from: SlideDirection, step_ms: u64 },
    Spotlight { delay_ms: u64 },
    /// Calendar cells appear one by one; cells at or above `pop_min_level` get a pop.
    CalendarReveal { cell_step_ms: u64, pop_min_level: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationPlan {
    pub slide_index: usize,
    pub slide_type: String,
    pub count_up_ms: u64,
    pub count_ups: Vec<CountUp>,
    pub effects: Vec<Effect>,
}
