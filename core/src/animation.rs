use recap_common::animation::SlideDirection;
use recap_common::{AnimationPlan, CountUp, Effect};

pub const COUNT_UP_ATTR: &str = "data-count-up";

/// Builds one-time entrance animation plans. Does nothing at all when reduced
/// motion was requested.
#[derive(Debug, Clone)]
pub struct AnimationTrigger {
    reduced_motion: bool,
    count_up_ms: u64,
}

impl AnimationTrigger {
    pub fn new(reduced_motion: bool, count_up_ms: u64) -> Self {
        Self { reduced_motion, count_up_ms }
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    pub fn trigger(&self, slide_index: usize, slide_type: &str, html: &str) -> Option<AnimationPlan> {
        if self.reduced_motion {
            return None;
        }
        Some(AnimationPlan {
            slide_index,
            slide_type: slide_type.to_string(),
            count_up_ms: self.count_up_ms,
            count_ups: count_up_targets(html),
            effects: effects_for(slide_type),
        })
    }
}

/// Entrance effects per slide type.
pub fn effects_for(slide_type: &str) -> Vec<Effect> {
    match slide_type {
        "intro" | "summary" => vec![Effect::StaggerFadeIn { step_ms: 150 }],
        "total_trophies" | "platinums" | "rarest_trophy" => {
            vec![Effect::FadeIn, Effect::Spotlight { delay_ms: 400 }]
        }
        "activity_calendar" | "most_active_day" => vec![
            Effect::FadeIn,
            Effect::CalendarReveal { cell_step_ms: 20, pop_min_level: 4 },
        ],
        "games" | "badges" | "genres" => vec![Effect::SlideIn { from: SlideDirection::Left, step_ms: 100 }],
        "streak" | "time_analysis" | "comparison" => {
            vec![Effect::SlideIn { from: SlideDirection::Up, step_ms: 120 }]
        }
        t if t.starts_with("quiz_") => vec![Effect::StaggerFadeIn { step_ms: 80 }],
        _ => vec![Effect::FadeIn],
    }
}

/// Text of every element carrying the count-up attribute, in document order.
pub fn count_up_targets(html: &str) -> Vec<CountUp> {
    let mut targets = Vec::new();
    let mut rest = html;
    while let Some(pos) = rest.find(COUNT_UP_ATTR) {
        let after = &rest[pos + COUNT_UP_ATTR.len()..];
        let Some(open_end) = after.find('>') else {
            break;
        };
        let body = &after[open_end + 1..];
        let text = &body[..body.find('<').unwrap_or(body.len())];
        if let Some(count_up) = CountUp::parse(text) {
            targets.push(count_up);
        }
        rest = body;
    }
    targets
}
