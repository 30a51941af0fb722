use recap_protocol::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    ArrowLeft,
    ArrowRight,
}

impl NavKey {
    pub fn op(self) -> Op {
        match self {
            NavKey::ArrowLeft => Op::Prev,
            NavKey::ArrowRight => Op::Next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    /// Swiping left reveals the next slide.
    pub fn op(self) -> Op {
        match self {
            SwipeDirection::Left => Op::Next,
            SwipeDirection::Right => Op::Prev,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeThresholds {
    pub min_distance: f64,
    pub max_vertical: f64,
}

impl Default for SwipeThresholds {
    fn default() -> Self {
        Self { min_distance: 50.0, max_vertical: 100.0 }
    }
}

/// Turns a press/release pair into a horizontal swipe.
#[derive(Debug, Clone, Default)]
pub struct SwipeTracker {
    thresholds: SwipeThresholds,
    start: Option<(f64, f64)>,
}

impl SwipeTracker {
    pub fn new(thresholds: SwipeThresholds) -> Self {
        Self { thresholds, start: None }
    }

    pub fn begin(&mut self, x: f64, y: f64) {
        self.start = Some((x, y));
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }

    pub fn end(&mut self, x: f64, y: f64) -> Option<SwipeDirection> {
        let (sx, sy) = self.start.take()?;
        let dx = x - sx;
        let dy = (y - sy).abs();
        if dx.abs() < self.thresholds.min_distance || dy > self.thresholds.max_vertical || dx.abs() <= dy {
            return None;
        }
        Some(if dx < 0.0 { SwipeDirection::Left } else { SwipeDirection::Right })
    }
}
