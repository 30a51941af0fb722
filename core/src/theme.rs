use std::collections::BTreeMap;

use recap_common::{ThemeStyle, DEFAULT_THEME_KEY};
use recap_protocol::Event;

/// Share cards render at a fixed 1200x630.
pub const CARD_WIDTH: f64 = 1200.0;
pub const CARD_HEIGHT: f64 = 630.0;

/// Gradient theme table. Always holds a `default` entry.
#[derive(Debug, Clone)]
pub struct ThemeTable {
    themes: BTreeMap<String, ThemeStyle>,
    degraded: bool,
}

impl Default for ThemeTable {
    fn default() -> Self {
        Self::fallback_only()
    }
}

impl ThemeTable {
    /// Only the hardcoded default theme.
    pub fn fallback_only() -> Self {
        let mut themes = BTreeMap::new();
        themes.insert(DEFAULT_THEME_KEY.to_string(), ThemeStyle::fallback());
        Self { themes, degraded: true }
    }

    /// An empty table silently degrades to the fallback theme.
    pub fn from_map(mut themes: BTreeMap<String, ThemeStyle>) -> Self {
        if themes.is_empty() {
            tracing::debug!("no gradient themes supplied, using the default theme only");
            return Self::fallback_only();
        }
        themes
            .entry(DEFAULT_THEME_KEY.to_string())
            .or_insert_with(ThemeStyle::fallback);
        Self { themes, degraded: false }
    }

    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<BTreeMap<String, ThemeStyle>>(text) {
            Ok(themes) => Self::from_map(themes),
            Err(e) => {
                tracing::warn!("ignoring malformed theme table: {e}");
                Self::fallback_only()
            }
        }
    }

    /// First non-empty table wins.
    pub fn first_available(sources: impl IntoIterator<Item = BTreeMap<String, ThemeStyle>>) -> Self {
        sources
            .into_iter()
            .find(|themes| !themes.is_empty())
            .map(Self::from_map)
            .unwrap_or_else(Self::fallback_only)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.themes.contains_key(key)
    }

    /// Key as it should appear in UI controls; unknown keys become `default`.
    pub fn sync_key<'a>(&self, key: &'a str) -> &'a str {
        if self.contains(key) {
            key
        } else {
            DEFAULT_THEME_KEY
        }
    }

    pub fn resolve(&self, key: &str) -> &ThemeStyle {
        self.themes.get(self.sync_key(key)).unwrap_or_else(|| fallback_style())
    }

    /// Keys with `default` first, the rest in name order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = vec![DEFAULT_THEME_KEY];
        keys.extend(self.themes.keys().map(String::as_str).filter(|k| *k != DEFAULT_THEME_KEY));
        keys
    }

    pub fn next_key(&self, current: &str) -> &str {
        let keys = self.keys();
        let pos = keys.iter().position(|k| *k == current).unwrap_or(0);
        keys[(pos + 1) % keys.len()]
    }
}

fn fallback_style() -> &'static ThemeStyle {
    static FALLBACK: std::sync::OnceLock<ThemeStyle> = std::sync::OnceLock::new();
    FALLBACK.get_or_init(ThemeStyle::fallback)
}

/// Aspect-preserving scale that fits the card inside the container.
pub fn fit_scale(container_width: f64, container_height: f64) -> f64 {
    if container_width <= 0.0 {
        return 1.0;
    }
    let by_width = container_width / CARD_WIDTH;
    if container_height <= 0.0 {
        return by_width;
    }
    by_width.min(container_height / CARD_HEIGHT)
}

/// Applies the selected theme to the share-card preview.
#[derive(Debug, Clone)]
pub struct PreviewCoordinator {
    table: ThemeTable,
    current: String,
    scale: f64,
}

impl PreviewCoordinator {
    pub fn new(table: ThemeTable) -> Self {
        Self {
            table,
            current: DEFAULT_THEME_KEY.to_string(),
            scale: 1.0,
        }
    }

    pub fn table(&self) -> &ThemeTable {
        &self.table
    }

    pub fn current_key(&self) -> &str {
        &self.current
    }

    pub fn current_style(&self) -> &ThemeStyle {
        self.table.resolve(&self.current)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn select(&mut self, key: &str) -> Event {
        self.current = self.table.sync_key(key).to_string();
        self.styled()
    }

    /// Current styling as an event, for the first render of the panel.
    pub fn styled(&self) -> Event {
        Event::PreviewStyled {
            key: self.current.clone(),
            style: self.current_style().clone(),
            scale: self.scale,
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) -> Event {
        self.scale = fit_scale(width, height);
        Event::PreviewScaled { scale: self.scale }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(name: &str) -> ThemeStyle {
        ThemeStyle {
            name: name.to_string(),
            background: format!("linear-gradient({name})"),
            banner_background: None,
            accent_color: None,
        }
    }

    fn table() -> ThemeTable {
        let mut map = BTreeMap::new();
        map.insert("ocean".to_string(), style("ocean"));
        map.insert("sunset".to_string(), style("sunset"));
        ThemeTable::from_map(map)
    }

    #[test]
    fn empty_table_degrades_to_default() {
        let table = ThemeTable::from_map(BTreeMap::new());
        assert!(table.is_degraded());
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("anything"), &ThemeStyle::fallback());
        assert!(ThemeTable::from_json("not json").is_degraded());
    }

    #[test]
    fn unknown_keys_sync_to_default() {
        let table = table();
        assert_eq!(table.sync_key("ocean"), "ocean");
        assert_eq!(table.sync_key("lava"), "default");
        assert_eq!(table.keys(), vec!["default", "ocean", "sunset"]);
        assert_eq!(table.next_key("sunset"), "default");
    }

    #[test]
    fn reselecting_a_theme_resolves_the_same_style() {
        let mut preview = PreviewCoordinator::new(table());
        let first = preview.select("ocean");
        preview.select("sunset");
        let again = preview.select("ocean");
        assert_eq!(first, again);
        assert_eq!(preview.current_style().name, "ocean");
    }

    #[test]
    fn scale_preserves_aspect_ratio() {
        assert_eq!(fit_scale(600.0, 1000.0), 0.5);
        assert_eq!(fit_scale(1200.0, 315.0), 0.5);
        assert_eq!(fit_scale(2400.0, 0.0), 2.0);
        let mut preview = PreviewCoordinator::new(ThemeTable::default());
        assert_eq!(preview.resize(300.0, 630.0), Event::PreviewScaled { scale: 0.25 });
    }

    #[test]
    fn first_available_skips_empty_sources() {
        let mut map = BTreeMap::new();
        map.insert("ocean".to_string(), style("ocean"));
        let table = ThemeTable::first_available([BTreeMap::new(), map]);
        assert!(table.contains("ocean"));
        assert!(!table.is_degraded());
    }
}
