use serde::{Deserialize, Serialize};

pub const DEFAULT_THEME_KEY: &str = "default";

/// One entry of the gradient theme table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeStyle {
    pub name: String,
    pub background: String,
    #[serde(default)]
    pub banner_background: Option<String>,
    #[serde(default)]
    pub accent_color: Option<String>,
}

impl ThemeStyle {
    pub fn fallback() -> Self {
        Self {
            name: "Default".to_string(),
            background: "linear-gradient(135deg, #1a1a2e 0%, #16213e 50%, #0f3460 100%)".to_string(),
            banner_background: None,
            accent_color: Some("#67d1f8".to_string()),
        }
    }

    /// Banner background for the card header, falling back to the card background.
    pub fn header_background(&self) -> &str {
        self.banner_background.as_deref().unwrap_or(&self.background)
    }
}
