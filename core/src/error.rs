use thiserror::Error;

use recap_api::ApiError;

#[derive(Error, Debug)]
pub enum RecapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("recap has no slides")]
    NoSlides,

    #[error("Channel send error")]
    ChannelSend,
}

pub type Result<T> = std::result::Result<T, RecapError>;
