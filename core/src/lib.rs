//! Monthly recap engine: slide sequencing, quizzes, animation triggers and the
//! share-card flow. Hosts drive it through `RecapSession`.

pub mod analytics;
pub mod animation;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod input;
pub mod presentation;
pub mod quiz;
pub mod services;
pub mod session;
pub mod share;
pub mod theme;

pub use client::{HttpAdapter, RecapApi, StubClient};
pub use config::Config;
pub use error::{RecapError, Result};
pub use presentation::Presentation;
pub use services::{LogToaster, Services, Toaster};
pub use session::RecapSession;
pub use share::{CardDataSource, ChallengeCard, NotificationCard, RecapCard, ShareOrchestrator};
pub use theme::ThemeTable;
