//! Terminal front end for a recap session.

pub mod app;
pub mod interactive;
pub mod preview;

pub use interactive::run_viewer;
