//! Configuration module for moodlist

mod settings;

pub use settings::{Backend, Settings};
