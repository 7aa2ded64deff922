//! Core library functions for moodlist

pub mod normalizer;

pub use normalizer::Normalizer;
