// src/studio/mod.rs

//! Content studio: turns uploaded study material into a summary, cloze
//! flashcards and a multiple-choice quiz.

pub mod generator;

pub use generator::{ContentGenerator, GeneratedCard, GeneratedQuestion, GenerationError, LocalGenerator, StudyContent};
