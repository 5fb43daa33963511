/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Riddles guarding the keys.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TrackerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Riddle {
    pub id: u32,
    pub text: String,
    pub answers: Vec<Answer>,
}

impl Riddle {
    fn new(id: u32, text: &str, answers: &[(&str, bool)]) -> Self {
        Self {
            id,
            text: text.to_string(),
            answers: answers
                .iter()
                .map(|&(text, correct)| Answer {
                    text: text.to_string(),
                    correct,
                })
                .collect(),
        }
    }

    pub fn is_correct(&self, index: usize) -> Result<bool, TrackerError> {
        self.answers
            .get(index)
            .map(|a| a.correct)
            .ok_or(TrackerError::UnknownAnswer {
                riddle_id: self.id,
                index,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiddleBook {
    riddles: Vec<Riddle>,
}

impl Default for RiddleBook {
    fn default() -> Self {
        Self {
            riddles: vec![
                Riddle::new(
                    1,
                    "What has keys but can't open locks?",
                    &[("A piano", true), ("A computer", false), ("A treasure chest", false)],
                ),
                Riddle::new(
                    2,
                    "I'm light as a feather, but the strongest person can't hold me for more than a few minutes. What am I?",
                    &[("Breath", true), ("A thought", false), ("A feather", false)],
                ),
                Riddle::new(
                    3,
                    "What goes up but never comes down?",
                    &[("Age", true), ("A balloon", false), ("Temperature", false)],
                ),
            ],
        }
    }
}

impl RiddleBook {
    pub fn new(riddles: Vec<Riddle>) -> Self {
        Self { riddles }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TrackerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load riddles from `path`, falling back to the built-in set.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::from_json_file(path.as_ref()) {
            Ok(book) if !book.is_empty() => book,
            Ok(_) => {
                warn!("{} has no riddles, using defaults", path.as_ref().display());
                Self::default()
            }
            Err(e) => {
                warn!("could not load riddles, using defaults: {e}");
                Self::default()
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&Riddle> {
        self.riddles.iter().find(|r| r.id == id)
    }

    /// Riddle id for the `n`th key, cycling through the book.
    pub fn id_for_position(&self, n: usize) -> u32 {
        if self.riddles.is_empty() {
            n as u32 + 1
        } else {
            self.riddles[n % self.riddles.len()].id
        }
    }

    pub fn len(&self) -> usize {
        self.riddles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riddles.is_empty()
    }
}
