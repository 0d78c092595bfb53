use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::catalog::{StepId, QUIZ_ITEMS};

/// Captured answer for one step, shaped by the kind of step it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    AnimalGuess {
        score: u8,
        guesses: [String; QUIZ_ITEMS],
    },
    Naming {
        names: Vec<String>,
    },
    Repetition {
        attempts: Vec<String>,
    },
    Fluency {
        words: Vec<String>,
        timed_out: bool,
    },
    Memory {
        recalled: Vec<String>,
    },
    Abstraction {
        explanations: Vec<String>,
    },
}

impl Answer {
    /// One-line description for the results screen
    pub fn summary(&self) -> String {
        match self {
            Answer::AnimalGuess { score, guesses } => {
                format!("{score}/{QUIZ_ITEMS} correct ({})", guesses.join(", "))
            }
            Answer::Naming { names } => format!("named: {}", names.join(", ")),
            Answer::Repetition { attempts } => {
                format!("{} sentence(s) repeated", attempts.len())
            }
            Answer::Fluency { words, timed_out } => format!(
                "{} word(s){}",
                words.len(),
                if *timed_out { " before time ran out" } else { "" }
            ),
            Answer::Memory { recalled } => format!("recalled: {}", recalled.join(", ")),
            Answer::Abstraction { explanations } => {
                format!("{} pair(s) explained", explanations.len())
            }
        }
    }
}

/// Accumulates the answers of one session, one entry per step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseCollector {
    responses: BTreeMap<StepId, Answer>,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the answer for `step`; other entries are kept.
    pub fn record_response(&mut self, step: StepId, answer: Answer) {
        self.responses.insert(step, answer);
    }

    pub fn get(&self, step: &StepId) -> Option<&Answer> {
        self.responses.get(step)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StepId, &Answer)> {
        self.responses.iter()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Snapshot of a session handed to the results view and to `--export`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub started_at: DateTime<Local>,
    pub completed_at: Option<DateTime<Local>>,
    pub responses: BTreeMap<StepId, Answer>,
}

impl ResultRecord {
    pub fn new(
        started_at: DateTime<Local>,
        completed_at: Option<DateTime<Local>>,
        collector: &ResponseCollector,
    ) -> Self {
        Self {
            started_at,
            completed_at,
            responses: collector.responses.clone(),
        }
    }

    pub fn animal_score(&self) -> Option<u8> {
        self.responses.values().find_map(|a| match a {
            Answer::AnimalGuess { score, .. } => Some(*score),
            _ => None,
        })
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)
    }
}
