use chrono::{DateTime, Local};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::animal_quiz::{AnimalQuiz, GuessOutcome};
use crate::catalog::{Catalog, StepId, TestContent, TestStep};
use crate::error::{CaptureError, EntryError};
use crate::responses::{Answer, ResponseCollector, ResultRecord};
use crate::sequencer::{Advance, StepSequencer};
use crate::voice::{CaptureMessage, CaptureOutcome, StartOutcome, VoiceToggle};

/// Typed answers for one non-quiz step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepDraft {
    entries: Vec<String>,
    input: String,
    max_entries: Option<usize>,
    split_words: bool,
    time_limit: Option<f64>,
    seconds_remaining: Option<f64>,
}

impl StepDraft {
    pub fn for_content(content: &TestContent) -> Self {
        let (time_limit, split_words) = match content {
            TestContent::Fluency {
                time_limit_secs, ..
            } => (Some(*time_limit_secs as f64), true),
            _ => (None, false),
        };
        Self {
            max_entries: content.expected_entries(),
            split_words,
            time_limit,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn seconds_remaining(&self) -> Option<f64> {
        self.seconds_remaining
    }

    pub fn time_limit(&self) -> Option<f64> {
        self.time_limit
    }

    pub fn timer_started(&self) -> bool {
        self.seconds_remaining.is_some()
    }

    pub fn time_expired(&self) -> bool {
        self.seconds_remaining.is_some_and(|s| s <= 0.0)
    }

    pub fn is_full(&self) -> bool {
        self.max_entries.is_some_and(|max| self.entries.len() >= max)
    }

    fn accepts_input(&self) -> bool {
        !self.time_expired() && !self.is_full()
    }

    fn start_timer(&mut self) {
        if self.seconds_remaining.is_none() {
            self.seconds_remaining = self.time_limit;
        }
    }

    fn push_char(&mut self, c: char) {
        if self.accepts_input() {
            self.start_timer();
            self.input.push(c);
        }
    }

    fn set_input(&mut self, text: &str) {
        if self.accepts_input() {
            self.start_timer();
            self.input = text.to_string();
        }
    }

    fn commit(&mut self) -> Result<usize, EntryError> {
        if self.time_expired() {
            return Err(EntryError::TimeExpired);
        }
        if self.is_full() {
            return Err(EntryError::StepFull);
        }
        let text = self.input.trim();
        if text.is_empty() {
            return Err(EntryError::EmptyEntry);
        }

        if self.split_words {
            // One entry per comma, semicolon or line, so "sea lion" stays one animal
            self.entries.extend(
                text.split([',', ';', '\n'])
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(str::to_string),
            );
        } else {
            self.entries.push(text.to_string());
        }
        self.input.clear();
        Ok(self.entries.len())
    }

    fn on_tick(&mut self, secs: f64) {
        if let Some(remaining) = self.seconds_remaining.as_mut() {
            if *remaining > 0.0 {
                *remaining = (*remaining - secs).max(0.0);
            }
        }
    }

    fn answer(&self, content: &TestContent) -> Option<Answer> {
        let entries = self.entries.clone();
        let answer = match content {
            TestContent::Naming { .. } => Answer::Naming { names: entries },
            TestContent::Repetition { .. } => Answer::Repetition { attempts: entries },
            TestContent::Fluency { .. } => Answer::Fluency {
                words: entries,
                timed_out: self.time_expired(),
            },
            TestContent::Memory { .. } => Answer::Memory { recalled: entries },
            TestContent::Abstraction { .. } => Answer::Abstraction {
                explanations: entries,
            },
            TestContent::AnimalGuess { .. } => return None,
        };
        Some(answer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Guess(GuessOutcome),
    Recorded { count: usize },
}

/// One patient's traversal of the catalog. Owns every piece of mutable
/// screening state and is dropped when the screening ends.
#[derive(Debug)]
pub struct ScreeningSession {
    catalog: Arc<Catalog>,
    sequencer: StepSequencer,
    responses: ResponseCollector,
    quiz: Option<AnimalQuiz>,
    drafts: HashMap<StepId, StepDraft>,
    voice: VoiceToggle,
    started_at: DateTime<Local>,
    completed_at: Option<DateTime<Local>>,
}

impl ScreeningSession {
    pub fn new<R: Rng + ?Sized>(catalog: Arc<Catalog>, voice: VoiceToggle, rng: &mut R) -> Self {
        let quiz = AnimalQuiz::draw(catalog.animals(), rng);
        let drafts = catalog
            .steps()
            .iter()
            .filter(|step| !step.id.is_animal_guess())
            .filter_map(|step| {
                catalog
                    .content(&step.id)
                    .map(|content| (step.id.clone(), StepDraft::for_content(content)))
            })
            .collect();

        info!(steps = catalog.len(), "screening session started");
        Self {
            sequencer: StepSequencer::new(catalog.len()),
            catalog,
            responses: ResponseCollector::new(),
            quiz,
            drafts,
            voice,
            started_at: Local::now(),
            completed_at: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    pub fn current_index(&self) -> usize {
        self.sequencer.current()
    }

    pub fn current_step(&self) -> &TestStep {
        // The sequencer is built from the catalog length and never leaves it
        &self.catalog.steps()[self.sequencer.current()]
    }

    pub fn current_content(&self) -> Option<&TestContent> {
        self.catalog.content(&self.current_step().id)
    }

    pub fn on_animal_step(&self) -> bool {
        self.current_step().id.is_animal_guess()
    }

    pub fn quiz(&self) -> Option<&AnimalQuiz> {
        self.quiz.as_ref()
    }

    pub fn draft(&self, step: &StepId) -> Option<&StepDraft> {
        self.drafts.get(step)
    }

    pub fn current_draft(&self) -> Option<&StepDraft> {
        self.drafts.get(&self.current_step().id)
    }

    pub fn responses(&self) -> &ResponseCollector {
        &self.responses
    }

    pub fn is_recording(&self) -> bool {
        self.voice.is_recording()
    }

    pub fn voice(&self) -> &VoiceToggle {
        &self.voice
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Text currently being typed on the active step
    pub fn input(&self) -> &str {
        if self.on_animal_step() {
            self.quiz.as_ref().map(|q| q.input()).unwrap_or("")
        } else {
            self.current_draft().map(|d| d.input()).unwrap_or("")
        }
    }

    pub fn push_char(&mut self, c: char) {
        if self.on_animal_step() {
            if let Some(quiz) = self.quiz.as_mut() {
                quiz.push_char(c);
            }
        } else if let Some(draft) = self.current_draft_mut() {
            draft.push_char(c);
        }
    }

    pub fn pop_char(&mut self) {
        if self.on_animal_step() {
            if let Some(quiz) = self.quiz.as_mut() {
                quiz.pop_char();
            }
        } else if let Some(draft) = self.current_draft_mut() {
            draft.input.pop();
        }
    }

    pub fn set_input(&mut self, text: &str) {
        if self.on_animal_step() {
            if let Some(quiz) = self.quiz.as_mut() {
                quiz.set_input(text);
            }
        } else if let Some(draft) = self.current_draft_mut() {
            draft.set_input(text);
        }
    }

    /// Submits the input line of the active step
    pub fn commit_entry(&mut self) -> Result<EntryOutcome, EntryError> {
        if self.voice.is_recording() {
            return Err(EntryError::Recording);
        }

        if self.on_animal_step() {
            let quiz = self.quiz.as_mut().ok_or(EntryError::NoInput)?;
            return Ok(EntryOutcome::Guess(quiz.submit_guess()?));
        }

        let step = self.current_step().id.clone();
        let draft = self.drafts.get_mut(&step).ok_or(EntryError::NoInput)?;
        let count = draft.commit()?;
        debug!(%step, count, "entry recorded");
        Ok(EntryOutcome::Recorded { count })
    }

    /// Records the active step's answer and moves on. On the last step the
    /// flow completes instead and the index stays where it is.
    pub fn advance(&mut self) -> Result<Advance, EntryError> {
        if self.voice.is_recording() {
            return Err(EntryError::Recording);
        }

        let step = self.current_step().id.clone();
        if step.is_animal_guess() {
            if let Some(quiz) = self.quiz.as_mut() {
                self.responses.record_response(step.clone(), quiz.answer());
                quiz.reset_index();
            }
        } else if let (Some(draft), Some(content)) =
            (self.drafts.get(&step), self.catalog.content(&step))
        {
            if let Some(answer) = draft.answer(content) {
                self.responses.record_response(step.clone(), answer);
            }
        }

        let advance = self.sequencer.advance();
        match advance {
            Advance::Moved(index) => {
                info!(from = %step, to = %self.current_step().id, index, "step advanced")
            }
            Advance::Complete(route) => {
                self.completed_at = Some(Local::now());
                info!(?route, responses = self.responses.len(), "screening complete");
            }
        }
        Ok(advance)
    }

    pub fn retreat(&mut self) -> Result<(), EntryError> {
        if self.voice.is_recording() {
            return Err(EntryError::Recording);
        }
        self.sequencer.retreat();
        debug!(index = self.sequencer.current(), "step retreated");
        Ok(())
    }

    pub fn start_voice_capture(&mut self) -> Result<StartOutcome, CaptureError> {
        self.voice.start()
    }

    /// Feeds a backend message to the voice toggle; a transcript replaces
    /// the active input line.
    pub fn on_capture(&mut self, msg: CaptureMessage) -> Option<CaptureOutcome> {
        let outcome = self.voice.on_message(msg)?;
        if let CaptureOutcome::Transcript(text) = &outcome {
            self.set_input(text);
        }
        Some(outcome)
    }

    pub fn on_tick(&mut self, dt: Duration) -> Option<CaptureOutcome> {
        if let Some(draft) = self.current_draft_mut() {
            draft.on_tick(dt.as_secs_f64());
        }
        self.voice.on_tick(dt)
    }

    pub fn result_record(&self) -> ResultRecord {
        ResultRecord::new(self.started_at, self.completed_at, &self.responses)
    }

    fn current_draft_mut(&mut self) -> Option<&mut StepDraft> {
        let id = &self.catalog.steps()[self.sequencer.current()].id;
        self.drafts.get_mut(id)
    }
}
