use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::catalog::{AnimalCard, QUIZ_ITEMS};
use crate::error::SubmitError;
use crate::responses::Answer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    AwaitingInput(usize),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessOutcome {
    pub item: usize,
    pub correct: bool,
    pub score: u8,
}

/// Three-picture animal naming quiz with its own cursor, input line and score
#[derive(Debug, Clone)]
pub struct AnimalQuiz {
    items: [AnimalCard; QUIZ_ITEMS],
    current: usize,
    guesses: [String; QUIZ_ITEMS],
    marks: [bool; QUIZ_ITEMS],
    input: String,
    score: u8,
}

impl AnimalQuiz {
    /// Draws three distinct animals from `pool` with an unbiased shuffle.
    /// Returns None when the pool is too small.
    pub fn draw<R: Rng + ?Sized>(pool: &[AnimalCard], rng: &mut R) -> Option<Self> {
        if pool.len() < QUIZ_ITEMS {
            return None;
        }
        let mut shuffled = pool.to_vec();
        shuffled.shuffle(rng);
        shuffled.truncate(QUIZ_ITEMS);
        let items: [AnimalCard; QUIZ_ITEMS] = shuffled.try_into().ok()?;
        Some(Self::with_items(items))
    }

    pub fn with_items(items: [AnimalCard; QUIZ_ITEMS]) -> Self {
        Self {
            items,
            current: 0,
            guesses: Default::default(),
            marks: [false; QUIZ_ITEMS],
            input: String::new(),
            score: 0,
        }
    }

    pub fn state(&self) -> QuizState {
        if self.current >= QUIZ_ITEMS {
            QuizState::Done
        } else {
            QuizState::AwaitingInput(self.current)
        }
    }

    pub fn is_done(&self) -> bool {
        self.state() == QuizState::Done
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_item(&self) -> Option<&AnimalCard> {
        self.items.get(self.current)
    }

    pub fn items(&self) -> &[AnimalCard; QUIZ_ITEMS] {
        &self.items
    }

    pub fn guesses(&self) -> &[String; QUIZ_ITEMS] {
        &self.guesses
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn can_submit(&self) -> bool {
        !self.input.is_empty() && !self.is_done()
    }

    /// Replaces the input line; ignored once every animal has been answered
    pub fn set_input(&mut self, text: &str) {
        if !self.is_done() {
            self.input = text.to_string();
        }
    }

    pub fn push_char(&mut self, c: char) {
        if !self.is_done() {
            self.input.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// Scores the input line against the current animal and moves on.
    pub fn submit_guess(&mut self) -> Result<GuessOutcome, SubmitError> {
        let item = match self.state() {
            QuizState::Done => return Err(SubmitError::QuizComplete),
            QuizState::AwaitingInput(i) => i,
        };
        if self.input.is_empty() {
            return Err(SubmitError::EmptySubmission);
        }

        let raw = std::mem::take(&mut self.input);
        let correct = normalize(&raw) == normalize(&self.items[item].name);
        // A revisit re-marks the item instead of scoring it twice
        self.marks[item] = correct;
        self.score = self.marks.iter().filter(|m| **m).count() as u8;
        debug!(item, guess = %raw, correct, "animal guess submitted");
        self.guesses[item] = raw;
        self.current += 1;

        Ok(GuessOutcome {
            item,
            correct,
            score: self.score,
        })
    }

    /// Rewinds the cursor for a later visit; score and guesses are kept.
    pub fn reset_index(&mut self) {
        self.current = 0;
        self.input.clear();
    }

    pub fn answer(&self) -> Answer {
        Answer::AnimalGuess {
            score: self.score,
            guesses: self.guesses.clone(),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::standard_animals;
    use assert_matches::assert_matches;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::{HashMap, HashSet};

    fn quiz(names: [&str; 3]) -> AnimalQuiz {
        AnimalQuiz::with_items(names.map(|n| AnimalCard::new(&format!("{n}.jpg"), n)))
    }

    #[test]
    fn starts_awaiting_first_item() {
        let q = quiz(["Lion", "Zebra", "Duck"]);
        assert_eq!(q.state(), QuizState::AwaitingInput(0));
        assert_eq!(q.score(), 0);
        assert!(q.guesses().iter().all(|g| g.is_empty()));
        assert!(!q.can_submit());
    }

    #[test]
    fn padded_mixed_case_guess_is_correct_and_stored_raw() {
        let mut q = quiz(["Lion", "Zebra", "Duck"]);
        q.set_input(" lion ");
        let outcome = q.submit_guess().unwrap();

        assert!(outcome.correct);
        assert_eq!(q.score(), 1);
        assert_eq!(q.guesses()[0], " lion ");
        assert_eq!(q.input(), "");
        assert_eq!(q.state(), QuizState::AwaitingInput(1));
    }

    #[test]
    fn wrong_guess_leaves_score_unchanged() {
        let mut q = quiz(["Lion", "Zebra", "Duck"]);
        q.set_input("Lion");
        q.submit_guess().unwrap();
        q.set_input("Tiger");
        let outcome = q.submit_guess().unwrap();

        assert!(!outcome.correct);
        assert_eq!(q.score(), 1);
        assert_eq!(q.guesses()[1], "Tiger");
    }

    #[test]
    fn empty_submission_is_rejected_without_state_change() {
        let mut q = quiz(["Lion", "Zebra", "Duck"]);
        assert_matches!(q.submit_guess(), Err(SubmitError::EmptySubmission));
        assert_eq!(q.state(), QuizState::AwaitingInput(0));
    }

    #[test]
    fn whitespace_only_is_submittable_but_wrong() {
        let mut q = quiz(["Lion", "Zebra", "Duck"]);
        q.set_input("  ");
        let outcome = q.submit_guess().unwrap();
        assert!(!outcome.correct);
        assert_eq!(q.guesses()[0], "  ");
    }

    #[test]
    fn fourth_submission_is_rejected() {
        let mut q = quiz(["Lion", "Zebra", "Duck"]);
        for guess in ["lion", "ZEBRA", "goose"] {
            q.set_input(guess);
            q.submit_guess().unwrap();
        }
        assert_eq!(q.state(), QuizState::Done);
        assert_eq!(q.score(), 2);

        q.set_input("duck");
        assert_eq!(q.input(), "");
        q.push_char('d');
        assert_matches!(q.submit_guess(), Err(SubmitError::QuizComplete));
        assert_eq!(q.score(), 2);
        assert!(q.current_item().is_none());
    }

    #[test]
    fn reset_index_keeps_score_and_guesses() {
        let mut q = quiz(["Lion", "Zebra", "Duck"]);
        for guess in ["Lion", "Zebra", "Duck"] {
            q.set_input(guess);
            q.submit_guess().unwrap();
        }
        q.reset_index();
        assert_eq!(q.state(), QuizState::AwaitingInput(0));
        assert_eq!(q.score(), 3);
        assert_eq!(q.guesses()[2], "Duck");
        assert_eq!(
            q.answer(),
            Answer::AnimalGuess {
                score: 3,
                guesses: ["Lion".into(), "Zebra".into(), "Duck".into()],
            }
        );
    }

    #[test]
    fn revisit_remarks_items_and_score_stays_bounded() {
        let mut q = quiz(["Lion", "Zebra", "Duck"]);
        for guess in ["Lion", "Zebra", "Duck"] {
            q.set_input(guess);
            q.submit_guess().unwrap();
        }
        q.reset_index();

        q.set_input("lion");
        q.submit_guess().unwrap();
        assert_eq!(q.score(), 3);

        q.set_input("horse");
        q.submit_guess().unwrap();
        assert_eq!(q.score(), 2);
        assert_eq!(q.guesses()[1], "horse");
        assert_eq!(q.guesses()[2], "Duck");
    }

    #[test]
    fn draw_picks_three_distinct_animals() {
        let pool = standard_animals();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let q = AnimalQuiz::draw(&pool, &mut rng).unwrap();
            let names: HashSet<&str> = q.items().iter().map(|a| a.name.as_str()).collect();
            assert_eq!(names.len(), 3);
            assert!(q.items().iter().all(|a| pool.contains(a)));
        }
    }

    #[test]
    fn draw_requires_three_animals() {
        let pool = vec![AnimalCard::new("a", "Cat"), AnimalCard::new("b", "Dog")];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(AnimalQuiz::draw(&pool, &mut rng).is_none());
    }

    #[test]
    fn draw_reaches_every_animal_in_first_slot() {
        let pool = standard_animals();
        let mut rng = StdRng::seed_from_u64(3);
        let mut firsts: HashMap<String, usize> = HashMap::new();
        for _ in 0..4000 {
            let q = AnimalQuiz::draw(&pool, &mut rng).unwrap();
            *firsts.entry(q.items()[0].name.clone()).or_insert(0) += 1;
        }
        assert_eq!(firsts.len(), pool.len());
        // ~182 expected per animal
        assert!(firsts.values().all(|&n| n > 100 && n < 280));
    }
}
