/// Where the flow hands control once the last step is passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    Complete(Route),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Current,
    Upcoming,
}

/// Clamped cursor over an ordered list of steps
#[derive(Debug, Clone)]
pub struct StepSequencer {
    current: usize,
    len: usize,
}

impl StepSequencer {
    /// `len` is clamped to at least one step
    pub fn new(len: usize) -> Self {
        Self {
            current: 0,
            len: len.max(1),
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.len
    }

    /// Moves one step forward, or reports completion without moving when
    /// already on the last step.
    pub fn advance(&mut self) -> Advance {
        if self.is_last() {
            return Advance::Complete(Route::Results);
        }
        self.current += 1;
        Advance::Moved(self.current)
    }

    pub fn retreat(&mut self) {
        if self.current > 0 {
            self.current -= 1;
        }
    }

    pub fn step_status(&self, index: usize) -> StepStatus {
        match index.cmp(&self.current) {
            std::cmp::Ordering::Less => StepStatus::Completed,
            std::cmp::Ordering::Equal => StepStatus::Current,
            std::cmp::Ordering::Greater => StepStatus::Upcoming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn advance_moves_forward() {
        let mut seq = StepSequencer::new(3);
        assert_eq!(seq.advance(), Advance::Moved(1));
        assert_eq!(seq.advance(), Advance::Moved(2));
        assert!(seq.is_last());
    }

    #[test]
    fn advance_at_last_completes_without_moving() {
        let mut seq = StepSequencer::new(2);
        seq.advance();
        assert_eq!(seq.advance(), Advance::Complete(Route::Results));
        assert_eq!(seq.current(), 1);
        assert_eq!(seq.advance(), Advance::Complete(Route::Results));
        assert_eq!(seq.current(), 1);
    }

    #[test]
    fn retreat_at_first_is_noop() {
        let mut seq = StepSequencer::new(3);
        seq.retreat();
        assert_eq!(seq.current(), 0);
        seq.advance();
        seq.retreat();
        assert_eq!(seq.current(), 0);
    }

    #[test]
    fn single_step_flow_completes_immediately() {
        let mut seq = StepSequencer::new(1);
        assert!(seq.is_first() && seq.is_last());
        assert_eq!(seq.advance(), Advance::Complete(Route::Results));
    }

    #[test]
    fn random_walk_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 1..6 {
            let mut seq = StepSequencer::new(len);
            let mut completions = 0;
            for _ in 0..500 {
                if rng.gen_bool(0.5) {
                    let was = seq.current();
                    if let Advance::Complete(_) = seq.advance() {
                        completions += 1;
                        assert_eq!(seq.current(), was);
                    }
                } else {
                    seq.retreat();
                }
                assert!(seq.current() < len);
            }
            assert!(completions > 0 || len > 1);
        }
    }

    #[test]
    fn step_status_relative_to_cursor() {
        let mut seq = StepSequencer::new(3);
        seq.advance();
        assert_eq!(seq.step_status(0), StepStatus::Completed);
        assert_eq!(seq.step_status(1), StepStatus::Current);
        assert_eq!(seq.step_status(2), StepStatus::Upcoming);
    }
}
