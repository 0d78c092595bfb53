use thiserror::Error;

use crate::catalog::StepId;

/// Problems loading or validating a screening catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog defines no steps")]
    NoSteps,
    #[error("step id `{0}` appears more than once")]
    DuplicateStep(StepId),
    #[error("step `{0}` has no content")]
    MissingContent(StepId),
    #[error("animal catalog has {found} entries, at least {needed} are required")]
    TooFewAnimals { found: usize, needed: usize },
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Voice capture outcomes that end a capture without a transcript.
/// None of these are fatal; the patient may simply try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("speech recognition is not supported here")]
    Unavailable,
    #[error("voice recognition error: {0}")]
    Failed(String),
    #[error("voice capture timed out")]
    TimedOut,
}

/// Rejected animal-guess submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("nothing to submit")]
    EmptySubmission,
    #[error("all animals have been answered")]
    QuizComplete,
}

/// Rejected entries and navigation on the active step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("nothing to submit")]
    EmptyEntry,
    #[error("time is up for this test")]
    TimeExpired,
    #[error("all answers for this test are recorded")]
    StepFull,
    #[error("this step takes no typed answers")]
    NoInput,
    #[error("wait for the recording to finish")]
    Recording,
    #[error(transparent)]
    Guess(#[from] SubmitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            CaptureError::Unavailable.to_string(),
            "speech recognition is not supported here"
        );
        assert_eq!(
            CaptureError::Failed("no-speech".into()).to_string(),
            "voice recognition error: no-speech"
        );
        assert_eq!(
            EntryError::from(SubmitError::EmptySubmission).to_string(),
            "nothing to submit"
        );
    }
}
