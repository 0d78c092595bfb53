use chrono::NaiveDate;

use crate::catalog::QUIZ_ITEMS;
use crate::responses::ResultRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct StatCard {
    pub title: String,
    pub value: String,
    pub description: String,
    /// Percent change versus last period
    pub trend: Option<(u32, bool)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyProgress {
    pub month: &'static str,
    pub score: f64,
    pub tests: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechMetric {
    pub name: &'static str,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PatientStatus {
    #[strum(serialize = "normal")]
    Normal,
    #[strum(serialize = "concern")]
    Concern,
    #[strum(serialize = "flagged")]
    Flagged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientSummary {
    pub id: u32,
    pub name: &'static str,
    pub age: u32,
    pub last_test: Option<NaiveDate>,
    pub score: u32,
    pub status: PatientStatus,
}

/// Clinician overview. Everything here is sample data apart from the
/// optional card describing the screening just completed on this machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub cards: Vec<StatCard>,
    pub progress: Vec<MonthlyProgress>,
    pub speech_metrics: Vec<SpeechMetric>,
    pub recent_patients: Vec<PatientSummary>,
}

impl Dashboard {
    pub fn sample() -> Self {
        let card = |title: &str, value: &str, description: &str, trend: (u32, bool)| StatCard {
            title: title.into(),
            value: value.into(),
            description: description.into(),
            trend: Some(trend),
        };

        Self {
            cards: vec![
                card("Total Patients", "1,247", "Active in system", (12, true)),
                card("Tests Completed", "3,891", "This month", (8, true)),
                card("Flagged Cases", "23", "Requiring attention", (5, false)),
                card("Avg. Score", "78.4", "Cognitive assessment", (2, false)),
            ],
            progress: vec![
                MonthlyProgress { month: "Jan", score: 85.0, tests: 12 },
                MonthlyProgress { month: "Feb", score: 82.0, tests: 15 },
                MonthlyProgress { month: "Mar", score: 79.0, tests: 18 },
                MonthlyProgress { month: "Apr", score: 83.0, tests: 14 },
                MonthlyProgress { month: "May", score: 80.0, tests: 16 },
                MonthlyProgress { month: "Jun", score: 78.0, tests: 20 },
            ],
            speech_metrics: vec![
                SpeechMetric { name: "Fluency", value: 75 },
                SpeechMetric { name: "Clarity", value: 82 },
                SpeechMetric { name: "Vocabulary", value: 68 },
                SpeechMetric { name: "Processing", value: 71 },
            ],
            recent_patients: vec![
                patient(1, "Mary Johnson", 72, (2024, 1, 15), 78, PatientStatus::Normal),
                patient(2, "Robert Smith", 68, (2024, 1, 14), 65, PatientStatus::Concern),
                patient(3, "Linda Davis", 75, (2024, 1, 13), 82, PatientStatus::Normal),
                patient(4, "William Brown", 70, (2024, 1, 12), 58, PatientStatus::Flagged),
            ],
        }
    }

    /// Adds a card for the screening that just finished, if any
    pub fn with_latest(mut self, record: Option<&ResultRecord>) -> Self {
        if let Some(record) = record {
            let value = match record.animal_score() {
                Some(score) => format!("{score}/{QUIZ_ITEMS}"),
                None => "n/a".to_string(),
            };
            self.cards.push(StatCard {
                title: "Latest Screening".into(),
                value,
                description: format!(
                    "{} step(s), {}",
                    record.responses.len(),
                    record.started_at.format("%H:%M")
                ),
                trend: None,
            });
        }
        self
    }

    /// (index, score) points for the monthly score chart
    pub fn score_points(&self) -> Vec<(f64, f64)> {
        self.progress
            .iter()
            .enumerate()
            .map(|(i, p)| ((i + 1) as f64, p.score))
            .collect()
    }
}

fn patient(
    id: u32,
    name: &'static str,
    age: u32,
    (y, m, d): (i32, u32, u32),
    score: u32,
    status: PatientStatus,
) -> PatientSummary {
    PatientSummary {
        id,
        name,
        age,
        last_test: NaiveDate::from_ymd_opt(y, m, d),
        score,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StepId, ANIMAL_GUESS};
    use crate::responses::{Answer, ResponseCollector};
    use chrono::Local;

    #[test]
    fn sample_has_all_sections() {
        let d = Dashboard::sample();
        assert_eq!(d.cards.len(), 4);
        assert_eq!(d.progress.len(), 6);
        assert_eq!(d.speech_metrics.len(), 4);
        assert_eq!(d.recent_patients[3].status, PatientStatus::Flagged);
        assert!(d.recent_patients.iter().all(|p| p.last_test.is_some()));
    }

    #[test]
    fn score_points_are_one_based() {
        let points = Dashboard::sample().score_points();
        assert_eq!(points.first(), Some(&(1.0, 85.0)));
        assert_eq!(points.last(), Some(&(6.0, 78.0)));
    }

    #[test]
    fn latest_screening_card() {
        let mut collector = ResponseCollector::new();
        collector.record_response(
            StepId::new(ANIMAL_GUESS),
            Answer::AnimalGuess {
                score: 2,
                guesses: ["a".into(), "b".into(), "c".into()],
            },
        );
        let record = ResultRecord::new(Local::now(), Some(Local::now()), &collector);
        let d = Dashboard::sample().with_latest(Some(&record));
        let card = d.cards.last().unwrap();
        assert_eq!(card.title, "Latest Screening");
        assert_eq!(card.value, "2/3");

        assert_eq!(Dashboard::sample().with_latest(None).cards.len(), 4);
    }

    #[test]
    fn status_labels() {
        assert_eq!(PatientStatus::Concern.to_string(), "concern");
    }
}
