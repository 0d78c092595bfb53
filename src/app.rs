use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::error::CaptureError;
use crate::responses::ResultRecord;
use crate::runtime::AppEvent;
use crate::sequencer::{Advance, Route};
use crate::session::{EntryOutcome, ScreeningSession};
use crate::voice::{self, CaptureIds, CaptureOutcome, CaptureSink, StartOutcome, VoiceToggle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AppState {
    Home,
    Test,
    Results,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Single-line feedback shown under the active screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(s) | Notice::Error(s) => s,
        }
    }
}

pub const HOME_MENU: [&str; 3] = ["Start screening", "Clinician dashboard", "Quit"];

/// Runtime knobs the shell needs beyond the persisted config
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    pub config: Config,
    pub seed: Option<u64>,
    pub export_path: Option<PathBuf>,
    pub start_on_dashboard: bool,
}

#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub session: Option<ScreeningSession>,
    pub last_record: Option<ResultRecord>,
    pub notice: Option<Notice>,
    pub menu_index: usize,
    pub dashboard: Dashboard,
    catalog: Arc<Catalog>,
    settings: AppSettings,
    capture_sink: CaptureSink,
    capture_ids: CaptureIds,
    rng: StdRng,
}

impl App {
    pub fn new(catalog: Catalog, settings: AppSettings, capture_sink: CaptureSink) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = if settings.start_on_dashboard {
            AppState::Dashboard
        } else {
            AppState::Home
        };

        Self {
            state,
            session: None,
            last_record: None,
            notice: None,
            menu_index: 0,
            dashboard: Dashboard::sample(),
            catalog: Arc::new(catalog),
            settings,
            capture_sink,
            capture_ids: CaptureIds::default(),
            rng,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Discards any running session and begins a fresh one
    pub fn start_screening(&mut self) {
        let config = &self.settings.config;
        let voice = VoiceToggle::new(
            voice::backend_from_config(config),
            self.capture_sink.clone(),
            config.locale.clone(),
        )
        .with_timeout(config.capture_timeout())
        .with_ids(self.capture_ids.clone());

        self.session = Some(ScreeningSession::new(
            self.catalog.clone(),
            voice,
            &mut self.rng,
        ));
        self.notice = None;
        self.state = AppState::Test;
    }

    pub fn open_dashboard(&mut self) {
        self.dashboard = Dashboard::sample().with_latest(self.last_record.as_ref());
        self.notice = None;
        self.state = AppState::Dashboard;
    }

    pub fn go_home(&mut self) {
        if self.session.take().is_some() {
            info!("screening abandoned");
        }
        self.notice = None;
        self.state = AppState::Home;
    }

    pub fn on_event(&mut self, event: AppEvent, tick: Duration) -> Flow {
        match event {
            AppEvent::Tick => {
                if let Some(outcome) = self.session.as_mut().and_then(|s| s.on_tick(tick)) {
                    self.show_capture_outcome(outcome);
                }
                Flow::Continue
            }
            AppEvent::Capture(msg) => {
                if let Some(outcome) = self.session.as_mut().and_then(|s| s.on_capture(msg)) {
                    self.show_capture_outcome(outcome);
                }
                Flow::Continue
            }
            AppEvent::Resize => Flow::Continue,
            AppEvent::Key(key) => self.on_key(key),
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        match self.state {
            AppState::Home => self.on_home_key(key),
            AppState::Test => {
                self.on_test_key(key);
                Flow::Continue
            }
            AppState::Results => match key.code {
                KeyCode::Char('n') => {
                    self.start_screening();
                    Flow::Continue
                }
                KeyCode::Char('d') => {
                    self.open_dashboard();
                    Flow::Continue
                }
                KeyCode::Char('q') => Flow::Quit,
                KeyCode::Esc | KeyCode::Char('h') => {
                    self.go_home();
                    Flow::Continue
                }
                _ => Flow::Continue,
            },
            AppState::Dashboard => match key.code {
                KeyCode::Char('n') => {
                    self.start_screening();
                    Flow::Continue
                }
                KeyCode::Char('q') => Flow::Quit,
                KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('h') => {
                    self.go_home();
                    Flow::Continue
                }
                _ => Flow::Continue,
            },
        }
    }

    fn on_home_key(&mut self, key: KeyEvent) -> Flow {
        match key.code {
            KeyCode::Up => {
                self.menu_index = self.menu_index.saturating_sub(1);
            }
            KeyCode::Down => {
                self.menu_index = (self.menu_index + 1).min(HOME_MENU.len() - 1);
            }
            KeyCode::Enter => match self.menu_index {
                0 => self.start_screening(),
                1 => self.open_dashboard(),
                _ => return Flow::Quit,
            },
            KeyCode::Char('s') => self.start_screening(),
            KeyCode::Char('d') => self.open_dashboard(),
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            _ => {}
        }
        Flow::Continue
    }

    fn on_test_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.go_home(),
            KeyCode::F(2) => self.start_voice(),
            KeyCode::Char('r') if ctrl => self.start_voice(),
            KeyCode::Right | KeyCode::PageDown => self.next_step(),
            KeyCode::Char('n') if ctrl => self.next_step(),
            KeyCode::Left | KeyCode::PageUp => self.previous_step(),
            KeyCode::Char('p') if ctrl => self.previous_step(),
            KeyCode::Enter => self.commit_entry(),
            KeyCode::Backspace => {
                if let Some(session) = self.session.as_mut() {
                    session.pop_char();
                }
            }
            KeyCode::Char(c) if !ctrl => {
                if let Some(session) = self.session.as_mut() {
                    session.push_char(c);
                }
            }
            _ => {}
        }
    }

    fn commit_entry(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.notice = match session.commit_entry() {
            Ok(EntryOutcome::Guess(outcome)) => {
                Some(Notice::Info(format!("Guess {} recorded", outcome.item + 1)))
            }
            Ok(EntryOutcome::Recorded { count }) => {
                Some(Notice::Info(format!("Answer {count} recorded")))
            }
            Err(e) => Some(Notice::Error(e.to_string())),
        };
    }

    fn next_step(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.advance() {
            Ok(Advance::Moved(_)) => self.notice = None,
            Ok(Advance::Complete(Route::Results)) => self.finish_screening(),
            Err(e) => self.notice = Some(Notice::Error(e.to_string())),
        }
    }

    fn previous_step(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.notice = session
            .retreat()
            .err()
            .map(|e| Notice::Error(e.to_string()));
    }

    fn finish_screening(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let record = session.result_record();
        self.notice = None;

        if let Some(path) = self.settings.export_path.as_ref() {
            match record.write_json(path) {
                Ok(()) => {
                    info!(path = %path.display(), "results exported");
                    self.notice = Some(Notice::Info(format!(
                        "Results saved to {}",
                        path.display()
                    )));
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "results export failed");
                    self.notice = Some(Notice::Error(format!("Could not save results: {e}")));
                }
            }
        }

        self.last_record = Some(record);
        self.state = AppState::Results;
    }

    fn start_voice(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.notice = match session.start_voice_capture() {
            Ok(StartOutcome::Started(_)) => Some(Notice::Info("Listening...".into())),
            Ok(StartOutcome::AlreadyRecording) => None,
            Err(CaptureError::Unavailable) => Some(Notice::Error(
                "Speech recognition is not supported here. Please type your answer.".into(),
            )),
            Err(e) => Some(Notice::Error(e.to_string())),
        };
    }

    fn show_capture_outcome(&mut self, outcome: CaptureOutcome) {
        self.notice = match outcome {
            CaptureOutcome::Transcript(text) => Some(Notice::Info(format!("Heard \"{text}\""))),
            CaptureOutcome::Ended => Some(Notice::Info("Recording finished".into())),
            CaptureOutcome::Failed(e) => Some(Notice::Error(e.to_string())),
        };
    }
}
