use clap::{error::ErrorKind, CommandFactory, Parser};
use cogscreen::{
    app::{App, AppSettings, Flow},
    app_dirs::AppDirs,
    catalog::Catalog,
    config::{Config, ConfigStore, FileConfigStore, VoiceBackend},
    logging,
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// terminal cognitive screening with typed or spoken answers
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "A short cognitive screening (animal naming, sentence repetition, verbal fluency, memory recall and abstraction) run in the terminal, with a clinician dashboard."
)]
pub struct Cli {
    /// speech capture backend
    #[clap(long, value_enum)]
    voice: Option<VoiceBackend>,

    /// recognizer command for the `command` backend; its stdout is the transcript
    #[clap(long)]
    stt_command: Option<String>,

    /// recognition locale handed to the speech backend
    #[clap(long)]
    locale: Option<String>,

    /// JSON catalog replacing the built-in steps and contents
    #[clap(short = 'c', long)]
    catalog: Option<PathBuf>,

    /// seed for the animal draw, for reproducible sessions
    #[clap(long)]
    seed: Option<u64>,

    /// write the result record of a finished screening to this JSON file
    #[clap(short = 'e', long)]
    export: Option<PathBuf>,

    /// open the clinician dashboard instead of the home screen
    #[clap(short = 'd', long)]
    dashboard: bool,

    /// seconds before a voice capture is abandoned, 0 disables the limit
    #[clap(long)]
    capture_timeout: Option<f64>,

    /// persist the effective settings to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Flags override whatever the config file says
    fn apply(&self, mut config: Config) -> Config {
        if let Some(voice) = self.voice {
            config.voice_backend = voice;
        }
        if let Some(cmd) = &self.stt_command {
            config.stt_command = Some(cmd.clone());
        }
        if let Some(locale) = &self.locale {
            config.locale = locale.clone();
        }
        if let Some(path) = &self.catalog {
            config.catalog_path = Some(path.clone());
        }
        if let Some(secs) = self.capture_timeout {
            config.capture_timeout_secs = Some(secs);
        }
        config
    }

    fn settings(&self, config: Config) -> AppSettings {
        AppSettings {
            config,
            seed: self.seed,
            export_path: self.export.clone(),
            start_on_dashboard: self.dashboard,
        }
    }
}

fn load_catalog(config: &Config) -> Catalog {
    let Some(path) = config.catalog_path.as_ref() else {
        return Catalog::standard();
    };
    match Catalog::from_json_file(path) {
        Ok(catalog) => {
            info!(path = %path.display(), steps = catalog.len(), "catalog loaded");
            catalog
        }
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(
                ErrorKind::InvalidValue,
                format!("cannot use catalog {}: {e}", path.display()),
            )
            .exit()
        }
    }
}

/// Starts logging, then reads the config file so problems with it are logged
fn init_logging_and_config(
    cli: &Cli,
    log_path: &Path,
    store: &impl ConfigStore,
) -> (Option<WorkerGuard>, Config) {
    // Logging is best effort; the guard flushes the writer on exit
    let guard = match logging::init(log_path) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("logging disabled: {e}");
            None
        }
    };
    (guard, cli.apply(store.load()))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store = FileConfigStore::new();
    let (_log_guard, config) = init_logging_and_config(&cli, &AppDirs::log_path(), &store);
    if cli.save_config {
        store.save(&config)?;
    }
    info!(voice = %config.voice_backend, locale = %config.locale, "starting");

    let catalog = load_catalog(&config);

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let mut app = App::new(catalog, cli.settings(config), runner.capture_sink());
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        warn!(error = %e, "exited with error");
    }
    result
}

fn start_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let event = runner.step();
        if !matches!(event, AppEvent::Tick) && app.on_event(event, Duration::ZERO) == Flow::Quit {
            info!("quit");
            return Ok(());
        }

        // Keys can keep the queue busy, so time is measured rather than
        // inferred from Tick events
        let elapsed = last_tick.elapsed();
        if elapsed >= runner.tick_interval() {
            last_tick = Instant::now();
            app.on_event(AppEvent::Tick, elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogscreen::app::AppState;
    use cogscreen::runtime::TestEventSource;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;

    #[test]
    fn unreadable_config_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, b"{ not json").unwrap();
        let log_path = dir.path().join("logs").join("cogscreen.log");

        let cli = Cli::parse_from(["cogscreen"]);
        let (guard, config) =
            init_logging_and_config(&cli, &log_path, &FileConfigStore::with_path(&config_path));
        assert_eq!(config, Config::default());
        drop(guard);

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("ignoring unreadable config"), "log was: {log}");
    }

    #[test]
    fn flags_override_config_file() {
        let cli = Cli::parse_from([
            "cogscreen",
            "--voice",
            "off",
            "--locale",
            "de-DE",
            "--capture-timeout",
            "0",
        ]);
        let config = cli.apply(Config::default());
        assert_eq!(config.voice_backend, VoiceBackend::Off);
        assert_eq!(config.locale, "de-DE");
        assert_eq!(config.capture_timeout(), None);
    }

    #[test]
    fn missing_flags_keep_file_values() {
        let file = Config {
            locale: "fr-FR".into(),
            stt_command: Some("whisper-cli".into()),
            ..Config::default()
        };
        let config = Cli::parse_from(["cogscreen"]).apply(file.clone());
        assert_eq!(config.locale, file.locale);
        assert_eq!(config.stt_command, file.stt_command);
    }

    #[test]
    fn settings_carry_runtime_flags() {
        let cli = Cli::parse_from(["cogscreen", "--seed", "4", "-d", "-e", "out.json"]);
        let settings = cli.settings(Config::default());
        assert_eq!(settings.seed, Some(4));
        assert!(settings.start_on_dashboard);
        assert_eq!(settings.export_path, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tui_loop_quits_on_q() {
        let source = TestEventSource::new();
        let tx = source.sender();
        let runner = Runner::new(source, FixedTicker::new(Duration::from_millis(1)));
        let mut app = App::new(
            Catalog::standard(),
            Cli::default().settings(Config::default()),
            runner.capture_sink(),
        );
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::NONE)))
            .unwrap();
        tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)))
            .unwrap();

        start_tui(&mut terminal, &mut app, &runner).unwrap();
        assert_eq!(app.state, AppState::Dashboard);
    }
}
