use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc::Sender, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, VoiceBackend};
use crate::error::CaptureError;

pub type CaptureId = u64;

/// Default delay before the stub backend reports the end of a capture
pub const STUB_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Transcript(String),
    Error(String),
    End,
}

/// Completion report posted by a backend for capture `id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMessage {
    pub id: CaptureId,
    pub event: CaptureEvent,
}

/// Hands out capture ids. Clones share one counter, so every session
/// created from the same source gets ids no other session has used.
#[derive(Debug, Clone, Default)]
pub struct CaptureIds(Arc<AtomicU64>);

impl CaptureIds {
    pub fn next(&self) -> CaptureId {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Where backends post their completion messages, usually the app event queue
#[derive(Clone)]
pub struct CaptureSink(Arc<dyn Fn(CaptureMessage) + Send + Sync>);

impl CaptureSink {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(CaptureMessage) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn from_sender(tx: Sender<CaptureMessage>) -> Self {
        Self::new(move |msg| {
            let _ = tx.send(msg);
        })
    }

    pub fn deliver(&self, msg: CaptureMessage) {
        (self.0)(msg)
    }
}

impl fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CaptureSink")
    }
}

/// A speech-to-text capability. `begin` must return promptly; results are
/// delivered later through the sink.
pub trait SpeechCapture: Send {
    fn name(&self) -> &'static str;
    fn begin(&self, locale: &str, id: CaptureId, sink: CaptureSink) -> Result<(), CaptureError>;

    /// Stops capture `id` if it is still running. Called after a timeout and
    /// when a recording session is dropped.
    fn cancel(&self, _id: CaptureId) {}
}

/// Pretends to listen for a fixed delay, then ends without a transcript
#[derive(Debug, Clone, Copy)]
pub struct StubTimerCapture {
    delay: Duration,
}

impl StubTimerCapture {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for StubTimerCapture {
    fn default() -> Self {
        Self::new(STUB_DELAY)
    }
}

impl SpeechCapture for StubTimerCapture {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn begin(&self, _locale: &str, id: CaptureId, sink: CaptureSink) -> Result<(), CaptureError> {
        let delay = self.delay;
        thread::spawn(move || {
            thread::sleep(delay);
            sink.deliver(CaptureMessage {
                id,
                event: CaptureEvent::End,
            });
        });
        Ok(())
    }
}

/// Runs an external recognizer and takes its stdout as the transcript.
/// The locale is passed in `COGSCREEN_LOCALE`. A cancelled recognizer is
/// killed.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    program: String,
    args: Vec<String>,
    running: Arc<Mutex<HashMap<CaptureId, Child>>>,
}

impl CommandCapture {
    /// Splits `command_line` on whitespace; returns None for a blank line
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            running: Arc::default(),
        })
    }

    fn running(&self) -> MutexGuard<'_, HashMap<CaptureId, Child>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SpeechCapture for CommandCapture {
    fn name(&self) -> &'static str {
        "command"
    }

    fn begin(&self, locale: &str, id: CaptureId, sink: CaptureSink) -> Result<(), CaptureError> {
        let program = self.program.clone();
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .env("COGSCREEN_LOCALE", locale)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                // Reported through the sink like any other recognizer failure
                let reason = format!("{program}: {e}");
                thread::spawn(move || {
                    sink.deliver(CaptureMessage {
                        id,
                        event: CaptureEvent::Error(reason),
                    });
                    sink.deliver(CaptureMessage {
                        id,
                        event: CaptureEvent::End,
                    });
                });
                return Ok(());
            }
        };
        let stdout = child.stdout.take();
        self.running().insert(id, child);
        let running = Arc::clone(&self.running);

        thread::spawn(move || {
            let mut text = String::new();
            let read = match stdout {
                Some(mut out) => out.read_to_string(&mut text).map(|_| ()),
                None => Ok(()),
            };
            let child = running
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);

            let event = match (child, read) {
                (None, _) => CaptureEvent::Error("cancelled".into()),
                (Some(mut child), Err(e)) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    CaptureEvent::Error(format!("{program}: {e}"))
                }
                (Some(mut child), Ok(())) => match child.wait() {
                    Ok(status) if status.success() => {
                        let text = text.trim();
                        if text.is_empty() {
                            CaptureEvent::Error("no-speech".into())
                        } else {
                            CaptureEvent::Transcript(text.to_string())
                        }
                    }
                    Ok(status) => CaptureEvent::Error(format!("{program} exited with {status}")),
                    Err(e) => CaptureEvent::Error(format!("{program}: {e}")),
                },
            };
            sink.deliver(CaptureMessage { id, event });
            sink.deliver(CaptureMessage {
                id,
                event: CaptureEvent::End,
            });
        });
        Ok(())
    }

    fn cancel(&self, id: CaptureId) {
        let Some(mut child) = self.running().remove(&id) else {
            return;
        };
        match child.kill() {
            Ok(()) => {
                let _ = child.wait();
                info!(id, program = %self.program, "recognizer stopped");
            }
            Err(e) => warn!(id, error = %e, "could not stop recognizer"),
        }
    }
}

/// Used when no recognizer is configured or available
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCapture;

impl SpeechCapture for UnavailableCapture {
    fn name(&self) -> &'static str {
        "off"
    }

    fn begin(&self, _locale: &str, _id: CaptureId, _sink: CaptureSink) -> Result<(), CaptureError> {
        Err(CaptureError::Unavailable)
    }
}

pub fn backend_from_config(config: &Config) -> Box<dyn SpeechCapture> {
    match config.voice_backend {
        VoiceBackend::Stub => Box::new(StubTimerCapture::new(
            Duration::try_from_secs_f64(config.stub_delay_secs).unwrap_or(STUB_DELAY),
        )),
        VoiceBackend::Command => match config.stt_command.as_deref().and_then(CommandCapture::parse) {
            Some(capture) => Box::new(capture),
            None => {
                warn!("voice backend `command` selected without a command, voice input disabled");
                Box::new(UnavailableCapture)
            }
        },
        VoiceBackend::Off => Box::new(UnavailableCapture),
    }
}

/// How an in-flight capture ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Transcript(String),
    Ended,
    Failed(CaptureError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(CaptureId),
    AlreadyRecording,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: CaptureId,
    elapsed: Duration,
}

/// Recording flag plus the capture backend. At most one capture is in
/// flight, and each capture concludes exactly once.
pub struct VoiceToggle {
    backend: Box<dyn SpeechCapture>,
    sink: CaptureSink,
    locale: String,
    timeout: Option<Duration>,
    ids: CaptureIds,
    in_flight: Option<InFlight>,
}

impl VoiceToggle {
    pub fn new(backend: Box<dyn SpeechCapture>, sink: CaptureSink, locale: impl Into<String>) -> Self {
        Self {
            backend,
            sink,
            locale: locale.into(),
            timeout: None,
            ids: CaptureIds::default(),
            in_flight: None,
        }
    }

    /// Draws capture ids from `ids` instead of a private counter
    pub fn with_ids(mut self, ids: CaptureIds) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_recording(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn start(&mut self) -> Result<StartOutcome, CaptureError> {
        if self.in_flight.is_some() {
            return Ok(StartOutcome::AlreadyRecording);
        }

        let id = self.ids.next();
        self.backend.begin(&self.locale, id, self.sink.clone())?;
        self.in_flight = Some(InFlight {
            id,
            elapsed: Duration::ZERO,
        });
        info!(id, backend = self.backend.name(), locale = %self.locale, "voice capture started");
        Ok(StartOutcome::Started(id))
    }

    /// Applies a backend message. Messages for anything other than the
    /// in-flight capture are dropped.
    pub fn on_message(&mut self, msg: CaptureMessage) -> Option<CaptureOutcome> {
        match self.in_flight {
            Some(flight) if flight.id == msg.id => {}
            _ => {
                debug!(id = msg.id, "ignoring message for concluded capture");
                return None;
            }
        }

        self.in_flight = None;
        let outcome = match msg.event {
            CaptureEvent::Transcript(text) => CaptureOutcome::Transcript(text),
            CaptureEvent::Error(reason) => {
                warn!(id = msg.id, %reason, "voice capture failed");
                CaptureOutcome::Failed(CaptureError::Failed(reason))
            }
            CaptureEvent::End => CaptureOutcome::Ended,
        };
        info!(id = msg.id, ?outcome, "voice capture concluded");
        Some(outcome)
    }

    pub fn on_tick(&mut self, dt: Duration) -> Option<CaptureOutcome> {
        let timeout = self.timeout?;
        let flight = self.in_flight.as_mut()?;
        flight.elapsed += dt;
        if flight.elapsed < timeout {
            return None;
        }
        let id = flight.id;
        warn!(id, "voice capture timed out");
        self.in_flight = None;
        self.backend.cancel(id);
        Some(CaptureOutcome::Failed(CaptureError::TimedOut))
    }
}

impl Drop for VoiceToggle {
    fn drop(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            debug!(id = flight.id, "cancelling capture of dropped session");
            self.backend.cancel(flight.id);
        }
    }
}

impl fmt::Debug for VoiceToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceToggle")
            .field("backend", &self.backend.name())
            .field("locale", &self.locale)
            .field("timeout", &self.timeout)
            .field("recording", &self.is_recording())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::mpsc::{self, Receiver};
    use std::sync::Mutex;

    /// Records begin and cancel calls and never answers on its own
    #[derive(Clone, Default)]
    struct ManualCapture {
        started: Arc<Mutex<Vec<CaptureId>>>,
        cancelled: Arc<Mutex<Vec<CaptureId>>>,
    }

    impl SpeechCapture for ManualCapture {
        fn name(&self) -> &'static str {
            "manual"
        }

        fn begin(&self, _locale: &str, id: CaptureId, _sink: CaptureSink) -> Result<(), CaptureError> {
            self.started.lock().unwrap().push(id);
            Ok(())
        }

        fn cancel(&self, id: CaptureId) {
            self.cancelled.lock().unwrap().push(id);
        }
    }

    fn toggle_with(backend: Box<dyn SpeechCapture>) -> (VoiceToggle, Receiver<CaptureMessage>) {
        let (tx, rx) = mpsc::channel();
        (
            VoiceToggle::new(backend, CaptureSink::from_sender(tx), "en-US"),
            rx,
        )
    }

    #[test]
    fn second_start_while_recording_is_noop() {
        let manual = ManualCapture::default();
        let (mut toggle, _rx) = toggle_with(Box::new(manual.clone()));

        assert_eq!(toggle.start(), Ok(StartOutcome::Started(1)));
        assert_eq!(toggle.start(), Ok(StartOutcome::AlreadyRecording));
        assert!(toggle.is_recording());
        assert_eq!(manual.started.lock().unwrap().len(), 1);
    }

    #[test]
    fn only_first_completion_concludes() {
        let (mut toggle, _rx) = toggle_with(Box::new(ManualCapture::default()));
        let StartOutcome::Started(id) = toggle.start().unwrap() else {
            panic!("expected a new capture");
        };

        let first = toggle.on_message(CaptureMessage {
            id,
            event: CaptureEvent::Transcript("lion".into()),
        });
        assert_eq!(first, Some(CaptureOutcome::Transcript("lion".into())));
        assert!(!toggle.is_recording());

        let second = toggle.on_message(CaptureMessage {
            id,
            event: CaptureEvent::End,
        });
        assert_eq!(second, None);
    }

    #[test]
    fn stale_ids_are_ignored() {
        let (mut toggle, _rx) = toggle_with(Box::new(ManualCapture::default()));
        toggle.start().unwrap();
        let stale = toggle.on_message(CaptureMessage {
            id: 99,
            event: CaptureEvent::End,
        });
        assert_eq!(stale, None);
        assert!(toggle.is_recording());
    }

    #[test]
    fn error_clears_recording_and_allows_retry() {
        let (mut toggle, _rx) = toggle_with(Box::new(ManualCapture::default()));
        toggle.start().unwrap();
        let outcome = toggle.on_message(CaptureMessage {
            id: 1,
            event: CaptureEvent::Error("network".into()),
        });
        assert_eq!(
            outcome,
            Some(CaptureOutcome::Failed(CaptureError::Failed("network".into())))
        );
        assert!(!toggle.is_recording());
        assert_eq!(toggle.start(), Ok(StartOutcome::Started(2)));
    }

    #[test]
    fn unavailable_backend_reports_and_stays_idle() {
        let (mut toggle, _rx) = toggle_with(Box::new(UnavailableCapture));
        assert_matches!(toggle.start(), Err(CaptureError::Unavailable));
        assert!(!toggle.is_recording());
    }

    #[test]
    fn tick_timeout_concludes_once() {
        let (toggle, _rx) = toggle_with(Box::new(ManualCapture::default()));
        let mut toggle = toggle.with_timeout(Some(Duration::from_millis(300)));
        toggle.start().unwrap();

        assert_eq!(toggle.on_tick(Duration::from_millis(100)), None);
        assert_eq!(toggle.on_tick(Duration::from_millis(100)), None);
        assert_eq!(
            toggle.on_tick(Duration::from_millis(100)),
            Some(CaptureOutcome::Failed(CaptureError::TimedOut))
        );
        assert!(!toggle.is_recording());
        assert_eq!(toggle.on_tick(Duration::from_millis(100)), None);
        assert_eq!(
            toggle.on_message(CaptureMessage {
                id: 1,
                event: CaptureEvent::End
            }),
            None
        );
    }

    #[test]
    fn timeout_cancels_the_backend_capture() {
        let manual = ManualCapture::default();
        let (toggle, _rx) = toggle_with(Box::new(manual.clone()));
        let mut toggle = toggle.with_timeout(Some(Duration::from_millis(50)));
        toggle.start().unwrap();
        toggle.on_tick(Duration::from_millis(60));
        assert_eq!(*manual.cancelled.lock().unwrap(), vec![1]);
    }

    #[test]
    fn dropping_a_recording_toggle_cancels_it() {
        let manual = ManualCapture::default();
        let (mut toggle, _rx) = toggle_with(Box::new(manual.clone()));
        toggle.start().unwrap();
        drop(toggle);
        assert_eq!(*manual.cancelled.lock().unwrap(), vec![1]);

        // Idle toggles have nothing to cancel
        let (toggle, _rx) = toggle_with(Box::new(manual.clone()));
        drop(toggle);
        assert_eq!(manual.cancelled.lock().unwrap().len(), 1);
    }

    #[test]
    fn shared_ids_never_repeat_across_toggles() {
        let ids = CaptureIds::default();
        let (first, _rx1) = toggle_with(Box::new(ManualCapture::default()));
        let (second, _rx2) = toggle_with(Box::new(ManualCapture::default()));
        let mut first = first.with_ids(ids.clone());
        let mut second = second.with_ids(ids);

        assert_eq!(first.start(), Ok(StartOutcome::Started(1)));
        assert_eq!(second.start(), Ok(StartOutcome::Started(2)));

        // The first toggle's completion does not conclude the second one
        assert_eq!(
            second.on_message(CaptureMessage {
                id: 1,
                event: CaptureEvent::End
            }),
            None
        );
        assert!(second.is_recording());
    }

    #[test]
    fn stub_backend_ends_after_delay() {
        let (tx, rx) = mpsc::channel();
        let stub = StubTimerCapture::new(Duration::from_millis(5));
        stub.begin("en-US", 7, CaptureSink::from_sender(tx)).unwrap();

        let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(
            msg,
            CaptureMessage {
                id: 7,
                event: CaptureEvent::End
            }
        );
    }

    #[test]
    fn command_parse_splits_arguments() {
        assert!(CommandCapture::parse("   ").is_none());
        let cmd = CommandCapture::parse("whisper --model tiny").unwrap();
        assert_eq!(cmd.program, "whisper");
        assert_eq!(cmd.args, vec!["--model", "tiny"]);
    }

    #[cfg(unix)]
    #[test]
    fn command_backend_reports_stdout_then_end() {
        let (tx, rx) = mpsc::channel();
        let cmd = CommandCapture::parse("echo  zebra").unwrap();
        cmd.begin("en-US", 3, CaptureSink::from_sender(tx)).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.event, CaptureEvent::Transcript("zebra".into()));
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.event, CaptureEvent::End);
    }

    #[cfg(unix)]
    #[test]
    fn cancel_kills_a_running_recognizer() {
        let (tx, rx) = mpsc::channel();
        let cmd = CommandCapture::parse("sleep 30").unwrap();
        cmd.begin("en-US", 5, CaptureSink::from_sender(tx)).unwrap();
        assert_eq!(cmd.running().len(), 1);

        cmd.cancel(5);
        assert!(cmd.running().is_empty());
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.event, CaptureEvent::Error("cancelled".into()));
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.event, CaptureEvent::End);
    }

    #[test]
    fn missing_program_reports_error() {
        let (tx, rx) = mpsc::channel();
        let cmd = CommandCapture::parse("definitely-not-a-real-recognizer-binary").unwrap();
        cmd.begin("en-US", 4, CaptureSink::from_sender(tx)).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_matches!(first.event, CaptureEvent::Error(_));
    }

    #[test]
    fn config_selects_backend() {
        let mut config = Config::default();
        assert_eq!(backend_from_config(&config).name(), "stub");
        config.voice_backend = VoiceBackend::Command;
        config.stt_command = None;
        assert_eq!(backend_from_config(&config).name(), "off");
        config.stt_command = Some("recognize".into());
        assert_eq!(backend_from_config(&config).name(), "command");
        config.voice_backend = VoiceBackend::Off;
        assert_eq!(backend_from_config(&config).name(), "off");
    }
}
