//! Upload flow: intake of a single floor-plan image, encode, paced progress, completion handoff.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use shared::{
    constants::{next_progress, progress_interval, redirect_delay, PROGRESS_COMPLETE},
    domain::UploadOutcome,
    error::UploadError,
};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{lock, AuthSignal, FileEncoder, SelectedFile, EVENT_CHANNEL_CAPACITY};

/// Receives the terminal outcome of an upload. Use [`UploadOutcome::into_payload`] to get the
/// plain string (encoded image or error sentinel) carried by navigation.
pub type CompletionCallback = Arc<dyn Fn(UploadOutcome) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    SignedOut,
    SessionActive,
    NoFile,
    NotAnImage,
    TornDown,
}

/// What an intake event did with the offered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileIntake {
    Accepted,
    Ignored(IgnoreReason),
    Rejected(UploadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    DraggingChanged(bool),
    FileAccepted { name: String },
    Encoded,
    Progress(u8),
    Completed(UploadOutcome),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub signed_in: bool,
    pub file_name: Option<String>,
    pub progress: u8,
    pub is_dragging: bool,
    pub has_payload: bool,
}

impl UploadSnapshot {
    pub fn prompt(&self) -> &'static str {
        if self.signed_in {
            "Click to upload or just drag and drop"
        } else {
            "Sign in or sign up with Puter to upload"
        }
    }

    /// Status line shown under the progress bar once a file has been accepted.
    pub fn status_text(&self) -> Option<&'static str> {
        self.file_name.as_ref()?;
        Some(if self.progress < PROGRESS_COMPLETE {
            "Analyzing Floor Plan..."
        } else {
            "Redirecting..."
        })
    }
}

#[derive(Default)]
struct UploadSession {
    file_name: Option<String>,
    progress: u8,
    is_dragging: bool,
    encoded_payload: Option<String>,
    completed: bool,
}

struct UploadInner {
    auth: Arc<dyn AuthSignal>,
    encoder: Arc<dyn FileEncoder>,
    on_complete: CompletionCallback,
    session: Mutex<UploadSession>,
    alive: AtomicBool,
    events: broadcast::Sender<UploadEvent>,
}

impl UploadInner {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.events.send(event);
    }

    fn set_dragging(&self, dragging: bool) {
        let changed = {
            let mut session = lock(&self.session);
            let changed = session.is_dragging != dragging;
            session.is_dragging = dragging;
            changed
        };
        if changed {
            self.emit(UploadEvent::DraggingChanged(dragging));
        }
    }

    fn advance_progress(&self) -> u8 {
        let progress = {
            let mut session = lock(&self.session);
            session.progress = next_progress(session.progress);
            session.progress
        };
        self.emit(UploadEvent::Progress(progress));
        progress
    }

    fn reset_progress(&self) {
        lock(&self.session).progress = 0;
        self.emit(UploadEvent::Progress(0));
    }

    /// Hands the outcome to the caller unless the screen is gone.
    fn deliver(&self, outcome: UploadOutcome) {
        if !self.is_alive() {
            debug!("upload torn down; dropping completion");
            return;
        }
        (self.on_complete)(outcome.clone());
        self.emit(UploadEvent::Completed(outcome));
    }

    fn deliver_session_outcome(&self, outcome: UploadOutcome) {
        {
            let mut session = lock(&self.session);
            if session.completed {
                return;
            }
            session.completed = true;
        }
        self.deliver(outcome);
    }
}

/// Owns one upload session per mount. Must be driven from inside a Tokio runtime.
pub struct UploadOrchestrator {
    inner: Arc<UploadInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl UploadOrchestrator {
    pub fn new(
        auth: Arc<dyn AuthSignal>,
        encoder: Arc<dyn FileEncoder>,
        on_complete: CompletionCallback,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(UploadInner {
                auth,
                encoder,
                on_complete,
                session: Mutex::new(UploadSession::default()),
                alive: AtomicBool::new(true),
                events,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        let session = lock(&self.inner.session);
        UploadSnapshot {
            signed_in: self.inner.auth.is_signed_in(),
            file_name: session.file_name.clone(),
            progress: session.progress,
            is_dragging: session.is_dragging,
            has_payload: session.encoded_payload.is_some(),
        }
    }

    /// Encoded payload, once encoding has finished.
    pub fn encoded_payload(&self) -> Option<String> {
        lock(&self.inner.session).encoded_payload.clone()
    }

    pub fn handle_drag_over(&self) {
        if !self.inner.is_alive() || !self.inner.auth.is_signed_in() {
            return;
        }
        self.inner.set_dragging(true);
    }

    pub fn handle_drag_leave(&self) {
        self.inner.set_dragging(false);
    }

    /// Pointer drop. Only the first file counts; non-images are ignored silently.
    pub fn handle_drop(&self, files: Vec<SelectedFile>) -> FileIntake {
        self.inner.set_dragging(false);
        if let Some(reason) = self.intake_blocker() {
            return FileIntake::Ignored(reason);
        }
        let Some(file) = files.into_iter().next() else {
            return FileIntake::Ignored(IgnoreReason::NoFile);
        };
        if !file.is_image() {
            debug!(file = %file.name, content_type = %file.content_type, "ignoring dropped non-image file");
            return FileIntake::Ignored(IgnoreReason::NotAnImage);
        }
        if let Err(err) = file.check_size() {
            return self.reject(err);
        }
        self.begin(file)
    }

    /// File-picker selection. Non-images are rejected with the error outcome.
    pub fn handle_file_selected(&self, file: Option<SelectedFile>) -> FileIntake {
        if let Some(reason) = self.intake_blocker() {
            return FileIntake::Ignored(reason);
        }
        let Some(file) = file else {
            return FileIntake::Ignored(IgnoreReason::NoFile);
        };
        if !file.is_image() {
            return self.reject(UploadError::UnsupportedContentType(file.content_type));
        }
        if let Err(err) = file.check_size() {
            return self.reject(err);
        }
        self.begin(file)
    }

    /// Cancels pending timers and suppresses any later completion.
    pub fn teardown(&self) {
        if !self.inner.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        *lock(&self.inner.session) = UploadSession::default();
        debug!("upload session torn down");
    }

    fn intake_blocker(&self) -> Option<IgnoreReason> {
        if !self.inner.is_alive() {
            return Some(IgnoreReason::TornDown);
        }
        if !self.inner.auth.is_signed_in() {
            return Some(IgnoreReason::SignedOut);
        }
        if lock(&self.inner.session).file_name.is_some() {
            return Some(IgnoreReason::SessionActive);
        }
        None
    }

    fn reject(&self, err: UploadError) -> FileIntake {
        warn!(error = %err, "rejecting upload");
        self.inner.deliver(UploadOutcome::Failed(err.clone()));
        FileIntake::Rejected(err)
    }

    fn begin(&self, file: SelectedFile) -> FileIntake {
        {
            let mut session = lock(&self.inner.session);
            if session.file_name.is_some() {
                return FileIntake::Ignored(IgnoreReason::SessionActive);
            }
            session.file_name = Some(file.name.clone());
        }
        info!(file = %file.name, size_bytes = file.size_bytes, "accepted upload");
        self.inner.emit(UploadEvent::FileAccepted {
            name: file.name.clone(),
        });

        let task = tokio::spawn(run_session(Arc::clone(&self.inner), file));
        let mut slot = lock(&self.task);
        if self.inner.is_alive() {
            *slot = Some(task);
        } else {
            task.abort();
        }
        FileIntake::Accepted
    }
}

impl Drop for UploadOrchestrator {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run_session(inner: Arc<UploadInner>, file: SelectedFile) {
    let payload = match inner.encoder.encode(&file).await {
        Ok(payload) => payload,
        Err(err) => {
            warn!(file = %file.name, error = %err, "failed to encode upload");
            inner.reset_progress();
            inner.deliver_session_outcome(UploadOutcome::Failed(err));
            return;
        }
    };
    if !inner.is_alive() {
        return;
    }
    lock(&inner.session).encoded_payload = Some(payload.clone());
    inner.emit(UploadEvent::Encoded);
    debug!(file = %file.name, payload_len = payload.len(), "upload encoded");

    let period = progress_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if inner.advance_progress() >= PROGRESS_COMPLETE {
            break;
        }
    }
    drop(ticker);

    tokio::time::sleep(redirect_delay()).await;
    info!(file = %file.name, "upload complete");
    inner.deliver_session_outcome(UploadOutcome::Encoded(payload));
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
